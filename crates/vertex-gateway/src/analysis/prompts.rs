use super::AnalysisKind;

const JSON_ONLY: &str = "Respond with a single JSON object and nothing else.";

/// Prompt asking for the JSON shape that belongs to `kind`
pub fn analysis_prompt(content: &str, kind: AnalysisKind) -> String {
    let (task, shape) = match kind {
        AnalysisKind::Sentiment => (
            "Analyze the sentiment of the following marketing content.",
            r#"{"score": <number from -1.0 (negative) to 1.0 (positive)>, "explanation": "<one or two sentences>"}"#,
        ),
        AnalysisKind::Keywords => (
            "Extract the most important keywords from the following marketing content.",
            r#"{"keywords": ["<keyword>", ...], "summary": "<one sentence summary>"}"#,
        ),
        AnalysisKind::Seo => (
            "Review the following content for search engine optimization.",
            r#"{"strengths": ["..."], "weaknesses": ["..."], "improvements": ["..."]}"#,
        ),
        AnalysisKind::Market => (
            "Assess the market positioning described by the following content.",
            r#"{"targetAudience": ["<audience segment>"], "competitiveAdvantages": ["..."], "opportunities": ["..."]}"#,
        ),
        AnalysisKind::Brand => (
            "Evaluate the brand voice and identity in the following content.",
            r#"{"attributes": ["..."], "values": ["..."], "suggestions": ["..."]}"#,
        ),
    };

    format!("{task}\n\nContent:\n\"\"\"\n{content}\n\"\"\"\n\n{JSON_ONLY} Use this shape:\n{shape}")
}
