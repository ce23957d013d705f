//! Prompt templates for the summarizer and answerer roles.

use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Placed in the answer prompt when retrieval returned nothing.
pub const NO_CONTEXT_MARKER: &str = "(no relevant context was found in the indexed papers)";

/// Requested summary flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    /// Concise overview.
    #[default]
    General,
    /// Findings, methodology, results, and conclusions.
    Detailed,
    /// Bulleted key points.
    KeyPoints,
}

/// Summary label outside the supported set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown summary_type '{0}' (expected general, detailed, or key_points)")]
pub struct UnknownSummaryKind(pub String);

impl SummaryKind {
    /// Wire label of the summary type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Detailed => "detailed",
            Self::KeyPoints => "key_points",
        }
    }
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryKind {
    type Err = UnknownSummaryKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "detailed" => Ok(Self::Detailed),
            "key_points" => Ok(Self::KeyPoints),
            _ => Err(UnknownSummaryKind(value.to_string())),
        }
    }
}

/// Build the summarization prompt for `content`.
pub fn summary_prompt(kind: SummaryKind, content: &str) -> String {
    let (instruction, label) = match kind {
        SummaryKind::General => (
            "Please provide a concise summary of the following academic content:",
            "Summary:",
        ),
        SummaryKind::Detailed => (
            "Please provide a detailed summary of the following academic content. \
             Include key findings, methodology, results, and conclusions:",
            "Detailed Summary:",
        ),
        SummaryKind::KeyPoints => (
            "Please extract the key points from the following academic content. \
             Focus on main findings, important data, and critical insights. \
             Return one point per line, each starting with \"- \":",
            "Key Points:",
        ),
    };
    format!("{instruction}\n\n{content}\n\n{label}")
}

/// Build the question-answering prompt; `None` context inserts [`NO_CONTEXT_MARKER`].
pub fn answer_prompt(question: &str, context: Option<&str>) -> String {
    let context = context
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(NO_CONTEXT_MARKER);
    format!(
        "Based on the following academic context, please answer the question accurately and thoroughly.\n\
         If the context doesn't contain enough information to answer the question, say so clearly.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

/// Pull bullet or numbered lines out of a completion, markers removed.
pub fn extract_key_points(completion: &str) -> Vec<String> {
    completion
        .lines()
        .filter_map(|line| strip_list_marker(line.trim()))
        .filter(|point| !point.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> Option<&str> {
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest.trim());
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix(". ")
        .or_else(|| rest.strip_prefix(") "))
        .map(str::trim)
}
