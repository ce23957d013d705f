//! Heuristic bibliographic metadata for academic papers.

const TITLE_SCAN_LINES: usize = 10;
const TITLE_MIN_CHARS: usize = 10;
const TITLE_MAX_CHARS: usize = 200;
const TITLE_STOPWORDS: [&str; 4] = ["abstract", "introduction", "doi:", "http"];

/// Title and abstract guessed from the first lines of a paper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperMetadata {
    /// First plausible title line, if any.
    pub title: Option<String>,
    /// Text following the `Abstract` heading, if any.
    pub abstract_text: Option<String>,
}

/// Guess title and abstract from extracted paper text.
pub fn extract_metadata(text: &str) -> PaperMetadata {
    PaperMetadata {
        title: guess_title(text),
        abstract_text: guess_abstract(text),
    }
}

fn guess_title(text: &str) -> Option<String> {
    text.lines()
        .take(TITLE_SCAN_LINES)
        .map(str::trim)
        .find(|line| {
            let length = line.chars().count();
            let lower = line.to_lowercase();
            length > TITLE_MIN_CHARS
                && length < TITLE_MAX_CHARS
                && !TITLE_STOPWORDS.iter().any(|word| lower.contains(word))
        })
        .map(str::to_string)
}

fn guess_abstract(text: &str) -> Option<String> {
    let mut lines = text.lines();
    let heading = lines.find(|line| line.to_lowercase().contains("abstract"))?;

    let mut parts = Vec::new();
    // "Abstract: We study ..." keeps the text that shares the heading line.
    if let Some(rest) = text_after_keyword(heading, "abstract") {
        parts.push(rest);
    }

    for line in lines {
        let line = line.trim();
        if line.starts_with("Keywords:") || line.starts_with("1.") {
            break;
        }
        if !line.is_empty() {
            parts.push(line.to_string());
        }
    }

    let joined = parts.join(" ");
    if joined.is_empty() { None } else { Some(joined) }
}

fn text_after_keyword(line: &str, keyword: &str) -> Option<String> {
    let position = line.to_lowercase().find(keyword)?;
    // Lowercasing can change byte lengths for non-ASCII text; bail out rather than mis-slice.
    let rest = line.get(position + keyword.len()..)?;
    let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '.' | '-' | '—'));
    let rest = rest.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: &str = "\
arXiv
Retrieval-Augmented Generation for Dense Corpora
Jane Doe, John Roe
Abstract
We study retrieval for long scientific documents.
Our method improves recall.
Keywords: retrieval, rag
1. Introduction
";

    #[test]
    fn finds_title_and_abstract() {
        let metadata = extract_metadata(PAPER);
        assert_eq!(
            metadata.title.as_deref(),
            Some("Retrieval-Augmented Generation for Dense Corpora")
        );
        assert_eq!(
            metadata.abstract_text.as_deref(),
            Some("We study retrieval for long scientific documents. Our method improves recall.")
        );
    }

    #[test]
    fn keeps_abstract_text_on_heading_line() {
        let metadata = extract_metadata("A Long Enough Paper Title\nAbstract: Short summary here.\n1. Intro");
        assert_eq!(metadata.abstract_text.as_deref(), Some("Short summary here."));
    }

    #[test]
    fn missing_sections_stay_empty() {
        let metadata = extract_metadata("short\nhttp://example.org/a-long-link-line\n");
        assert_eq!(metadata, PaperMetadata::default());
    }
}
