//! The three agent roles: retriever, summarizer, and answerer.
//!
//! Each role is a stateless step. The retriever delegates to the index; the other two format a
//! template and hand it to the generation client exactly once.

pub mod budget;
pub mod prompts;

pub use budget::TokenBudget;
pub use prompts::{
    NO_CONTEXT_MARKER, SummaryKind, UnknownSummaryKind, answer_prompt, extract_key_points,
    summary_prompt,
};

use crate::{
    indexing::{IndexClient, RetrievalError, SearchHit, StoredChunk},
    llm::{GenerationClient, GenerationError},
};

/// Completion returned by the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDraft {
    /// Raw summary text.
    pub summary: String,
    /// Bullet points parsed from the completion; empty unless key points were requested.
    pub key_points: Vec<String>,
}

/// Completion returned by the answerer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerDraft {
    /// Answer text.
    pub answer: String,
    /// Hits that fit the token budget and were placed in the prompt, in rank order.
    pub context: Vec<SearchHit>,
}

/// Retriever: fetch the `top_k` most relevant chunks, optionally within one document.
pub async fn retrieve(
    index: &IndexClient,
    query: &str,
    top_k: usize,
    document_id: Option<&str>,
) -> Result<Vec<SearchHit>, RetrievalError> {
    let hits = index.search(query, top_k, document_id).await?;
    tracing::debug!(top_k, hits = hits.len(), "Retriever finished");
    Ok(hits)
}

/// Summarizer: summarize a document from its ordered chunks.
///
/// Overlapping characters are dropped so the prompt carries the document text once.
pub async fn summarize(
    llm: &dyn GenerationClient,
    budget: &TokenBudget,
    kind: SummaryKind,
    chunks: Vec<StoredChunk>,
) -> Result<SummaryDraft, GenerationError> {
    let chunks = budget.fit(strip_overlap(chunks), |chunk| chunk.text.as_str());
    let content = chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<String>();
    let prompt = summary_prompt(kind, content.trim());

    tracing::info!(
        summary_type = %kind,
        chunks = chunks.len(),
        model = llm.model(),
        "Summarizer requesting completion"
    );
    let summary = llm.generate(&prompt).await?;
    let key_points = match kind {
        SummaryKind::KeyPoints => extract_key_points(&summary),
        _ => Vec::new(),
    };
    Ok(SummaryDraft {
        summary,
        key_points,
    })
}

/// Answerer: answer `question` grounded in the retrieved `hits`.
pub async fn answer(
    llm: &dyn GenerationClient,
    budget: &TokenBudget,
    question: &str,
    hits: Vec<SearchHit>,
) -> Result<AnswerDraft, GenerationError> {
    let retrieved = hits.len();
    let context = budget.fit(hits, |hit| hit.text.as_str());
    let formatted = (!context.is_empty()).then(|| format_context(&context));
    let prompt = answer_prompt(question, formatted.as_deref());

    tracing::info!(
        retrieved,
        context_chunks = context.len(),
        model = llm.model(),
        "Answerer requesting completion"
    );
    let answer = llm.generate(&prompt).await?;
    Ok(AnswerDraft { answer, context })
}

/// Cut the characters each chunk shares with its predecessor.
///
/// Chunks must be in reading order. Offsets that do not overlap leave the text untouched.
fn strip_overlap(chunks: Vec<StoredChunk>) -> Vec<StoredChunk> {
    let mut previous_end: Option<usize> = None;
    chunks
        .into_iter()
        .map(|mut chunk| {
            if let Some(end) = previous_end
                && end > chunk.char_start
            {
                let shared = (end - chunk.char_start).min(chunk.text.chars().count());
                chunk.text = chunk.text.chars().skip(shared).collect();
                chunk.char_start += shared;
            }
            previous_end = Some(chunk.char_end);
            chunk
        })
        .collect()
}

fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(position, hit)| {
            let source = hit
                .title
                .as_deref()
                .or(hit.filename.as_deref())
                .unwrap_or(hit.document_id.as_str());
            format!(
                "[{}] {source} (chunk {}):\n{}",
                position + 1,
                hit.chunk_index,
                hit.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingClient {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingClient {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl GenerationClient for RecordingClient {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    fn stored(index: usize, char_start: usize, text: &str) -> StoredChunk {
        StoredChunk {
            chunk_index: index,
            char_start,
            char_end: char_start + text.chars().count(),
            text: text.into(),
        }
    }

    fn hit(text: &str) -> SearchHit {
        ranked_hit(0, text)
    }

    fn ranked_hit(chunk_index: usize, text: &str) -> SearchHit {
        SearchHit {
            document_id: "doc-1".into(),
            chunk_index,
            score: 0.8,
            text: text.into(),
            filename: Some("paper.pdf".into()),
            title: Some("Attention Is All You Need".into()),
        }
    }

    #[tokio::test]
    async fn summarizer_keeps_chunk_order_within_budget() {
        let llm = RecordingClient::new("A summary.");
        let budget = TokenBudget::whitespace(4);

        let draft = summarize(
            &llm,
            &budget,
            SummaryKind::General,
            vec![
                stored(0, 0, "first chunk "),
                stored(1, 12, "second chunk "),
                stored(2, 25, "third chunk"),
            ],
        )
        .await
        .expect("summary");

        assert_eq!(draft.summary, "A summary.");
        assert!(draft.key_points.is_empty());
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        let first = prompts[0].find("first chunk").expect("first");
        let second = prompts[0].find("second chunk").expect("second");
        assert!(first < second);
        assert!(!prompts[0].contains("third chunk"));
    }

    #[tokio::test]
    async fn key_points_summary_returns_parsed_points() {
        let llm = RecordingClient::new("- Transformers\n- Self-attention");
        let draft = summarize(
            &llm,
            &TokenBudget::whitespace(100),
            SummaryKind::KeyPoints,
            vec![stored(0, 0, "text")],
        )
        .await
        .expect("summary");
        assert_eq!(draft.key_points, vec!["Transformers", "Self-attention"]);
    }

    #[tokio::test]
    async fn answerer_without_hits_uses_marker() {
        let llm = RecordingClient::new("I could not find that.");
        let draft = answer(&llm, &TokenBudget::whitespace(100), "What is BERT?", Vec::new())
            .await
            .expect("answer");

        assert_eq!(draft.answer, "I could not find that.");
        assert!(draft.context.is_empty());
        assert!(llm.prompts()[0].contains(NO_CONTEXT_MARKER));
    }

    #[tokio::test]
    async fn answerer_labels_context_with_source() {
        let llm = RecordingClient::new("Attention.");
        answer(
            &llm,
            &TokenBudget::whitespace(100),
            "What is used?",
            vec![hit("Self-attention replaces recurrence.")],
        )
        .await
        .expect("answer");

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("[1] Attention Is All You Need (chunk 0)"));
        assert!(prompt.contains("Self-attention replaces recurrence."));
        assert!(!prompt.contains(NO_CONTEXT_MARKER));
    }

    #[tokio::test]
    async fn answerer_reports_only_hits_placed_in_prompt() {
        let llm = RecordingClient::new("Alpha.");
        let draft = answer(
            &llm,
            &TokenBudget::whitespace(3),
            "Which one?",
            vec![
                ranked_hit(0, "alpha beta gamma"),
                ranked_hit(1, "delta epsilon"),
                ranked_hit(2, "zeta"),
            ],
        )
        .await
        .expect("answer");

        let indices: Vec<_> = draft.context.iter().map(|hit| hit.chunk_index).collect();
        assert_eq!(indices, vec![0]);
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("alpha beta gamma"));
        assert!(!prompt.contains("delta epsilon"));
        assert!(!prompt.contains("zeta"));
    }

    #[tokio::test]
    async fn summarizer_sends_overlapping_text_once() {
        let llm = RecordingClient::new("Letters.");
        summarize(
            &llm,
            &TokenBudget::whitespace(100),
            SummaryKind::General,
            vec![stored(0, 0, "abcdef"), stored(1, 4, "efghij"), stored(2, 8, "ijkl")],
        )
        .await
        .expect("summary");

        assert!(llm.prompts()[0].contains("\n\nabcdefghijkl\n\n"));
    }

    #[test]
    fn strip_overlap_leaves_disjoint_chunks() {
        let chunks = strip_overlap(vec![stored(0, 0, "one"), stored(1, 10, "two")]);
        let texts: Vec<_> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }
}
