//! Prompt token budgeting.
//!
//! Context is admitted whole chunk by whole chunk until the next one would overflow the budget.

use tiktoken_rs::cl100k_base;

type TokenCounter = Box<dyn Fn(&str) -> usize + Send + Sync>;

/// Token allowance for the context portion of a prompt.
pub struct TokenBudget {
    limit: usize,
    counter: TokenCounter,
}

impl TokenBudget {
    /// Budget of `limit` tokens counted with the `cl100k_base` encoding.
    ///
    /// Falls back to whitespace counting when the encoding cannot be loaded.
    pub fn new(limit: usize) -> Self {
        let counter: TokenCounter = match cl100k_base() {
            Ok(encoding) => Box::new(move |segment: &str| encoding.encode_ordinary(segment).len()),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Tokenizer unavailable; falling back to whitespace counter"
                );
                whitespace_counter()
            }
        };
        Self { limit, counter }
    }

    /// Budget counting whitespace-separated words as tokens.
    pub fn whitespace(limit: usize) -> Self {
        Self {
            limit,
            counter: whitespace_counter(),
        }
    }

    /// Configured token limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Count tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        (self.counter)(text)
    }

    /// Keep the longest prefix of `items` whose combined text fits the budget.
    ///
    /// The first item is always kept so a prompt never goes out without context.
    pub fn fit<T>(&self, items: Vec<T>, text: impl Fn(&T) -> &str) -> Vec<T> {
        let total = items.len();
        let mut used = 0usize;
        let mut kept = Vec::with_capacity(total);
        for item in items {
            let tokens = self.count(text(&item));
            if !kept.is_empty() && used + tokens > self.limit {
                break;
            }
            used += tokens;
            kept.push(item);
        }
        if kept.len() < total {
            tracing::debug!(
                kept = kept.len(),
                dropped = total - kept.len(),
                tokens = used,
                limit = self.limit,
                "Trimmed prompt context to token budget"
            );
        }
        kept
    }
}

fn whitespace_counter() -> TokenCounter {
    Box::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}

#[cfg(test)]
mod tests {
    use super::TokenBudget;

    #[test]
    fn fit_stops_at_chunk_boundary() {
        let budget = TokenBudget::whitespace(4);
        let chunks = vec!["one two three", "four five", "six"];

        let kept = budget.fit(chunks, |chunk| *chunk);

        assert_eq!(kept, vec!["one two three"]);
    }

    #[test]
    fn fit_keeps_everything_within_budget() {
        let budget = TokenBudget::whitespace(10);
        let kept = budget.fit(vec!["a b", "c d", "e"], |chunk| *chunk);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn oversized_first_chunk_is_still_kept_whole() {
        let budget = TokenBudget::whitespace(2);
        let kept = budget.fit(vec!["a b c d", "e"], |chunk| *chunk);
        assert_eq!(kept, vec!["a b c d"]);
    }

    #[test]
    fn tiktoken_counter_counts_tokens() {
        let budget = TokenBudget::new(100);
        assert!(budget.count("attention is all you need") >= 4);
        assert_eq!(budget.limit(), 100);
    }
}
