//! Token counting and context budget enforcement.

use thiserror::Error;
use tiktoken_rs::{o200k_base, CoreBPE};

/// Tokenizer construction failure.
#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("Tokenizer vocabulary failed to load: {0}")]
    Vocabulary(String),
}

/// Deterministic token counting under one fixed encoding.
///
/// The encoding is `o200k_base` and never varies per call, so the same
/// text always counts the same and truncation decisions are reproducible
/// across runs.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn new() -> Result<Self, TokenizerError> {
        let bpe = o200k_base().map_err(|e| TokenizerError::Vocabulary(e.to_string()))?;
        Ok(Self { bpe })
    }

    /// Exact token count of `text`. Empty text counts zero.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Cut `text` to at most `limit` tokens, appending `notice` when a cut
    /// happened.
    ///
    /// The cut is token-aligned, backing off past any token boundary that
    /// splits a multi-byte character. The returned text re-encodes to at
    /// most `limit` tokens (re-encoding can merge tokens differently, so
    /// the cut shrinks until it fits), which makes the operation
    /// idempotent. The degenerate case of a notice costing more than
    /// `limit` on its own returns the notice alone, still stable under
    /// re-application. Never fails.
    pub fn truncate_to_token_limit(&self, text: &str, limit: usize, notice: &str) -> String {
        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= limit {
            return text.to_string();
        }

        let notice_cost = self.count_tokens(notice);
        let mut available = limit.saturating_sub(notice_cost);

        loop {
            let body = self.decode_prefix(&tokens, available);
            let candidate = format!("{body}{notice}");
            if available == 0 || self.count_tokens(&candidate) <= limit {
                return candidate;
            }
            available -= 1;
        }
    }

    /// Decode the first `len` tokens, backing off one token at a time when
    /// the boundary lands inside a multi-byte character.
    fn decode_prefix(&self, tokens: &[u32], len: usize) -> String {
        let mut end = len.min(tokens.len());
        while end > 0 {
            if let Ok(text) = self.bpe.decode(tokens[..end].to_vec()) {
                return text;
            }
            end -= 1;
        }
        String::new()
    }
}
