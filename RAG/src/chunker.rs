use tiktoken_rs::{cl100k_base, CoreBPE};

/// Splits text into bounded, overlapping windows.
///
/// Tokenizer path uses `cl100k_base`; when the tokenizer cannot be loaded
/// (offline build, missing ranks file) a character-based approximation
/// with a 4-chars-per-token ratio takes over. Both paths share the same
/// `stride = window - overlap` formula so chunk counts are comparable
/// across environments.
pub struct Chunker {
    tokenizer: Option<CoreBPE>,
}

impl Chunker {
    pub fn new() -> Self {
        let tokenizer = match cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                log::warn!("cl100k_base tokenizer unavailable, falling back to char-based chunking: {e}");
                None
            }
        };
        Chunker { tokenizer }
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        match &self.tokenizer {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => text.len() / 4,
        }
    }

    pub fn chunk(&self, text: &str, chunk_tokens: usize, overlap_tokens: usize) -> Vec<String> {
        match &self.tokenizer {
            Some(bpe) => self.chunk_tokenized(bpe, text, chunk_tokens, overlap_tokens),
            None => self.chunk_by_chars(text, chunk_tokens, overlap_tokens),
        }
    }

    fn chunk_tokenized(&self, bpe: &CoreBPE, text: &str, chunk_tokens: usize, overlap_tokens: usize) -> Vec<String> {
        let tokens = bpe.encode_ordinary(text);
        if tokens.is_empty() {
            return Vec::new();
        }

        let step = chunk_tokens.saturating_sub(overlap_tokens).max(1);
        let mut chunks = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let end = (i + chunk_tokens).min(tokens.len());
            let window = &tokens[i..end];
            match bpe.decode(window.to_vec()) {
                Ok(decoded) => {
                    let trimmed = decoded.trim().to_string();
                    if !trimmed.is_empty() {
                        chunks.push(trimmed);
                    }
                }
                Err(e) => log::warn!("failed to decode token window: {e}"),
            }
            if end == tokens.len() {
                break;
            }
            i += step;
        }
        chunks
    }

    fn chunk_by_chars(&self, text: &str, chunk_tokens: usize, overlap_tokens: usize) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let chars_per_chunk = chunk_tokens * 4;
        let overlap_chars = overlap_tokens * 4;
        let step = chars_per_chunk.saturating_sub(overlap_chars).max(1);

        let mut chunks = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let end = (i + chars_per_chunk).min(chars.len());
            let window: String = chars[i..end].iter().collect();
            let trimmed = window.trim().to_string();
            if !trimmed.is_empty() {
                chunks.push(trimmed);
            }
            if end == chars.len() {
                break;
            }
            i += step;
        }
        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_fallback_respects_stride_formula() {
        let chunker = Chunker { tokenizer: None };
        let text = "a".repeat(100);
        // chunk_tokens=10 -> 40 chars/chunk, overlap_tokens=2 -> 8 overlap chars, step=32
        let chunks = chunker.chunk_by_chars(&text, 10, 2);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 40));
    }

    #[test]
    fn char_fallback_handles_empty_text() {
        let chunker = Chunker { tokenizer: None };
        assert!(chunker.chunk_by_chars("", 10, 2).is_empty());
        assert!(chunker.chunk_by_chars("   ", 10, 2).is_empty());
    }

    #[test]
    fn char_fallback_token_estimate_is_four_per_char() {
        let chunker = Chunker { tokenizer: None };
        assert_eq!(chunker.count_tokens("abcdefgh"), 2);
    }

    #[test]
    fn tokenized_chunking_produces_nonempty_windows() {
        let chunker = Chunker::new();
        if chunker.tokenizer.is_none() {
            return; // offline environment without tokenizer ranks
        }
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(50);
        let chunks = chunker.chunk(&text, 20, 5);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(chunker.count_tokens(c) <= 20 + 5);
        }
    }
}
