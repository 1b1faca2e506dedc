//! Token counting behind a narrow trait.
//!
//! The store only ever needs "how many tokens is this text"; everything
//! else about tokenization is the oracle's business. The production
//! implementation wraps tiktoken's BPE for the configured model; tests
//! inject deterministic stubs.

use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Opaque token-counting oracle.
///
/// Counts are used for budget accounting only — never decoded, never
/// compared across models. Implementations bind their model at
/// construction time.
pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;
}

/// Tiktoken-backed counter for a specific model.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Resolve the BPE for `model`, falling back to `cl100k_base` for
    /// models tiktoken doesn't know.
    pub fn for_model(model: &str) -> Self {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(e) => {
                warn!("no tokenizer for model '{model}' ({e}), falling back to cl100k_base");
                tiktoken_rs::cl100k_base().expect("cl100k_base tokenizer is embedded")
            }
        };
        Self { bpe }
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}
