use std::path::Path;

use tokenizers::Tokenizer as HfTokenizer;

use relay_core::{RelayError, Result, TextDecoder};

/// HuggingFace-backed tokenizer adapter. This is the production
/// implementation of the [`TextDecoder`] seam a node binds to.
pub struct RelayTokenizer {
    inner: HfTokenizer,
}

impl RelayTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner =
            HfTokenizer::from_file(path).map_err(|e| RelayError::Tokenizer(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn from_inner(inner: HfTokenizer) -> Self {
        Self { inner }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| RelayError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    pub fn decode(&self, token_ids: &[u32]) -> Result<String> {
        self.inner
            .decode(token_ids, true)
            .map_err(|e| RelayError::Tokenizer(e.to_string()))
    }
}

impl TextDecoder for RelayTokenizer {
    fn decode(&self, token_ids: &[u32]) -> Result<String> {
        RelayTokenizer::decode(self, token_ids)
    }
}
