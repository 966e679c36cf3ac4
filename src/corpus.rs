//! Corpus loading.
//!
//! A corpus is immutable UTF-8 text identified by the SHA-256 of its
//! content. That key is what the pipeline caches indexes under, so two
//! corpora with the same text share one index regardless of where the text
//! came from.

use std::path::Path;

use symmetriq_core::error::{RagError, Result};
use symmetriq_core::models::sha256_hex;

/// Trusted Q/A pairs used when no corpus file is supplied.
pub const DEFAULT_KNOWLEDGE: &str = "\
Q: How often should I work out?
A: Most people benefit from 3–5 sessions per week depending on goals.

Q: What's a good beginner workout?
A: Full-body workouts 3 times a week, focusing on compound movements.

Q: How much protein do I need?
A: About 1.6–2.2 grams per kg of body weight per day.

Q: Can I train every day?
A: You can, but it’s important to manage recovery, volume, and sleep.

Q: Should I bulk or cut first?
A: If you’re underweight, bulk. If you’re above 20% body fat, cut.
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    text: String,
    key: String,
}

impl Corpus {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let key = sha256_hex(text.as_bytes());
        Self { text, key }
    }

    /// The built-in knowledge text.
    pub fn default_knowledge() -> Self {
        Self::new(DEFAULT_KNOWLEDGE)
    }

    /// Decode uploaded bytes.
    ///
    /// # Errors
    ///
    /// [`RagError::InputValidation`] on `corpus` if the bytes are not UTF-8
    /// or contain only whitespace.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let corpus = String::from_utf8(bytes)
            .map(Self::new)
            .map_err(|e| RagError::invalid("corpus", format!("not valid UTF-8 text: {}", e)))?;
        if corpus.is_blank() {
            return Err(RagError::invalid("corpus", "is empty"));
        }
        Ok(corpus)
    }

    /// Read a plain-text corpus file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            RagError::invalid("corpus", format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    /// `path` if given, otherwise the built-in knowledge.
    pub fn from_file_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default_knowledge()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Hex SHA-256 of the text.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_content_hash() {
        let a = Corpus::new("same text");
        let b = Corpus::from_bytes(b"same text".to_vec()).unwrap();
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), Corpus::new("other text").key());
    }

    #[test]
    fn test_default_knowledge_has_five_pairs() {
        let corpus = Corpus::default_knowledge();
        assert_eq!(corpus.text().matches("Q: ").count(), 5);
        assert!(corpus.text().contains("How much protein do I need?"));
        assert!(!corpus.is_blank());
    }

    #[test]
    fn test_non_utf8_rejected() {
        match Corpus::from_bytes(vec![0xff, 0xfe, 0x00]) {
            Err(RagError::InputValidation { field, .. }) => assert_eq!(field, "corpus"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank() {
        assert!(Corpus::new("").is_blank());
        assert!(Corpus::new(" \n\t ").is_blank());
        assert!(matches!(
            Corpus::from_bytes(b" \n ".to_vec()),
            Err(RagError::InputValidation { field: "corpus", .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.txt");
        std::fs::write(&path, "Q: Rest days?\nA: Take two.").unwrap();
        let corpus = Corpus::from_file(&path).unwrap();
        assert!(corpus.text().starts_with("Q: Rest days?"));

        assert!(Corpus::from_file(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_from_file_or_default() {
        let corpus = Corpus::from_file_or_default(None).unwrap();
        assert_eq!(corpus, Corpus::default_knowledge());
    }
}
