//! Token normalization and vocabulary validation

use crate::vocabulary::VocabularyStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Trim, collapse inner whitespace runs to one space, uppercase.
pub fn normalize_token(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// A normalized gloss label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(raw: &str) -> Self {
        Self(normalize_token(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Valid,
    Unknown,
}

/// One input token after validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedToken {
    /// Index in the request's token list
    pub position: usize,
    /// Token as received
    pub raw: String,
    pub token: Token,
    pub status: TokenStatus,
}

/// Per-request validation outcome, in input order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub tokens: Vec<ValidatedToken>,
}

impl ValidationReport {
    pub fn is_all_valid(&self) -> bool {
        self.tokens.iter().all(|t| t.status == TokenStatus::Valid)
    }

    pub fn unknown(&self) -> impl Iterator<Item = &ValidatedToken> {
        self.tokens.iter().filter(|t| t.status == TokenStatus::Unknown)
    }

    pub fn valid(&self) -> impl Iterator<Item = &ValidatedToken> {
        self.tokens.iter().filter(|t| t.status == TokenStatus::Valid)
    }

    /// Normalized tokens in input order, duplicates kept
    pub fn sequence(&self) -> Vec<Token> {
        self.tokens.iter().map(|t| t.token.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Classifies request tokens against the shared vocabulary.
///
/// Unknown tokens are reported, never rejected here; the caller decides what to do with them.
#[derive(Clone)]
pub struct TokenValidator {
    store: Arc<VocabularyStore>,
}

impl TokenValidator {
    pub fn new(store: Arc<VocabularyStore>) -> Self {
        Self { store }
    }

    pub fn validate<S: AsRef<str>>(&self, raw_tokens: &[S]) -> ValidationReport {
        let tokens = raw_tokens
            .iter()
            .enumerate()
            .map(|(position, raw)| {
                let raw = raw.as_ref();
                let token = Token::new(raw);
                let status = if !token.as_str().is_empty() && self.store.contains(token.as_str()) {
                    TokenStatus::Valid
                } else {
                    TokenStatus::Unknown
                };
                ValidatedToken {
                    position,
                    raw: raw.to_string(),
                    token,
                    status,
                }
            })
            .collect();

        ValidationReport { tokens }
    }

    pub fn store(&self) -> &Arc<VocabularyStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> TokenValidator {
        let store = VocabularyStore::from_json_str(r#"["YOU", "NAME", "WHAT", "THANK YOU"]"#)
            .unwrap();
        TokenValidator::new(Arc::new(store))
    }

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("  you "), "YOU");
        assert_eq!(normalize_token("thank \t  you"), "THANK YOU");
        assert_eq!(normalize_token("   "), "");
    }

    #[test]
    fn test_classifies_with_positions() {
        let report = validator().validate(&["you", "XYZQ", " name "]);
        assert_eq!(report.len(), 3);
        assert!(!report.is_all_valid());

        let unknown: Vec<_> = report.unknown().collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].position, 1);
        assert_eq!(unknown[0].raw, "XYZQ");

        assert_eq!(report.tokens[2].token.as_str(), "NAME");
        assert_eq!(report.tokens[2].status, TokenStatus::Valid);
    }

    #[test]
    fn test_multi_word_token_collapses_whitespace() {
        let report = validator().validate(&["thank    you"]);
        assert!(report.is_all_valid());
        assert_eq!(report.tokens[0].token.as_str(), "THANK YOU");
    }

    #[test]
    fn test_empty_input_gives_empty_report() {
        let report = validator().validate::<&str>(&[]);
        assert!(report.is_empty());
        assert!(report.is_all_valid());
    }

    #[test]
    fn test_duplicates_preserved_in_place() {
        let report = validator().validate(&["YOU", "WHAT", "YOU"]);
        let sequence: Vec<String> = report.sequence().iter().map(|t| t.to_string()).collect();
        assert_eq!(sequence, vec!["YOU", "WHAT", "YOU"]);
        assert_eq!(report.valid().count(), 3);
    }

    #[test]
    fn test_blank_token_is_unknown() {
        let report = validator().validate(&["YOU", "  "]);
        assert_eq!(report.tokens[1].status, TokenStatus::Unknown);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let validator = validator();
        let input = vec!["you".to_string(), "what".to_string(), "nope".to_string()];
        assert_eq!(validator.validate(&input), validator.validate(&input));
    }
}
