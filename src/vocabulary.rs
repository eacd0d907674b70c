//! Known ASL gloss tokens, indexed for membership and metadata queries

use crate::error::{GlossError, Result};
use crate::validation::normalize_token;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Optional per-token metadata carried by the dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// One recognized gloss token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub token: String,
    #[serde(flatten)]
    pub metadata: EntryMetadata,
}

/// Read-only index over the vocabulary dataset.
///
/// Built once at startup and shared behind an `Arc`; there is no mutation after `load`.
#[derive(Debug)]
pub struct VocabularyStore {
    entries: Vec<VocabularyEntry>,
    index: HashMap<String, usize>,
}

impl VocabularyStore {
    /// Build the index from `(token, metadata)` pairs.
    ///
    /// Tokens are normalized the same way request tokens are. The first occurrence of a
    /// duplicate wins. A blank token or an empty source is a `DatasetLoad` error.
    pub fn load<I, S>(source: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, EntryMetadata)>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();
        let mut index = HashMap::new();

        for (position, (raw, metadata)) in source.into_iter().enumerate() {
            let token = normalize_token(raw.as_ref());
            if token.is_empty() {
                return Err(GlossError::DatasetLoad(format!(
                    "blank token at entry {}",
                    position
                )));
            }
            if index.contains_key(&token) {
                continue;
            }
            index.insert(token.clone(), entries.len());
            entries.push(VocabularyEntry { token, metadata });
        }

        if entries.is_empty() {
            return Err(GlossError::DatasetLoad("dataset contains no tokens".to_string()));
        }

        tracing::debug!("Indexed {} vocabulary tokens", entries.len());

        Ok(Self { entries, index })
    }

    /// Parse a JSON dataset.
    ///
    /// Accepts a `{ "key": "word" }` object (values are the tokens), an array of strings, or
    /// an array of `{ "token", "category", "example" }` objects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let source: DatasetSource = serde_json::from_str(json)
            .map_err(|e| GlossError::DatasetLoad(format!("malformed dataset: {}", e)))?;

        match source {
            DatasetSource::Entries(entries) => Self::load(
                entries
                    .into_iter()
                    .map(|e| (e.token, EntryMetadata { category: e.category, example: e.example })),
            ),
            DatasetSource::Words(words) => {
                Self::load(words.into_iter().map(|w| (w, EntryMetadata::default())))
            }
            DatasetSource::Mapping(map) => {
                let words = map
                    .into_iter()
                    .map(|(key, value)| match value {
                        serde_json::Value::String(word) => Ok(word),
                        other => Err(GlossError::DatasetLoad(format!(
                            "value for \"{}\" is not a string: {}",
                            key, other
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::load(words.into_iter().map(|w| (w, EntryMetadata::default())))
            }
        }
    }

    /// Read and parse a JSON dataset file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GlossError::DatasetLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(&normalize_token(token))
    }

    pub fn lookup(&self, token: &str) -> Option<&VocabularyEntry> {
        self.index
            .get(&normalize_token(token))
            .map(|&i| &self.entries[i])
    }

    /// All entries in load order
    pub fn list_all(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetSource {
    Entries(Vec<RawEntry>),
    Words(Vec<String>),
    /// Keys are ignored; file order is kept (`preserve_order`)
    Mapping(serde_json::Map<String, serde_json::Value>),
}

#[derive(Deserialize)]
struct RawEntry {
    token: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    example: Option<String>,
}

type Loader = dyn Fn() -> Result<VocabularyStore> + Send + Sync;

/// Lazily built, process-wide vocabulary.
///
/// Concurrent first callers wait on the same initialization; the loader runs once on success.
/// A failed load is not cached, so the next caller retries it.
pub struct SharedVocabulary {
    loader: Box<Loader>,
    cell: OnceCell<Arc<VocabularyStore>>,
}

impl SharedVocabulary {
    pub fn new(loader: impl Fn() -> Result<VocabularyStore> + Send + Sync + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(move || VocabularyStore::from_file(&path))
    }

    pub async fn get(&self) -> Result<Arc<VocabularyStore>> {
        self.cell
            .get_or_try_init(|| async { (self.loader)().map(Arc::new) })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn words(tokens: &[&str]) -> VocabularyStore {
        VocabularyStore::load(tokens.iter().map(|t| (*t, EntryMetadata::default()))).unwrap()
    }

    #[test]
    fn test_lookup_is_normalized() {
        let store = words(&["you", "Name", "what"]);
        assert!(store.contains("YOU"));
        assert!(store.contains("  name "));
        assert!(!store.contains("XYZQ"));
        assert_eq!(store.lookup("What").map(|e| e.token.as_str()), Some("WHAT"));
    }

    #[test]
    fn test_list_all_keeps_load_order_and_first_duplicate() {
        let store = VocabularyStore::load(vec![
            ("HELLO", EntryMetadata { category: Some("greeting".into()), example: None }),
            ("YOU", EntryMetadata::default()),
            ("hello", EntryMetadata { category: Some("other".into()), example: None }),
        ])
        .unwrap();

        let tokens: Vec<&str> = store.list_all().iter().map(|e| e.token.as_str()).collect();
        assert_eq!(tokens, vec!["HELLO", "YOU"]);
        assert_eq!(
            store.lookup("HELLO").unwrap().metadata.category.as_deref(),
            Some("greeting")
        );
    }

    #[test]
    fn test_empty_source_fails() {
        let result = VocabularyStore::load(Vec::<(String, EntryMetadata)>::new());
        assert!(matches!(result, Err(GlossError::DatasetLoad(_))));
    }

    #[test]
    fn test_blank_token_fails() {
        let result = VocabularyStore::load(vec![("YOU", EntryMetadata::default()), ("   ", EntryMetadata::default())]);
        assert!(matches!(result, Err(GlossError::DatasetLoad(_))));
    }

    #[test]
    fn test_json_shapes() {
        let mapping = VocabularyStore::from_json_str(r#"{"a": "you", "b": "name"}"#).unwrap();
        assert!(mapping.contains("YOU") && mapping.contains("NAME"));

        let list = VocabularyStore::from_json_str(r#"["you", "what"]"#).unwrap();
        assert_eq!(list.len(), 2);

        let entries = VocabularyStore::from_json_str(
            r#"[{"token": "eat", "category": "verb", "example": "I EAT"}]"#,
        )
        .unwrap();
        let entry = entries.lookup("EAT").unwrap();
        assert_eq!(entry.metadata.category.as_deref(), Some("verb"));
        assert_eq!(entry.metadata.example.as_deref(), Some("I EAT"));
    }

    #[test]
    fn test_malformed_json_fails() {
        assert!(matches!(
            VocabularyStore::from_json_str("{not json"),
            Err(GlossError::DatasetLoad(_))
        ));
        assert!(matches!(
            VocabularyStore::from_json_str("42"),
            Err(GlossError::DatasetLoad(_))
        ));
        assert!(matches!(
            VocabularyStore::from_json_str("[]"),
            Err(GlossError::DatasetLoad(_))
        ));
    }

    #[test]
    fn test_bundled_dataset_loads() {
        let store = VocabularyStore::from_file(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/data/english_words.json"
        ))
        .unwrap();
        assert!(store.contains("YOU"));
        assert!(store.contains("NAME"));
        assert!(store.contains("WHAT"));
        assert!(store.contains("thank you"));

        let head: Vec<&str> = store.list_all()[..5].iter().map(|e| e.token.as_str()).collect();
        assert_eq!(head, vec!["YOU", "ME", "I", "MY", "YOUR"]);
    }

    #[test]
    fn test_mapping_keeps_file_order() {
        let store = VocabularyStore::from_json_str(r#"{"z": "you", "a": "name", "m": "what"}"#).unwrap();
        let tokens: Vec<&str> = store.list_all().iter().map(|e| e.token.as_str()).collect();
        assert_eq!(tokens, vec!["YOU", "NAME", "WHAT"]);
    }

    #[test]
    fn test_mapping_with_non_string_value_fails() {
        assert!(matches!(
            VocabularyStore::from_json_str(r#"{"you": "you", "count": 3}"#),
            Err(GlossError::DatasetLoad(_))
        ));
    }

    #[test]
    fn test_missing_file_is_dataset_error() {
        let result = VocabularyStore::from_file("/nonexistent/signgloss/words.json");
        assert!(matches!(result, Err(GlossError::DatasetLoad(_))));
    }

    #[tokio::test]
    async fn test_shared_vocabulary_builds_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let shared = Arc::new(SharedVocabulary::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            VocabularyStore::from_json_str(r#"["YOU", "NAME"]"#)
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                tokio::spawn(async move { shared.get().await.unwrap() })
            })
            .collect();

        let mut stores = Vec::new();
        for handle in handles {
            stores.push(handle.await.unwrap());
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(stores.iter().all(|s| Arc::ptr_eq(s, &stores[0])));
    }

    #[tokio::test]
    async fn test_shared_vocabulary_retries_after_failure() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let shared = SharedVocabulary::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(GlossError::DatasetLoad("first load fails".into()))
            } else {
                VocabularyStore::from_json_str(r#"["YOU"]"#)
            }
        });

        assert!(shared.get().await.is_err());
        assert!(shared.get().await.unwrap().contains("YOU"));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
