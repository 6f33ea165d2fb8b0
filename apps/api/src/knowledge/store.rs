use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::knowledge::similarity::cosine_similarity;

/// Separator placed between retrieved fragments in the concatenated context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Number of fragments retrieved per query unless a caller overrides it.
pub const DEFAULT_TOP_K: usize = 3;

const ERR_INVALID_JSON: &str = "El archivo no tiene un formato JSON válido.";
const ERR_NOT_ARRAY: &str =
    "El archivo proporcionado no es un JSON de embeddings válido (se esperaba un array).";
const ERR_BAD_SHAPE: &str = "El archivo proporcionado no es un JSON de embeddings válido.";
const ERR_MIXED_DIMENSIONS: &str =
    "Los embeddings del archivo no tienen una dimensión uniforme.";
const ERR_QUERY_DIMENSION: &str =
    "La dimensión del embedding de consulta no coincide con la base de conocimiento.";

/// A unit of CV text paired with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub id: String,
    pub text: String,
    pub embedding: Vec<f64>,
}

/// In-memory knowledge corpus mirrored to a JSON file on disk.
///
/// The in-memory state is authoritative; the mirror is only a cache-warm
/// snapshot read back at startup. Replace swaps the whole corpus at once —
/// readers observe either the old corpus or the new one, never a partial mix.
pub struct VectorStore {
    fragments: RwLock<Vec<Fragment>>,
    file_path: PathBuf,
}

impl VectorStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            fragments: RwLock::new(Vec::new()),
            file_path,
        }
    }

    /// Loads the disk mirror into memory at startup.
    /// A missing file or a parse error leaves the store empty — never fatal.
    pub async fn load_from_disk(&self) {
        let raw = match tokio::fs::read(&self.file_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                error!("Error reading embeddings file: {e}");
                return;
            }
        };

        match serde_json::from_slice::<Vec<Fragment>>(&raw) {
            Ok(fragments) => {
                info!("Loaded {} fragments from disk.", fragments.len());
                *self.fragments.write().await = fragments;
            }
            Err(e) => error!("Error reading embeddings file: {e}"),
        }
    }

    /// Replaces the whole corpus with the parsed contents of `raw`.
    ///
    /// The payload must be a JSON array whose elements all carry a non-empty
    /// `text` and an array `embedding` of one shared dimensionality. On
    /// success the previous corpus is fully discarded and the payload is
    /// persisted best-effort to the mirror path.
    pub async fn replace(&self, raw: &[u8]) -> Result<usize, AppError> {
        let value: serde_json::Value = serde_json::from_slice(raw)
            .map_err(|_| AppError::Validation(ERR_INVALID_JSON.to_string()))?;

        let items = value
            .as_array()
            .ok_or_else(|| AppError::Validation(ERR_NOT_ARRAY.to_string()))?;

        let well_shaped = items.iter().all(|item| {
            let has_text = item
                .get("text")
                .and_then(|t| t.as_str())
                .is_some_and(|t| !t.is_empty());
            let has_embedding = item.get("embedding").is_some_and(|e| e.is_array());
            has_text && has_embedding
        });
        if !well_shaped {
            return Err(AppError::Validation(ERR_BAD_SHAPE.to_string()));
        }

        let fragments: Vec<Fragment> = serde_json::from_value(value)
            .map_err(|_| AppError::Validation(ERR_BAD_SHAPE.to_string()))?;

        if let Some(first) = fragments.first() {
            let dimension = first.embedding.len();
            if fragments.iter().any(|f| f.embedding.len() != dimension) {
                return Err(AppError::Validation(ERR_MIXED_DIMENSIONS.to_string()));
            }
        }

        let count = fragments.len();
        let snapshot = serde_json::to_vec(&fragments).map_err(anyhow::Error::from)?;
        *self.fragments.write().await = fragments;

        if let Err(e) = self.persist(&snapshot).await {
            warn!("Could not persist knowledge base to disk, keeping in-memory state: {e}");
        }

        Ok(count)
    }

    async fn persist(&self, snapshot: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.file_path, snapshot).await
    }

    /// Empties the corpus and deletes the disk mirror if present.
    /// Deletion failures are logged and swallowed.
    pub async fn clear(&self) {
        self.fragments.write().await.clear();

        match tokio::fs::remove_file(&self.file_path).await {
            Ok(()) => info!("Knowledge base file deleted from disk."),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!("Could not delete file from disk: {e}"),
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.fragments.read().await.is_empty()
    }

    /// Returns the `top_k` most similar fragment texts joined by the fixed
    /// separator, most relevant first. An empty corpus yields an empty string.
    /// Equal scores keep their original upload order.
    pub async fn search(&self, query_embedding: &[f64], top_k: usize) -> Result<String, AppError> {
        let fragments = self.fragments.read().await;
        if fragments.is_empty() {
            return Ok(String::new());
        }

        if fragments[0].embedding.len() != query_embedding.len() {
            return Err(AppError::Validation(ERR_QUERY_DIMENSION.to_string()));
        }

        let mut ranked: Vec<(f64, &str)> = fragments
            .iter()
            .map(|f| (cosine_similarity(query_embedding, &f.embedding), f.text.as_str()))
            .collect();
        // sort_by is stable: ties stay in upload order
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let context = ranked
            .iter()
            .take(top_k)
            .map(|(_, text)| *text)
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> VectorStore {
        VectorStore::new(dir.path().join("data").join("cv-embeddings.json"))
    }

    fn corpus() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!([
            {"id": "a", "text": "experiencia backend", "embedding": [1.0, 0.0]},
            {"id": "b", "text": "educacion", "embedding": [0.0, 1.0]},
            {"id": "c", "text": "proyectos cloud", "embedding": [0.9, 0.1]},
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn test_replace_returns_fragment_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.replace(&corpus()).await.unwrap(), 3);
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn test_replace_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let err = store.replace(b"{not json").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == ERR_INVALID_JSON));
    }

    #[tokio::test]
    async fn test_replace_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let err = store.replace(br#"{"text": "x"}"#).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == ERR_NOT_ARRAY));
    }

    #[tokio::test]
    async fn test_replace_rejects_missing_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let raw = br#"[{"id": "a", "text": "hola"}]"#;
        let err = store.replace(raw).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == ERR_BAD_SHAPE));
    }

    #[tokio::test]
    async fn test_replace_rejects_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let raw = br#"[{"id": "a", "text": "", "embedding": [1.0]}]"#;
        let err = store.replace(raw).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == ERR_BAD_SHAPE));
    }

    #[tokio::test]
    async fn test_replace_rejects_mixed_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let raw = serde_json::to_vec(&serde_json::json!([
            {"text": "a", "embedding": [1.0, 0.0]},
            {"text": "b", "embedding": [1.0]},
        ]))
        .unwrap();
        let err = store.replace(&raw).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == ERR_MIXED_DIMENSIONS));
    }

    #[tokio::test]
    async fn test_replace_discards_previous_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.replace(&corpus()).await.unwrap();

        let raw = serde_json::to_vec(&serde_json::json!([
            {"text": "solo este fragmento", "embedding": [1.0, 0.0]},
        ]))
        .unwrap();
        store.replace(&raw).await.unwrap();

        let context = store.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(context, "solo este fragmento");
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity_and_caps_at_top_k() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.replace(&corpus()).await.unwrap();

        let context = store.search(&[1.0, 0.0], 2).await.unwrap();
        let parts: Vec<&str> = context.split(CONTEXT_SEPARATOR).collect();
        assert_eq!(parts, vec!["experiencia backend", "proyectos cloud"]);
    }

    #[tokio::test]
    async fn test_search_on_empty_store_returns_empty_string() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.search(&[1.0, 0.0], 3).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_search_rejects_query_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.replace(&corpus()).await.unwrap();
        let err = store.search(&[1.0, 0.0, 0.0], 3).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == ERR_QUERY_DIMENSION));
    }

    #[tokio::test]
    async fn test_mirror_round_trip_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("cv-embeddings.json");

        let store = VectorStore::new(path.clone());
        store.replace(&corpus()).await.unwrap();
        assert!(path.exists());

        let restarted = VectorStore::new(path);
        restarted.load_from_disk().await;
        assert!(!restarted.is_empty().await);
        let context = restarted.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(context, "educacion");
    }

    #[tokio::test]
    async fn test_clear_empties_memory_and_removes_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("cv-embeddings.json");

        let store = VectorStore::new(path.clone());
        store.replace(&corpus()).await.unwrap();
        store.clear().await;

        assert!(store.is_empty().await);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_clear_without_mirror_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.clear().await; // no file on disk, nothing to fail
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_from_disk_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv-embeddings.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let store = VectorStore::new(path);
        store.load_from_disk().await;
        assert!(store.is_empty().await);
    }
}
