use crate::attributes::AttributeStore;
use crate::models::{path_key, Attribute, AttributeKind, AttributeTag};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// On-disk layout of the attribute store
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    attributes: BTreeMap<String, Attribute>,
    /// path -> attribute name -> tags
    #[serde(default)]
    values: BTreeMap<String, BTreeMap<String, Vec<AttributeTag>>>,
}

/// Attribute store kept in a single JSON document
///
/// Every mutation rewrites the whole document through a temporary file and a
/// rename, so a crash never leaves a half-written store behind.
pub struct JsonAttributeStore {
    path: Option<PathBuf>,
    document: Mutex<StoreDocument>,
}

impl JsonAttributeStore {
    /// Open the store at `path`, starting empty if the file does not exist yet
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let document = if path.exists() {
            let content = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read attribute store: {}", path.display()))?;
            serde_json::from_slice(&content)
                .with_context(|| format!("Failed to parse attribute store: {}", path.display()))?
        } else {
            StoreDocument::default()
        };

        Ok(Self {
            path: Some(path),
            document: Mutex::new(document),
        })
    }

    /// Store that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: Mutex::new(StoreDocument::default()),
        }
    }

    /// All values stored for a path, keyed by attribute name
    pub async fn values_for(&self, path: &Path) -> BTreeMap<String, Vec<AttributeTag>> {
        let document = self.document.lock().await;
        document.values.get(&path_key(path)).cloned().unwrap_or_default()
    }

    /// Paths that carry at least one attribute value
    pub async fn tagged_paths(&self) -> Vec<String> {
        let document = self.document.lock().await;
        document.values.keys().cloned().collect()
    }

    async fn persist(&self, document: &StoreDocument) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create store directory: {}", parent.display()))?;
        }

        let content = serde_json::to_vec_pretty(document).context("Failed to serialize attribute store")?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("Failed to write attribute store: {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .with_context(|| format!("Failed to replace attribute store: {}", path.display()))?;

        debug!(path = %path.display(), "Attribute store saved");
        Ok(())
    }
}

#[async_trait::async_trait]
impl AttributeStore for JsonAttributeStore {
    async fn get_attribute(&self, name: &str) -> Result<Option<Attribute>> {
        let document = self.document.lock().await;
        Ok(document.attributes.get(name).cloned())
    }

    async fn create_attribute(&self, name: &str, kind: AttributeKind) -> Result<Attribute> {
        let mut document = self.document.lock().await;
        let attribute = document
            .attributes
            .entry(name.to_string())
            .or_insert_with(|| Attribute::new(name, kind))
            .clone();
        self.persist(&document).await?;
        Ok(attribute)
    }

    async fn set_attribute_tags(&self, attribute: &str, tags: &[AttributeTag]) -> Result<()> {
        let mut document = self.document.lock().await;
        let entry = document
            .attributes
            .get_mut(attribute)
            .with_context(|| format!("Unknown attribute: {}", attribute))?;
        entry.tags = tags.to_vec();
        self.persist(&document).await
    }

    async fn get_attribute_value(&self, path: &Path, attribute: &str) -> Result<Vec<AttributeTag>> {
        let document = self.document.lock().await;
        Ok(document
            .values
            .get(&path_key(path))
            .and_then(|values| values.get(attribute))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_attribute_value(&self, path: &Path, attribute: &str, tags: &[AttributeTag]) -> Result<()> {
        let mut document = self.document.lock().await;
        if !document.attributes.contains_key(attribute) {
            anyhow::bail!("Unknown attribute: {}", attribute);
        }
        document
            .values
            .entry(path_key(path))
            .or_default()
            .insert(attribute.to_string(), tags.to_vec());
        self.persist(&document).await
    }
}
