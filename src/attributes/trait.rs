use crate::models::{Attribute, AttributeKind, AttributeTag};
use anyhow::Result;
use std::path::Path;

/// Host storage for tag attributes and the values attached to paths
#[async_trait::async_trait]
pub trait AttributeStore: Send + Sync {
    /// Fetch an attribute definition by name
    async fn get_attribute(&self, name: &str) -> Result<Option<Attribute>>;

    /// Create a new, empty attribute
    async fn create_attribute(&self, name: &str, kind: AttributeKind) -> Result<Attribute>;

    /// Replace the tag vocabulary of an attribute
    async fn set_attribute_tags(&self, attribute: &str, tags: &[AttributeTag]) -> Result<()>;

    /// Tags currently attached to `path` for an attribute, empty when unset
    async fn get_attribute_value(&self, path: &Path, attribute: &str) -> Result<Vec<AttributeTag>>;

    /// Attach tags to `path`, replacing any previous value
    async fn set_attribute_value(&self, path: &Path, attribute: &str, tags: &[AttributeTag]) -> Result<()>;
}
