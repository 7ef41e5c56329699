use crate::attributes::AttributeStore;
use crate::constants::TAG_COLORS;
use crate::models::{Attribute, AttributeKind, AttributeTag};
use anyhow::Result;
use tracing::debug;

/// Resolves tag names to host attribute tags, creating attributes and tags on first use
pub struct AttributeRegistry<'a> {
    store: &'a dyn AttributeStore,
}

impl<'a> AttributeRegistry<'a> {
    pub fn new(store: &'a dyn AttributeStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a dyn AttributeStore {
        self.store
    }

    /// Fetch the multiple-choice attribute `name`, creating it when missing
    pub async fn ensure_attribute(&self, name: &str) -> Result<Attribute> {
        if let Some(attribute) = self.store.get_attribute(name).await? {
            return Ok(attribute);
        }
        debug!(attribute = name, "Creating attribute");
        self.store
            .create_attribute(name, AttributeKind::MultipleChoiceTag)
            .await
    }

    /// Existing tag named `tag_name`, or a new one persisted on the attribute.
    ///
    /// Not guarded against two callers introducing the same new name at once;
    /// callers resolve tags sequentially.
    pub async fn resolve_tag(&self, attribute: &mut Attribute, tag_name: &str) -> Result<AttributeTag> {
        if let Some(tag) = attribute.find_tag(tag_name) {
            return Ok(tag.clone());
        }

        let tag = AttributeTag::new(tag_name, tag_color(tag_name));
        attribute.tags.push(tag.clone());
        self.store
            .set_attribute_tags(&attribute.name, &attribute.tags)
            .await?;
        debug!(attribute = %attribute.name, tag = tag_name, color = %tag.color, "Created tag");
        Ok(tag)
    }

    /// Resolve every name in order
    pub async fn resolve_tags<S: AsRef<str>>(
        &self,
        attribute: &mut Attribute,
        tag_names: &[S],
    ) -> Result<Vec<AttributeTag>> {
        let mut tags = Vec::with_capacity(tag_names.len());
        for name in tag_names {
            tags.push(self.resolve_tag(attribute, name.as_ref()).await?);
        }
        Ok(tags)
    }
}

/// Palette color for a tag name, stable across runs
pub fn tag_color(tag_name: &str) -> &'static str {
    let digest = blake3::hash(tag_name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    let index = u64::from_le_bytes(prefix) % TAG_COLORS.len() as u64;
    TAG_COLORS[index as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::JsonAttributeStore;

    #[test]
    fn test_tag_color_is_deterministic() {
        for name in ["Texture", "Sprite", "Sci-Fi", "Shovel", ""] {
            assert_eq!(tag_color(name), tag_color(name));
            assert!(TAG_COLORS.contains(&tag_color(name)));
        }
    }

    #[tokio::test]
    async fn test_ensure_attribute_creates_once() {
        let store = JsonAttributeStore::in_memory();
        let registry = AttributeRegistry::new(&store);

        let created = registry.ensure_attribute("AI-Genres").await.unwrap();
        assert_eq!(created.kind, AttributeKind::MultipleChoiceTag);

        let mut attribute = registry.ensure_attribute("AI-Genres").await.unwrap();
        registry.resolve_tag(&mut attribute, "RPG").await.unwrap();

        let fetched = registry.ensure_attribute("AI-Genres").await.unwrap();
        assert_eq!(fetched.tags.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_tag_creates_then_reuses() {
        let store = JsonAttributeStore::in_memory();
        let registry = AttributeRegistry::new(&store);
        let mut attribute = registry.ensure_attribute("AI-Types").await.unwrap();

        let first = registry.resolve_tag(&mut attribute, "Texture").await.unwrap();
        let second = registry.resolve_tag(&mut attribute, "Texture").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.color, tag_color("Texture"));
        assert_eq!(attribute.tags.len(), 1);

        let persisted = store.get_attribute("AI-Types").await.unwrap().unwrap();
        assert_eq!(persisted.tags, vec![first]);
    }

    #[tokio::test]
    async fn test_resolve_tags_keeps_names_unique() {
        let store = JsonAttributeStore::in_memory();
        let registry = AttributeRegistry::new(&store);
        let mut attribute = registry.ensure_attribute("AI-Objects").await.unwrap();

        let tags = registry
            .resolve_tags(&mut attribute, &["Shovel", "Potion", "Shovel"])
            .await
            .unwrap();

        assert_eq!(tags.len(), 3);
        assert_eq!(attribute.tags.len(), 2);
    }
}
