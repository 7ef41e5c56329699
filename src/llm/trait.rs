use crate::error::TaggerError;
use crate::models::{Batch, TagCategory, TaggingResult};

/// Remote model that writes tags for preview images and answers plain prompts
#[async_trait::async_trait]
pub trait TaggingBackend: Send + Sync {
    /// Tag every preview of the batch. Results come back in the order the images
    /// were sent; the response may be shorter than the batch.
    async fn tag_images(
        &self,
        prompt: &str,
        batch: &Batch,
        categories: &[TagCategory],
    ) -> Result<Vec<TaggingResult>, TaggerError>;

    /// Plain chat completion, used for folder tagging
    async fn complete(&self, system: &str, prompt: &str, max_tokens: u32) -> Result<String, TaggerError>;
}
