use crate::attributes::AttributeStore;
use crate::error::TaggerError;
use crate::labels::{AttributeRegistry, VariantTable};
use crate::llm::TaggingBackend;
use crate::models::{slice_batches, Attribute, Batch, PreviewEntry, TagCategory, TaggingResult};
use crate::progress::{Progress, ProgressSink};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Attribute whose value marks a file as already tagged
pub const PRIMARY_CATEGORY: TagCategory = TagCategory::Types;

/// What a finished (or cancelled) execution got through
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub batches_completed: usize,
    pub files_tagged: usize,
    pub cancelled: bool,
}

struct CategoryTarget {
    category: TagCategory,
    attribute: Attribute,
    variants: VariantTable,
}

/// Sends batches to the tagging backend one at a time and writes the answers
pub struct BatchTaggingExecutor<'a> {
    backend: &'a dyn TaggingBackend,
    registry: AttributeRegistry<'a>,
    categories: Vec<TagCategory>,
    prompt: String,
    batch_size: usize,
}

impl<'a> BatchTaggingExecutor<'a> {
    pub fn new(
        backend: &'a dyn TaggingBackend,
        store: &'a dyn AttributeStore,
        categories: Vec<TagCategory>,
        prompt: String,
        batch_size: usize,
    ) -> Self {
        Self {
            backend,
            registry: AttributeRegistry::new(store),
            categories,
            prompt,
            batch_size,
        }
    }

    /// Drop previews whose source already has a primary-category value, then re-slice
    pub async fn skip_existing(&self, batches: Vec<Batch>) -> Result<Vec<Batch>, TaggerError> {
        let store = self.registry.store();
        let before: usize = batches.iter().map(Batch::len).sum();

        let mut remaining = Vec::with_capacity(before);
        for entry in batches.into_iter().flat_map(|batch| batch.previews) {
            let existing = store
                .get_attribute_value(&entry.source, PRIMARY_CATEGORY.attribute_name())
                .await?;
            if existing.is_empty() {
                remaining.push(entry);
            } else {
                debug!(path = %entry.source.display(), "Skipping already tagged file");
            }
        }

        info!(before, after = remaining.len(), "Reduced previews");
        Ok(slice_batches(remaining, self.batch_size))
    }

    /// Tag every batch in order.
    ///
    /// Cancellation is checked before each batch; tags written by earlier batches
    /// stay in place. A response shorter than its batch aborts the whole run.
    pub async fn execute(&self, batches: &[Batch], progress: &dyn ProgressSink) -> Result<ExecutionReport, TaggerError> {
        let batch_bar = progress.start("Requesting tags");
        let image_bar = progress.start("Applying tags");

        let result = self
            .run_batches(batches, progress, batch_bar.as_ref(), image_bar.as_ref())
            .await;

        batch_bar.finish();
        image_bar.finish();
        result
    }

    async fn run_batches(
        &self,
        batches: &[Batch],
        progress: &dyn ProgressSink,
        batch_bar: &dyn Progress,
        image_bar: &dyn Progress,
    ) -> Result<ExecutionReport, TaggerError> {
        let started = Instant::now();
        let mut targets = self.targets().await?;
        let mut report = ExecutionReport::default();

        for batch in batches {
            if progress.is_cancelled() {
                info!(completed = report.batches_completed, total = batches.len(), "Tagging cancelled");
                report.cancelled = true;
                return Ok(report);
            }

            let results = match self.backend.tag_images(&self.prompt, batch, &self.categories).await {
                Ok(results) => results,
                Err(e) if e.is_empty_response() => {
                    warn!(batch = batch.index, error = %e, "Tagging request returned nothing");
                    Vec::new()
                }
                Err(e) => return Err(e),
            };

            if results.len() < batch.len() {
                return Err(TaggerError::IncompleteBatch {
                    received: results.len(),
                    requested: batch.len(),
                });
            }
            report.batches_completed += 1;
            batch_bar.report(report.batches_completed as f64 / batches.len() as f64);

            for (i, (entry, result)) in batch.previews.iter().zip(&results).enumerate() {
                self.apply(entry, result, &mut targets).await?;
                report.files_tagged += 1;
                image_bar.report((i + 1) as f64 / batch.len() as f64);
            }
        }

        info!(
            files = report.files_tagged,
            batches = report.batches_completed,
            elapsed = ?started.elapsed(),
            "Finished tagging"
        );
        Ok(report)
    }

    async fn targets(&self) -> Result<Vec<CategoryTarget>, TaggerError> {
        let mut targets = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            targets.push(CategoryTarget {
                category: *category,
                attribute: self.registry.ensure_attribute(category.attribute_name()).await?,
                variants: category.variants(),
            });
        }
        Ok(targets)
    }

    async fn apply(
        &self,
        entry: &PreviewEntry,
        result: &TaggingResult,
        targets: &mut [CategoryTarget],
    ) -> Result<(), TaggerError> {
        for target in targets.iter_mut() {
            let Some(raw) = result.tags(target.category) else {
                continue;
            };
            let names = target.variants.dedupe(&clean_tags(raw));
            let tags = self.registry.resolve_tags(&mut target.attribute, &names).await?;
            self.registry
                .store()
                .set_attribute_value(&entry.source, &target.attribute.name, &tags)
                .await?;
            debug!(path = %entry.source.display(), attribute = %target.attribute.name, tags = ?names, "Applied tags");
        }
        Ok(())
    }
}

/// Trim answers and drop empty ones
pub fn clean_tags<S: AsRef<str>>(raw: &[S]) -> Vec<&str> {
    raw.iter()
        .map(|tag| tag.as_ref().trim())
        .filter(|tag| !tag.is_empty())
        .collect()
}
