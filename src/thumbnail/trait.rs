use anyhow::Result;
use std::path::{Path, PathBuf};

/// Host thumbnail renderer
#[async_trait::async_trait]
pub trait ThumbnailProvider: Send + Sync {
    /// A preview the host already rendered for `source`, if any
    async fn existing_thumbnail(&self, source: &Path) -> Option<PathBuf>;

    /// Render a preview of `source` into `output_dir` as `<stem>_pt.png`.
    /// Producing no file is how the host reports that it could not render.
    async fn generate_thumbnail(&self, source: &Path, output_dir: &Path) -> Result<()>;
}
