use crate::thumbnail::{host_output_path, ThumbnailProvider};
use anyhow::{Context, Result};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Thumbnail host backed by the `image` crate.
/// Renders decodable image formats and produces nothing for anything else.
pub struct ImageThumbnailProvider {
    existing_dir: Option<PathBuf>,
    render_size: u32,
}

impl ImageThumbnailProvider {
    pub fn new(render_size: u32) -> Self {
        Self {
            existing_dir: None,
            render_size,
        }
    }

    /// Look for pre-rendered `<stem>_pt.png` previews in `dir`
    pub fn with_existing_dir(mut self, dir: PathBuf) -> Self {
        self.existing_dir = Some(dir);
        self
    }

    fn render(source: &Path, target: &Path, size: u32) -> Result<()> {
        let img = image::open(source)
            .with_context(|| format!("Failed to decode {}", source.display()))?;
        img.thumbnail(size, size)
            .save_with_format(target, ImageFormat::Png)
            .with_context(|| format!("Failed to write thumbnail {}", target.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ThumbnailProvider for ImageThumbnailProvider {
    async fn existing_thumbnail(&self, source: &Path) -> Option<PathBuf> {
        let dir = self.existing_dir.as_ref()?;
        let candidate = host_output_path(source, dir);
        candidate.is_file().then_some(candidate)
    }

    async fn generate_thumbnail(&self, source: &Path, output_dir: &Path) -> Result<()> {
        if ImageFormat::from_path(source).is_err() {
            debug!(path = %source.display(), "No renderer for file type");
            return Ok(());
        }

        let target = host_output_path(source, output_dir);
        let size = self.render_size;
        let result = tokio::task::spawn_blocking({
            let source = source.to_path_buf();
            move || Self::render(&source, &target, size)
        })
        .await?;

        if let Err(e) = result {
            warn!(path = %source.display(), error = %e, "Thumbnail render failed");
        }
        Ok(())
    }
}
