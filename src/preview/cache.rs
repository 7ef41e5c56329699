use crate::constants::{PREVIEW_DIR, PREVIEW_HASH_LEN, PREVIEW_STAGING_DIR, PREVIEW_SUFFIX};
use crate::error::TaggerError;
use crate::models::PreviewEntry;
use crate::preview::image::{normalize_preview, preview_dimensions};
use crate::preview::window::{BoundedWindow, WindowOutcome};
use crate::progress::ProgressSink;
use crate::thumbnail::{host_output_path, ThumbnailProvider};
use crate::utils;
use anyhow::Context;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of preparing previews for a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Previews in the order they finished; files without a preview are left out
    Ready(Vec<PreviewEntry>),
    /// The user cancelled; nothing prepared so far may be used
    Cancelled { completed: usize },
}

/// Produces content-addressed, size-capped previews for source files
pub struct PreviewCacheManager<'a> {
    thumbnails: &'a dyn ThumbnailProvider,
    preview_dir: PathBuf,
    window: BoundedWindow,
    max_dimension: u32,
    staging_seq: AtomicUsize,
}

impl<'a> PreviewCacheManager<'a> {
    pub fn new(
        thumbnails: &'a dyn ThumbnailProvider,
        preview_dir: PathBuf,
        window: usize,
        max_dimension: u32,
    ) -> Self {
        Self {
            thumbnails,
            preview_dir,
            window: BoundedWindow::new(window),
            max_dimension,
            staging_seq: AtomicUsize::new(0),
        }
    }

    /// `<tmp>/anchorpoint/ai_tagger/previews`
    pub fn default_preview_dir() -> PathBuf {
        PREVIEW_DIR
            .iter()
            .fold(std::env::temp_dir(), |dir, part| dir.join(part))
    }

    /// Working preview path for a source with the given content hash
    pub fn preview_path(&self, source: &Path, hash: &str) -> PathBuf {
        self.preview_dir.join(format!(
            "{}_{}{}",
            utils::asset_stem(source),
            hash,
            PREVIEW_SUFFIX
        ))
    }

    /// Prepare a preview for every source, at most `window` at a time.
    ///
    /// Progress is reported after each finished attempt. Cancellation is checked
    /// before any work starts and after each completion.
    pub async fn prepare(
        &self,
        sources: &[PathBuf],
        progress: &dyn ProgressSink,
    ) -> Result<PreviewOutcome, TaggerError> {
        tokio::fs::create_dir_all(&self.preview_dir)
            .await
            .with_context(|| format!("Failed to create preview directory: {}", self.preview_dir.display()))?;

        let bar = progress.start("Generating previews");
        if progress.is_cancelled() {
            bar.finish();
            return Ok(PreviewOutcome::Cancelled { completed: 0 });
        }

        let started = Instant::now();
        let total = sources.len();
        let mut previews = Vec::with_capacity(total);
        let mut attempts = 0usize;

        info!(files = total, dir = %self.preview_dir.display(), "Generating previews");
        let outcome = self
            .window
            .run(
                sources.iter(),
                |source| self.generate(source),
                |result| {
                    attempts += 1;
                    match result {
                        Ok(entry) => previews.push(entry),
                        Err(e) => warn!(error = %e, "Skipping file without preview"),
                    }
                    bar.report(attempts as f64 / total as f64);

                    if progress.is_cancelled() {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
            )
            .await;
        bar.finish();

        match outcome {
            WindowOutcome::Completed { .. } => {
                info!(
                    previews = previews.len(),
                    files = total,
                    elapsed = ?started.elapsed(),
                    "Finished generating previews"
                );
                Ok(PreviewOutcome::Ready(previews))
            }
            WindowOutcome::Stopped { completed } => {
                info!(completed, files = total, "Preview generation cancelled");
                Ok(PreviewOutcome::Cancelled { completed })
            }
        }
    }

    async fn generate(&self, source: &Path) -> Result<PreviewEntry, TaggerError> {
        let failed = |reason: String| TaggerError::PreviewGeneration {
            path: source.to_path_buf(),
            reason,
        };

        let full_hash = tokio::task::spawn_blocking({
            let source = source.to_path_buf();
            move || utils::compute_file_hash(&source)
        })
        .await
        .map_err(|e| failed(e.to_string()))?
        .map_err(|e| failed(e.to_string()))?;
        let hash = full_hash[..PREVIEW_HASH_LEN].to_string();
        let preview = self.preview_path(source, &hash);
        let existing = self.thumbnails.existing_thumbnail(source).await;

        let (width, height) = if existing.is_none() && preview.is_file() {
            debug!(path = %source.display(), preview = %preview.display(), "Reusing cached preview");
            tokio::task::spawn_blocking({
                let preview = preview.clone();
                move || preview_dimensions(&preview)
            })
            .await
            .map_err(|e| failed(e.to_string()))?
            .map_err(|e| failed(format!("{:#}", e)))?
        } else {
            let staging = self.staging_dir(&hash);
            let staged = self.stage(source, existing.as_deref(), &staging, &preview).await;
            if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
                debug!(dir = %staging.display(), error = %e, "Failed to remove staging directory");
            }
            staged.map_err(|e| failed(format!("{:#}", e)))?
        };

        Ok(PreviewEntry {
            source: source.to_path_buf(),
            hash,
            preview,
            width,
            height,
        })
    }

    /// Private directory for one generation; same-stem sources never share it
    fn staging_dir(&self, hash: &str) -> PathBuf {
        let seq = self.staging_seq.fetch_add(1, Ordering::Relaxed);
        self.preview_dir
            .join(PREVIEW_STAGING_DIR)
            .join(format!("{}-{}", hash, seq))
    }

    /// Render or copy into `staging`, normalize there, then move onto `preview`
    async fn stage(
        &self,
        source: &Path,
        existing: Option<&Path>,
        staging: &Path,
        preview: &Path,
    ) -> anyhow::Result<(u32, u32)> {
        tokio::fs::create_dir_all(staging)
            .await
            .with_context(|| format!("Failed to create staging directory: {}", staging.display()))?;
        let staged = host_output_path(source, staging);

        match existing {
            Some(existing) => {
                // The host's cached file must stay intact, normalization is destructive
                debug!(path = %source.display(), existing = %existing.display(), "Copying existing preview");
                tokio::fs::copy(existing, &staged)
                    .await
                    .with_context(|| format!("Failed to copy {}", existing.display()))?;
            }
            None => {
                self.thumbnails.generate_thumbnail(source, staging).await?;
                if !staged.is_file() {
                    anyhow::bail!("thumbnail host produced no preview");
                }
                debug!(path = %source.display(), preview = %preview.display(), "Generated preview");
            }
        }

        let max_dimension = self.max_dimension;
        let size = tokio::task::spawn_blocking({
            let staged = staged.clone();
            move || normalize_preview(&staged, max_dimension)
        })
        .await??;

        tokio::fs::rename(&staged, preview)
            .await
            .with_context(|| format!("Failed to move preview to {}", preview.display()))?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingProgress, StubThumbnails};
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn write_assets(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("asset{}.png", i));
                std::fs::write(&path, format!("content {}", i)).unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn test_prepare_produces_entry_per_renderable_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut sources = write_assets(temp_dir.path(), 5);
        let mesh = temp_dir.path().join("mesh.fbx");
        std::fs::write(&mesh, b"mesh").unwrap();
        sources.push(mesh);

        let thumbnails = StubThumbnails::default();
        let manager = PreviewCacheManager::new(&thumbnails, temp_dir.path().join("previews"), 2, 128);
        let progress = RecordingProgress::new();

        let outcome = manager.prepare(&sources, &progress).await.unwrap();
        let PreviewOutcome::Ready(previews) = outcome else {
            panic!("expected previews");
        };

        assert_eq!(previews.len(), 5);
        assert!(previews.iter().all(|p| p.preview.is_file() && p.hash.len() == 8));
        assert!(previews.iter().all(|p| (p.width, p.height) == (32, 16)));

        // skipped files still count towards progress
        let reports = progress.reports("Generating previews");
        assert_eq!(reports.len(), 6);
        assert_eq!(reports.last().copied(), Some(1.0));
        assert_eq!(progress.finished(), vec!["Generating previews".to_string()]);
    }

    #[tokio::test]
    async fn test_preview_path_is_content_addressed() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("hero.png");
        std::fs::write(&source, b"pixels").unwrap();
        let thumbnails = StubThumbnails::default();
        let progress = RecordingProgress::new();

        let first_run = PreviewCacheManager::new(&thumbnails, temp_dir.path().join("previews"), 4, 128);
        let PreviewOutcome::Ready(first) = first_run.prepare(&[source.clone()], &progress).await.unwrap() else {
            panic!("expected previews");
        };
        let second_run = PreviewCacheManager::new(&thumbnails, temp_dir.path().join("previews"), 4, 128);
        let PreviewOutcome::Ready(second) = second_run.prepare(&[source.clone()], &progress).await.unwrap() else {
            panic!("expected previews");
        };
        assert_eq!(first[0].preview, second[0].preview);
        // second run reused the cached preview
        assert_eq!(thumbnails.generated.load(Ordering::SeqCst), 1);

        std::fs::write(&source, b"pixelz").unwrap();
        let PreviewOutcome::Ready(changed) = second_run.prepare(&[source], &progress).await.unwrap() else {
            panic!("expected previews");
        };
        assert_ne!(changed[0].preview, first[0].preview);
        assert!(changed[0].preview.to_string_lossy().ends_with("_pt.png"));
    }

    #[tokio::test]
    async fn test_existing_thumbnail_is_copied_not_mutated() {
        let temp_dir = TempDir::new().unwrap();
        let host_cache = temp_dir.path().join("host");
        std::fs::create_dir_all(&host_cache).unwrap();
        let existing = host_cache.join("statue_pt.png");
        RgbaImage::from_pixel(400, 200, Rgba([1, 2, 3, 255])).save(&existing).unwrap();
        let before = std::fs::read(&existing).unwrap();

        let source = temp_dir.path().join("statue.blend");
        std::fs::write(&source, b"blend").unwrap();

        let thumbnails = StubThumbnails {
            existing_dir: Some(host_cache),
            ..StubThumbnails::default()
        };
        let manager = PreviewCacheManager::new(&thumbnails, temp_dir.path().join("previews"), 4, 128);
        let PreviewOutcome::Ready(previews) = manager.prepare(&[source], &RecordingProgress::new()).await.unwrap() else {
            panic!("expected previews");
        };

        assert_eq!((previews[0].width, previews[0].height), (128, 64));
        assert_eq!(std::fs::read(&existing).unwrap(), before);
        assert_eq!(thumbnails.generated.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_stops_preview_generation() {
        let temp_dir = TempDir::new().unwrap();
        let sources = write_assets(temp_dir.path(), 10);
        let thumbnails = StubThumbnails::default();
        let manager = PreviewCacheManager::new(&thumbnails, temp_dir.path().join("previews"), 1, 128);
        let progress = RecordingProgress::cancel_after_reports(4);

        let outcome = manager.prepare(&sources, &progress).await.unwrap();

        assert_eq!(outcome, PreviewOutcome::Cancelled { completed: 4 });
        assert_eq!(thumbnails.generated.load(Ordering::SeqCst), 4);
        assert_eq!(progress.finished(), vec!["Generating previews".to_string()]);
    }

    /// Paints the first byte of the source into the red channel
    struct ByteThumbnails;

    #[async_trait::async_trait]
    impl ThumbnailProvider for ByteThumbnails {
        async fn existing_thumbnail(&self, _source: &Path) -> Option<PathBuf> {
            None
        }

        async fn generate_thumbnail(&self, source: &Path, output_dir: &Path) -> anyhow::Result<()> {
            let red = std::fs::read(source)?[0];
            RgbaImage::from_pixel(8, 8, Rgba([red, 0, 0, 255])).save(host_output_path(source, output_dir))?;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(())
        }
    }

    fn red_of(preview: &Path) -> u8 {
        image::open(preview).unwrap().to_rgba8().get_pixel(0, 0).0[0]
    }

    #[tokio::test]
    async fn test_same_stem_sources_keep_their_own_previews() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a").join("rock.png");
        let second = temp_dir.path().join("b").join("rock.png");
        for (path, byte) in [(&first, 10u8), (&second, 200u8)] {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, [byte, 1, 2, 3]).unwrap();
        }

        let manager = PreviewCacheManager::new(&ByteThumbnails, temp_dir.path().join("previews"), 10, 128);
        let PreviewOutcome::Ready(previews) = manager
            .prepare(&[first.clone(), second.clone()], &RecordingProgress::new())
            .await
            .unwrap()
        else {
            panic!("expected previews");
        };

        assert_eq!(previews.len(), 2);
        for entry in &previews {
            let expected = if entry.source == first { 10 } else { 200 };
            assert_eq!(red_of(&entry.preview), expected);
        }
        assert_ne!(previews[0].preview, previews[1].preview);
        assert!(!temp_dir.path().join("previews").join("rock_pt.png").exists());
    }

    #[tokio::test]
    async fn test_identical_sources_share_one_preview() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a").join("rock.png");
        let second = temp_dir.path().join("b").join("rock.png");
        for path in [&first, &second] {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, [42u8, 7, 7]).unwrap();
        }

        let manager = PreviewCacheManager::new(&ByteThumbnails, temp_dir.path().join("previews"), 10, 128);
        let PreviewOutcome::Ready(previews) = manager
            .prepare(&[first, second], &RecordingProgress::new())
            .await
            .unwrap()
        else {
            panic!("expected previews");
        };

        assert_eq!(previews.len(), 2);
        assert_eq!(previews[0].preview, previews[1].preview);
        assert_eq!(red_of(&previews[0].preview), 42);
    }

    #[test]
    fn test_default_preview_dir_convention() {
        let dir = PreviewCacheManager::default_preview_dir();
        assert!(dir.ends_with(Path::new("anchorpoint/ai_tagger/previews")));
    }
}
