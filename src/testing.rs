use crate::error::TaggerError;
use crate::estimate::TokenCounter;
use crate::llm::TaggingBackend;
use crate::models::{Batch, TagCategory, TaggingResult};
use crate::progress::{Progress, ProgressSink};
use crate::thumbnail::{host_output_path, ThumbnailProvider};
use image::{Rgba, RgbaImage};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ProgressLog {
    reports: Mutex<Vec<(String, f64)>>,
    finished: Mutex<Vec<String>>,
    cancel_after_reports: Option<usize>,
}

/// Progress sink that records every report and can cancel after N reports
#[derive(Clone, Default)]
pub struct RecordingProgress {
    log: Arc<ProgressLog>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_after_reports(count: usize) -> Self {
        Self {
            log: Arc::new(ProgressLog {
                cancel_after_reports: Some(count),
                ..ProgressLog::default()
            }),
        }
    }

    pub fn reports(&self, title: &str) -> Vec<f64> {
        self.log
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == title)
            .map(|(_, f)| *f)
            .collect()
    }

    pub fn finished(&self) -> Vec<String> {
        self.log.finished.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn start(&self, title: &str) -> Box<dyn Progress> {
        Box::new(RecordingBar {
            title: title.to_string(),
            log: self.log.clone(),
        })
    }

    fn is_cancelled(&self) -> bool {
        match self.log.cancel_after_reports {
            Some(limit) => self.log.reports.lock().unwrap().len() >= limit,
            None => false,
        }
    }
}

struct RecordingBar {
    title: String,
    log: Arc<ProgressLog>,
}

impl Progress for RecordingBar {
    fn report(&self, fraction: f64) {
        self.log.reports.lock().unwrap().push((self.title.clone(), fraction));
    }

    fn finish(&self) {
        self.log.finished.lock().unwrap().push(self.title.clone());
    }
}

/// Thumbnail host that renders a flat 32x16 PNG for `.png` sources and nothing otherwise
#[derive(Default)]
pub struct StubThumbnails {
    pub existing_dir: Option<PathBuf>,
    pub generated: AtomicUsize,
}

#[async_trait::async_trait]
impl ThumbnailProvider for StubThumbnails {
    async fn existing_thumbnail(&self, source: &Path) -> Option<PathBuf> {
        let candidate = host_output_path(source, self.existing_dir.as_ref()?);
        candidate.is_file().then_some(candidate)
    }

    async fn generate_thumbnail(&self, source: &Path, output_dir: &Path) -> anyhow::Result<()> {
        self.generated.fetch_add(1, Ordering::SeqCst);
        if source.extension().and_then(|e| e.to_str()) != Some("png") {
            return Ok(());
        }
        RgbaImage::from_pixel(32, 16, Rgba([120, 80, 40, 255]))
            .save(host_output_path(source, output_dir))?;
        Ok(())
    }
}

/// Tagging backend that replays scripted answers, then echoes full results
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<Vec<TaggingResult>, TaggerError>>>,
    answers: Mutex<VecDeque<Result<String, TaggerError>>>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: Result<Vec<TaggingResult>, TaggerError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_answer(&self, answer: Result<String, TaggerError>) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Types and genres given as synonyms, objects named after the file
    pub fn echo_result(name: &str) -> TaggingResult {
        TaggingResult {
            types: Some(vec!["Textures".to_string(), "Texture".to_string()]),
            genres: Some(vec!["Pixel".to_string()]),
            objects: Some(vec![name.to_string()]),
        }
    }
}

#[async_trait::async_trait]
impl TaggingBackend for ScriptedBackend {
    async fn tag_images(
        &self,
        _prompt: &str,
        batch: &Batch,
        _categories: &[TagCategory],
    ) -> Result<Vec<TaggingResult>, TaggerError> {
        let names = batch.source_names();
        self.calls.lock().unwrap().push(names.clone());
        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        Ok(names.iter().map(|name| Self::echo_result(name)).collect())
    }

    async fn complete(&self, _system: &str, _prompt: &str, _max_tokens: u32) -> Result<String, TaggerError> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("All;Texture;Pixel".to_string()))
    }
}

/// Counts whitespace-separated words
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
