use crate::attributes::AttributeStore;
use crate::config::{Config, PricingConfig};
use crate::error::TaggerError;
use crate::estimate::{estimate, CostEstimate, TokenCounter};
use crate::executor::{BatchTaggingExecutor, ExecutionReport};
use crate::filter::{filter_ignored, IgnoredExtensions};
use crate::llm::schema::build_file_prompt;
use crate::llm::TaggingBackend;
use crate::preview::{PreviewCacheManager, PreviewOutcome};
use crate::progress::ProgressSink;
use crate::thumbnail::ThumbnailProvider;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Estimating,
    AwaitingConfirmation,
    Cancelled,
    Executing,
    Completed,
}

/// Answer of the confirmation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed { skip_existing: bool },
    Cancel,
}

/// Shows the estimate to the user and asks whether to spend it
pub trait Confirmation {
    fn confirm(&self, estimate: &CostEstimate) -> anyhow::Result<Decision>;
}

/// How a run ended; a cancelled run still reports what was already tagged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Cancelled(ExecutionReport),
    Completed(ExecutionReport),
}

/// External collaborators a run talks to
pub struct Collaborators<'a> {
    pub thumbnails: &'a dyn ThumbnailProvider,
    pub store: &'a dyn AttributeStore,
    pub backend: &'a dyn TaggingBackend,
    pub tokens: &'a dyn TokenCounter,
    pub progress: &'a dyn ProgressSink,
    pub confirmation: &'a dyn Confirmation,
}

/// Knobs of a run, usually taken from [`Config`]
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub categories: Vec<crate::models::TagCategory>,
    pub prompt: String,
    pub batch_size: usize,
    pub preview_window: usize,
    pub max_preview_dimension: u32,
    pub preview_dir: PathBuf,
    pub pricing: PricingConfig,
    pub ignored: IgnoredExtensions,
}

impl RunSettings {
    /// Fails when no file category is enabled
    pub fn from_config(config: &Config) -> Result<Self, TaggerError> {
        let categories = config.file_categories()?;
        let prompt = build_file_prompt(&categories, config.files.objects_min, config.files.objects_max);
        Ok(Self {
            categories,
            prompt,
            batch_size: config.files.images_per_request,
            preview_window: config.files.preview_window,
            max_preview_dimension: config.files.max_preview_dimension,
            preview_dir: PreviewCacheManager::default_preview_dir(),
            pricing: config.pricing.clone(),
            ignored: IgnoredExtensions::default(),
        })
    }
}

/// State of a single tagging run, owned by whoever drives it
pub struct TaggingRun<'a> {
    env: Collaborators<'a>,
    settings: RunSettings,
    state: RunState,
}

impl<'a> TaggingRun<'a> {
    pub fn new(env: Collaborators<'a>, settings: RunSettings) -> Self {
        Self {
            env,
            settings,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "Run state");
        self.state = next;
    }

    /// Drive the run over an expanded selection of files
    pub async fn run(&mut self, selection: Vec<PathBuf>) -> Result<RunOutcome, TaggerError> {
        self.transition(RunState::Estimating);

        let accepted = filter_ignored(selection, &self.settings.ignored);
        if accepted.is_empty() {
            return Err(TaggerError::NoSupportedFiles);
        }

        let cache = PreviewCacheManager::new(
            self.env.thumbnails,
            self.settings.preview_dir.clone(),
            self.settings.preview_window,
            self.settings.max_preview_dimension,
        );
        let previews = match cache.prepare(&accepted, self.env.progress).await? {
            PreviewOutcome::Ready(previews) => previews,
            PreviewOutcome::Cancelled { .. } => {
                self.transition(RunState::Cancelled);
                return Ok(RunOutcome::Cancelled(ExecutionReport::default()));
            }
        };
        if previews.is_empty() {
            warn!(files = accepted.len(), "No previews could be generated");
            self.transition(RunState::Completed);
            return Ok(RunOutcome::Completed(ExecutionReport::default()));
        }

        let plan = estimate(
            previews,
            &self.settings.prompt,
            self.settings.batch_size,
            &self.settings.pricing,
            self.env.tokens,
        );
        info!(
            files = plan.estimate.file_count,
            input_tokens = plan.estimate.input_tokens,
            price = plan.estimate.total_price,
            "Estimated tagging cost"
        );

        self.transition(RunState::AwaitingConfirmation);
        let skip_existing = match self.env.confirmation.confirm(&plan.estimate)? {
            Decision::Proceed { skip_existing } => skip_existing,
            Decision::Cancel => {
                self.transition(RunState::Cancelled);
                return Ok(RunOutcome::Cancelled(ExecutionReport::default()));
            }
        };

        self.transition(RunState::Executing);
        let executor = BatchTaggingExecutor::new(
            self.env.backend,
            self.env.store,
            self.settings.categories.clone(),
            self.settings.prompt.clone(),
            self.settings.batch_size,
        );
        let batches = if skip_existing {
            executor.skip_existing(plan.batches).await?
        } else {
            plan.batches
        };

        let report = executor.execute(&batches, self.env.progress).await?;
        if report.cancelled {
            self.transition(RunState::Cancelled);
            return Ok(RunOutcome::Cancelled(report));
        }

        self.transition(RunState::Completed);
        Ok(RunOutcome::Completed(report))
    }
}
