use crate::progress::{Progress, ProgressSink};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const BAR_LENGTH: u64 = 1000;

/// Terminal progress bars, cancelled through a shared flag (set on Ctrl-C)
#[derive(Clone)]
pub struct ConsoleProgress {
    bars: MultiProgress,
    cancelled: Arc<AtomicBool>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bars: MultiProgress::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ask the running stage to stop at its next continuation point
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn start(&self, title: &str) -> Box<dyn Progress> {
        let pb = self.bars.add(ProgressBar::new(BAR_LENGTH));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:24} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:>3}%")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(title.to_string());
        Box::new(ConsoleBar { pb })
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct ConsoleBar {
    pb: ProgressBar,
}

impl Progress for ConsoleBar {
    fn report(&self, fraction: f64) {
        let position = (fraction.clamp(0.0, 1.0) * BAR_LENGTH as f64).round() as u64;
        self.pb.set_position(position);
    }

    fn finish(&self) {
        self.pb.finish();
    }
}
