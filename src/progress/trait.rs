/// A single progress bar for one stage of a run
pub trait Progress: Send + Sync {
    /// Report completion as a fraction in `0.0..=1.0`
    fn report(&self, fraction: f64);

    fn finish(&self);
}

/// Host progress UI plus the cooperative cancellation flag
pub trait ProgressSink: Send + Sync {
    /// Start a new progress bar titled `title`
    fn start(&self, title: &str) -> Box<dyn Progress>;

    /// True once the user asked to stop the run
    fn is_cancelled(&self) -> bool;
}
