pub mod cache;
pub mod image;
pub mod window;

pub use cache::{PreviewCacheManager, PreviewOutcome};
pub use window::{BoundedWindow, WindowOutcome};
