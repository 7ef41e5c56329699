pub mod console;
pub mod r#trait;

pub use console::ConsoleProgress;
pub use r#trait::{Progress, ProgressSink};
