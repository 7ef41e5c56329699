pub mod openai;
pub mod schema;
pub mod r#trait;

pub use openai::OpenAiClient;
pub use r#trait::TaggingBackend;
