pub mod json;
pub mod r#trait;

pub use json::JsonAttributeStore;
pub use r#trait::AttributeStore;
