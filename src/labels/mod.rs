pub mod registry;
pub mod variants;

pub use registry::{tag_color, AttributeRegistry};
pub use variants::VariantTable;
