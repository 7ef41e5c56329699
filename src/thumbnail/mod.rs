pub mod local;
pub mod r#trait;

pub use local::ImageThumbnailProvider;
pub use r#trait::ThumbnailProvider;

use crate::constants::PREVIEW_SUFFIX;
use crate::utils;
use std::path::{Path, PathBuf};

/// Where the host writes its rendered preview for `source`
pub fn host_output_path(source: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}{}", utils::asset_stem(source), PREVIEW_SUFFIX))
}
