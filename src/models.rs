use crate::constants::{ENGINE_VARIANTS, GENRE_VARIANTS, OBJECT_VARIANTS, TYPE_VARIANTS};
use crate::labels::VariantTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tag categories written as host attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TagCategory {
    Engines,
    Types,
    Genres,
    Objects,
}

impl TagCategory {
    /// Categories a file can be tagged with, in request order
    pub const FILE: [TagCategory; 3] = [TagCategory::Types, TagCategory::Genres, TagCategory::Objects];

    /// Categories a folder can be tagged with, in answer order
    pub const FOLDER: [TagCategory; 3] = [TagCategory::Engines, TagCategory::Types, TagCategory::Genres];

    /// Name of the host attribute holding this category
    pub fn attribute_name(self) -> &'static str {
        match self {
            TagCategory::Engines => "AI-Engines",
            TagCategory::Types => "AI-Types",
            TagCategory::Genres => "AI-Genres",
            TagCategory::Objects => "AI-Objects",
        }
    }

    /// Field name in the tagging response schema
    pub fn schema_key(self) -> &'static str {
        match self {
            TagCategory::Engines => "engines",
            TagCategory::Types => "types",
            TagCategory::Genres => "genres",
            TagCategory::Objects => "objects",
        }
    }

    pub fn variants(self) -> VariantTable {
        match self {
            TagCategory::Engines => VariantTable::from_static(ENGINE_VARIANTS),
            TagCategory::Types => VariantTable::from_static(TYPE_VARIANTS),
            TagCategory::Genres => VariantTable::from_static(GENRE_VARIANTS),
            TagCategory::Objects => VariantTable::from_static(OBJECT_VARIANTS),
        }
    }
}

/// One prepared preview image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewEntry {
    /// Asset the preview was rendered from
    pub source: PathBuf,
    /// Leading hex characters of the Blake3 hash of the source bytes
    pub hash: String,
    /// Cropped and size-capped preview in the working directory
    pub preview: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl PreviewEntry {
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// File name of the source asset, as shown to the model
    pub fn source_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Previews sent together in one tagging request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub previews: Vec<PreviewEntry>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.previews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previews.is_empty()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.previews.iter().map(PreviewEntry::source_name).collect()
    }
}

/// Split previews into consecutive batches of at most `size` entries, keeping order
pub fn slice_batches(previews: Vec<PreviewEntry>, size: usize) -> Vec<Batch> {
    let size = size.max(1);
    previews
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            previews: chunk.to_vec(),
        })
        .collect()
}

/// Parsed tags for one image. A category is `None` when it was not requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggingResult {
    pub types: Option<Vec<String>>,
    pub genres: Option<Vec<String>>,
    pub objects: Option<Vec<String>>,
}

impl TaggingResult {
    pub fn tags(&self, category: TagCategory) -> Option<&[String]> {
        match category {
            TagCategory::Types => self.types.as_deref(),
            TagCategory::Genres => self.genres.as_deref(),
            TagCategory::Objects => self.objects.as_deref(),
            TagCategory::Engines => None,
        }
    }
}

/// Kind of a host attribute. Only tag lists are produced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    MultipleChoiceTag,
}

/// A named tag value with its display color
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeTag {
    pub name: String,
    pub color: String,
}

impl AttributeTag {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// A host-persisted tag category and its vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    #[serde(default)]
    pub tags: Vec<AttributeTag>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            tags: Vec::new(),
        }
    }

    pub fn find_tag(&self, name: &str) -> Option<&AttributeTag> {
        self.tags.iter().find(|tag| tag.name == name)
    }
}

/// Key under which a path's attribute values are stored
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
