use crate::attributes::AttributeStore;
use crate::config::PricingConfig;
use crate::constants::{FOLDER_MAX_TOKENS, FOLDER_SYSTEM_PROMPT};
use crate::error::TaggerError;
use crate::estimate::TokenCounter;
use crate::executor::clean_tags;
use crate::labels::AttributeRegistry;
use crate::llm::TaggingBackend;
use crate::models::TagCategory;
use crate::progress::ProgressSink;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

fn describe(category: TagCategory) -> &'static str {
    match category {
        TagCategory::Engines => {
            "required game engines (if it has e.g. uasset or unitypackage) or 'All' if assets have common types"
        }
        TagCategory::Types => "content types (texture, sprite, model, vfx, sfx, etc.)",
        TagCategory::Genres => "detailed genres",
        TagCategory::Objects => "objects",
    }
}

fn example(category: TagCategory) -> &'static str {
    match category {
        TagCategory::Engines => "Unity,Unreal Engine",
        TagCategory::Types => "3D Model,Texture,Sprite,Animated",
        TagCategory::Genres => "Action,Adventure,RPG,Lowpoly,Metal,Steampunk",
        TagCategory::Objects => "Shovel,Potion,Armor",
    }
}

/// Instruction part of the folder prompt for the enabled categories
pub fn folder_instructions(categories: &[TagCategory]) -> String {
    let described: Vec<&str> = categories.iter().map(|c| describe(*c)).collect();
    let examples: Vec<&str> = categories.iter().map(|c| example(*c)).collect();
    format!(
        "Write tags for the folder: {}. Use commas within categories and semicolons between categories.\n\
         Do not include any prefixes or additional text in the response, only the tags.\n\
         Example: \n{}\n",
        described.join(", "),
        examples.join(";")
    )
}

/// One line per directory below `root`: `root/sub: a.png, b.png`.
/// The root itself is written as `root` so absolute paths never reach the model.
pub fn folder_listing(root: &Path) -> String {
    let mut directories: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());

        if entry.file_type().is_dir() {
            directories.entry(display_dir(relative)).or_default();
        } else if let Some(parent) = relative.parent() {
            directories
                .entry(display_dir(parent))
                .or_default()
                .push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    directories
        .into_iter()
        .map(|(dir, files)| format!("{}: {}", dir, files.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn display_dir(relative: &Path) -> String {
    relative
        .components()
        .fold("root".to_string(), |acc, part| {
            format!("{}/{}", acc, part.as_os_str().to_string_lossy())
        })
}

/// Prompt for one folder, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRequest {
    pub path: PathBuf,
    pub prompt: String,
    pub tokens: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderEstimate {
    pub folder_count: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_price: f64,
}

impl fmt::Display for FolderEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Folders: {}", self.folder_count)?;
        writeln!(f, "Input tokens: {}", self.input_tokens)?;
        writeln!(f, "Output tokens: ~{}", self.output_tokens)?;
        write!(f, "Estimated price: ${:.4}", self.total_price)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderPlan {
    pub requests: Vec<FolderRequest>,
    pub estimate: FolderEstimate,
}

/// Build prompts for every selected directory and price them. Non-directories are skipped.
pub fn plan_folders(
    folders: &[PathBuf],
    categories: &[TagCategory],
    tokens: &dyn TokenCounter,
    pricing: &PricingConfig,
    progress: &dyn ProgressSink,
) -> FolderPlan {
    let bar = progress.start("Counting tokens");
    let instructions = folder_instructions(categories);
    let mut requests = Vec::with_capacity(folders.len());

    for (i, folder) in folders.iter().enumerate() {
        if folder.is_dir() {
            let name = folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "root".to_string());
            let prompt = format!(
                "{}\nFolder name: {}\nFolder structure:\n{}",
                instructions,
                name,
                folder_listing(folder)
            );
            let count = tokens.count(&prompt);
            debug!(folder = %folder.display(), tokens = count, "Prepared folder prompt");
            requests.push(FolderRequest {
                path: folder.clone(),
                prompt,
                tokens: count,
            });
        } else {
            warn!(path = %folder.display(), "Not a directory, skipping");
        }
        bar.report((i + 1) as f64 / folders.len() as f64);
    }
    bar.finish();

    let input_tokens: usize = requests.iter().map(|r| r.tokens).sum();
    let output_tokens = pricing.output_tokens_per_folder * requests.len();
    let total_price =
        input_tokens as f64 * pricing.input_token_price + output_tokens as f64 * pricing.output_token_price;

    FolderPlan {
        estimate: FolderEstimate {
            folder_count: requests.len(),
            input_tokens,
            output_tokens,
            total_price,
        },
        requests,
    }
}

/// Split a `a,b;c;d,e` answer into one tag list per category
pub fn parse_folder_answer(answer: &str, categories: &[TagCategory]) -> Result<Vec<Vec<String>>, TaggerError> {
    let answer = answer.trim();
    let answer = answer.strip_suffix(';').unwrap_or(answer);
    let parts: Vec<&str> = answer.split(';').collect();

    if parts.len() != categories.len() {
        return Err(TaggerError::CategoryMismatch {
            received: parts.len(),
            expected: categories.len(),
        });
    }

    Ok(categories
        .iter()
        .zip(parts)
        .map(|(category, part)| {
            let raw: Vec<&str> = part.split(',').collect();
            category.variants().dedupe(&clean_tags(&raw))
        })
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderReport {
    pub tagged: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub cancelled: bool,
}

/// Sends one request per folder and writes the answer onto the folder path
pub struct FolderTagger<'a> {
    backend: &'a dyn TaggingBackend,
    registry: AttributeRegistry<'a>,
    categories: Vec<TagCategory>,
}

impl<'a> FolderTagger<'a> {
    pub fn new(backend: &'a dyn TaggingBackend, store: &'a dyn AttributeStore, categories: Vec<TagCategory>) -> Self {
        Self {
            backend,
            registry: AttributeRegistry::new(store),
            categories,
        }
    }

    /// A failing folder is reported and the remaining folders still run
    pub async fn tag_folders(&self, plan: &FolderPlan, progress: &dyn ProgressSink) -> Result<FolderReport, TaggerError> {
        let bar = progress.start("Requesting AI tags");
        let mut report = FolderReport::default();

        for (i, request) in plan.requests.iter().enumerate() {
            if progress.is_cancelled() {
                info!(completed = i, total = plan.requests.len(), "Folder tagging cancelled");
                report.cancelled = true;
                break;
            }

            match self.tag_folder(request).await {
                Ok(()) => report.tagged.push(request.path.clone()),
                Err(e @ (TaggerError::CategoryMismatch { .. } | TaggerError::Network(_) | TaggerError::ResponseShape(_))) => {
                    error!(folder = %request.path.display(), error = %e, "Could not tag folder");
                    report.failed.push((request.path.clone(), e.to_string()));
                }
                Err(e) => {
                    bar.finish();
                    return Err(e);
                }
            }
            bar.report((i + 1) as f64 / plan.requests.len() as f64);
        }

        bar.finish();
        Ok(report)
    }

    async fn tag_folder(&self, request: &FolderRequest) -> Result<(), TaggerError> {
        let answer = self
            .backend
            .complete(FOLDER_SYSTEM_PROMPT, &request.prompt, FOLDER_MAX_TOKENS)
            .await?;
        debug!(folder = %request.path.display(), answer = %answer, "Folder answer");

        let per_category = parse_folder_answer(&answer, &self.categories)?;
        for (category, names) in self.categories.iter().zip(per_category) {
            let mut attribute = self.registry.ensure_attribute(category.attribute_name()).await?;
            let tags = self.registry.resolve_tags(&mut attribute, &names).await?;
            self.registry
                .store()
                .set_attribute_value(&request.path, &attribute.name, &tags)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::JsonAttributeStore;
    use crate::testing::{RecordingProgress, ScriptedBackend, WordCounter};
    use tempfile::TempDir;

    fn project(dir: &Path) -> PathBuf {
        let root = dir.join("Dungeon Pack");
        std::fs::create_dir_all(root.join("Textures")).unwrap();
        std::fs::write(root.join("readme.txt"), b"").unwrap();
        std::fs::write(root.join("Textures").join("wall.png"), b"").unwrap();
        std::fs::write(root.join("Textures").join("floor.png"), b"").unwrap();
        root
    }

    #[test]
    fn test_listing_hides_absolute_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = project(temp_dir.path());

        let listing = folder_listing(&root);
        assert_eq!(listing, "root: readme.txt\nroot/Textures: floor.png, wall.png");
        assert!(!listing.contains(&*temp_dir.path().to_string_lossy()));
    }

    #[test]
    fn test_plan_prices_each_folder() {
        let temp_dir = TempDir::new().unwrap();
        let root = project(temp_dir.path());
        let pricing = PricingConfig::default();
        let progress = RecordingProgress::new();

        let plan = plan_folders(
            &[root.clone(), temp_dir.path().join("missing")],
            &TagCategory::FOLDER,
            &WordCounter,
            &pricing,
            &progress,
        );

        assert_eq!(plan.requests.len(), 1);
        assert!(plan.requests[0].prompt.contains("Folder name: Dungeon Pack"));
        assert!(plan.requests[0].prompt.ends_with("root/Textures: floor.png, wall.png"));
        assert_eq!(plan.estimate.output_tokens, 100);
        assert_eq!(plan.estimate.input_tokens, plan.requests[0].tokens);
        assert_eq!(progress.reports("Counting tokens"), vec![0.5, 1.0]);
    }

    #[test]
    fn test_parse_folder_answer() {
        let tags = parse_folder_answer(
            "Unity,UE5;Textures, Sprite;Lowpoly,Low Poly,RPG,",
            &TagCategory::FOLDER,
        )
        .unwrap();
        assert_eq!(
            tags,
            vec![
                vec!["Unity".to_string(), "Unreal Engine".to_string()],
                vec!["Texture".to_string(), "Sprite".to_string()],
                vec!["Lowpoly".to_string(), "RPG".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_folder_answer_category_mismatch() {
        let err = parse_folder_answer("Unity;Texture", &TagCategory::FOLDER).unwrap_err();
        assert!(matches!(err, TaggerError::CategoryMismatch { received: 2, expected: 3 }));
        assert_eq!(
            err.to_string(),
            "The number of categories (2) does not match the number of attributes (3)"
        );
    }

    #[tokio::test]
    async fn test_mismatch_skips_only_that_folder() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first");
        let second = temp_dir.path().join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();

        let backend = ScriptedBackend::new();
        backend.push_answer(Ok("Sorry, no tags".to_string()));
        backend.push_answer(Ok("All;Models;Sci-Fi".to_string()));
        let store = JsonAttributeStore::in_memory();
        let progress = RecordingProgress::new();

        let plan = plan_folders(
            &[first.clone(), second.clone()],
            &TagCategory::FOLDER,
            &WordCounter,
            &PricingConfig::default(),
            &progress,
        );
        let tagger = FolderTagger::new(&backend, &store, TagCategory::FOLDER.to_vec());
        let report = tagger.tag_folders(&plan, &progress).await.unwrap();

        assert_eq!(report.tagged, vec![second.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, first);

        let types = store.get_attribute_value(&second, "AI-Types").await.unwrap();
        assert_eq!(types.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["3D Model"]);
        let engines = store.get_attribute_value(&second, "AI-Engines").await.unwrap();
        assert_eq!(engines[0].name, "All");
        assert!(store.get_attribute_value(&first, "AI-Types").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_network_error_is_reported_per_folder() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("props");
        std::fs::create_dir_all(&folder).unwrap();

        let backend = ScriptedBackend::new();
        backend.push_answer(Err(TaggerError::Network("timeout".to_string())));
        let store = JsonAttributeStore::in_memory();
        let progress = RecordingProgress::new();
        let plan = plan_folders(&[folder], &TagCategory::FOLDER, &WordCounter, &PricingConfig::default(), &progress);

        let report = FolderTagger::new(&backend, &store, TagCategory::FOLDER.to_vec())
            .tag_folders(&plan, &progress)
            .await
            .unwrap();
        assert!(report.tagged.is_empty());
        assert_eq!(report.failed.len(), 1);
    }
}
