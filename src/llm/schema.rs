use crate::constants::FILE_SYSTEM_PROMPT;
use crate::error::TaggerError;
use crate::models::{TagCategory, TaggingResult};
use serde::Deserialize;
use serde_json::{json, Map, Value};

fn describe(category: TagCategory) -> &'static str {
    match category {
        TagCategory::Engines => "required game engines",
        TagCategory::Types => "content types (texture, sprite, model, vfx, sfx, etc.)",
        TagCategory::Genres => "detailed genres",
        TagCategory::Objects => "objects in the image",
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

/// System prompt for image tagging that names only the enabled categories
pub fn build_file_prompt(categories: &[TagCategory], objects_min: u32, objects_max: u32) -> String {
    let described: Vec<&str> = categories.iter().map(|c| describe(*c)).collect();
    let mut prompt = format!("{}: {}. ", FILE_SYSTEM_PROMPT.trim_end_matches('.'), described.join(", "));

    prompt.push_str(&format!("Fill all {} categories for each image. ", categories.len()));
    if categories.contains(&TagCategory::Objects) {
        prompt.push_str(&format!(
            "Write between {} and {} objects per image. ",
            objects_min, objects_max
        ));
    }

    let examples: Vec<&str> = categories.iter().map(|c| example(*c)).collect();
    prompt.push_str("Example: \n");
    prompt.push_str(&examples.join(";"));
    prompt
}

/// `response_format` value forcing a `{"tags": [...]}` answer with the enabled categories
pub fn response_format(categories: &[TagCategory]) -> Value {
    let mut properties = Map::new();
    for category in categories {
        properties.insert(
            category.schema_key().to_string(),
            json!({ "type": "array", "items": { "type": "string" } }),
        );
    }
    let required: Vec<&str> = categories.iter().map(|c| c.schema_key()).collect();

    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "TaggingSchema",
            "strict": true,
            "schema": {
                "type": "object",
                "required": ["tags"],
                "additionalProperties": false,
                "properties": {
                    "tags": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": required,
                            "additionalProperties": false,
                            "properties": properties,
                        }
                    }
                }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct TaggingPayload {
    tags: Vec<RawTags>,
}

#[derive(Debug, Deserialize)]
struct RawTags {
    #[serde(default)]
    types: Option<Vec<String>>,
    #[serde(default)]
    genres: Option<Vec<String>>,
    #[serde(default)]
    objects: Option<Vec<String>>,
}

/// Parse the message content of a tagging answer.
///
/// Every entry must carry each enabled category; categories that were not asked
/// for are dropped even if the model sent them.
pub fn parse_tagging_content(content: &str, categories: &[TagCategory]) -> Result<Vec<TaggingResult>, TaggerError> {
    let payload: TaggingPayload = serde_json::from_str(content.trim())
        .map_err(|e| TaggerError::ResponseShape(format!("tags payload is not valid JSON: {}", e)))?;

    payload
        .tags
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let mut result = TaggingResult {
                types: raw.types,
                genres: raw.genres,
                objects: raw.objects,
            };
            for category in TagCategory::FILE {
                if categories.contains(&category) {
                    if result.tags(category).is_none() {
                        return Err(TaggerError::ResponseShape(format!(
                            "entry {} has no \"{}\"",
                            i,
                            category.schema_key()
                        )));
                    }
                } else {
                    clear(&mut result, category);
                }
            }
            Ok(result)
        })
        .collect()
}

fn clear(result: &mut TaggingResult, category: TagCategory) {
    match category {
        TagCategory::Types => result.types = None,
        TagCategory::Genres => result.genres = None,
        TagCategory::Objects => result.objects = None,
        TagCategory::Engines => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_enabled_categories_only() {
        let prompt = build_file_prompt(&[TagCategory::Types, TagCategory::Objects], 2, 4);
        assert!(prompt.starts_with("You are a file tagging AI."));
        assert!(prompt.contains("content types"));
        assert!(!prompt.contains("genres"));
        assert!(prompt.contains("Fill all 2 categories"));
        assert!(prompt.contains("between 2 and 4 objects"));
        assert!(prompt.ends_with("3D Model,Texture,Sprite,Animated;Shovel,Potion,Armor"));
    }

    #[test]
    fn test_prompt_without_objects_has_no_object_range() {
        let prompt = build_file_prompt(&[TagCategory::Genres], 1, 5);
        assert!(!prompt.contains("objects"));
    }

    #[test]
    fn test_response_format_requires_enabled_categories() {
        let format = response_format(&[TagCategory::Types, TagCategory::Genres]);
        let schema = &format["json_schema"];
        assert_eq!(schema["name"], "TaggingSchema");
        assert_eq!(schema["strict"], true);

        let item = &schema["schema"]["properties"]["tags"]["items"];
        assert_eq!(item["required"], json!(["types", "genres"]));
        assert!(item["properties"].get("objects").is_none());
        assert_eq!(item["properties"]["types"]["items"]["type"], "string");
    }

    #[test]
    fn test_parse_tagging_content() {
        let content = r#"{"tags": [
            {"types": ["Texture"], "genres": ["Fantasy"], "objects": ["Sword"]},
            {"types": ["Sprite"], "genres": [], "objects": ["Potion", "Flask"]}
        ]}"#;
        let results = parse_tagging_content(content, &TagCategory::FILE).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].objects.as_deref(), Some(&["Potion".to_string(), "Flask".to_string()][..]));
        assert_eq!(results[1].genres.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_parse_drops_categories_not_requested() {
        let content = r#"{"tags": [{"types": ["Texture"], "genres": ["Fantasy"]}]}"#;
        let results = parse_tagging_content(content, &[TagCategory::Types]).unwrap();
        assert_eq!(results[0].types.as_deref(), Some(&["Texture".to_string()][..]));
        assert_eq!(results[0].genres, None);
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let missing = r#"{"tags": [{"types": ["Texture"]}]}"#;
        assert!(matches!(
            parse_tagging_content(missing, &[TagCategory::Types, TagCategory::Genres]),
            Err(TaggerError::ResponseShape(_))
        ));
        assert!(matches!(
            parse_tagging_content("Sorry, I cannot do that", &TagCategory::FILE),
            Err(TaggerError::ResponseShape(_))
        ));
    }
}
