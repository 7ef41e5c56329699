/// Constants used throughout the tagger
/// Extension groups, synonym tables, attribute names and request defaults live here

/// Unity engine-generated files
pub const UNITY_EXTENSIONS: &[&str] = &[
    "meta",
    "unity",
    "prefab",
    "asset",
    "mat",
    "controller",
    "anim",
    "mask",
    "overridecontroller",
    "physicmaterial",
    "physicsmaterial2d",
    "rendertexture",
    "shader",
    "cubemap",
    "flare",
    "giparams",
    "lightingdata",
    "unitypackage",
];

/// Unreal engine-generated files
pub const UNREAL_EXTENSIONS: &[&str] = &[
    "umap",
    "uplugin",
    "uproject",
    "uexp",
    "upk",
    "udk",
    "uc",
    "u",
    "udata",
    "uclass",
    "ustruct",
    "ufunction",
    "uinterface",
    "uenum",
    "uproperty",
];

/// Godot engine-generated files
pub const GODOT_EXTENSIONS: &[&str] = &[
    "tscn", "tres", "import", "scn", "res", "gd", "gdc", "gdscript", "gdn",
];

/// Temporary and backup files
pub const TEMP_EXTENSIONS: &[&str] = &[
    "tmp", "temp", "bak", "backup", "old", "cache", "log", "lock", "swp",
];

/// Audio has no visual preview worth sending
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "ogg", "flac", "aiff", "aif", "wma", "m4a", "aac", "mid", "midi", "mod", "xm",
    "it", "s3m", "flp",
];

/// Plain text files
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Extension groups skipped by default when collecting files to tag
pub const IGNORED_EXTENSION_GROUPS: &[&[&str]] = &[
    UNITY_EXTENSIONS,
    UNREAL_EXTENSIONS,
    GODOT_EXTENSIONS,
    TEMP_EXTENSIONS,
    AUDIO_EXTENSIONS,
    TEXT_EXTENSIONS,
];

/// Synonym groups for engines. The first entry of each group is canonical.
pub const ENGINE_VARIANTS: &[&[&str]] = &[
    &["Unity", "Unity3D", "Unity Engine"],
    &["Unreal Engine", "UE4", "UE5", "Unreal", "UE"],
    &["Godot", "Godot Engine"],
];

/// Synonym groups for content types
pub const TYPE_VARIANTS: &[&[&str]] = &[
    &["3D Model", "3D Models", "Model", "Models"],
    &["Texture", "Textures"],
    &["Sprite", "Sprites"],
    &["Animated", "Animation", "Animations"],
    &[
        "VFX",
        "Visual Effects",
        "Visual Effect",
        "Effects",
        "Effect",
        "FX",
        "Visuals",
        "Visual",
        "Special Effects",
        "Special Effect",
    ],
    &["SFX", "Sound Effects", "Sound Effect", "Sound FX"],
    &["Soundtrack", "OST"],
    &["Voiceover", "VO", "Voice Over", "Voice"],
];

/// Synonym groups for genres
pub const GENRE_VARIANTS: &[&[&str]] = &[
    &["8-Bit", "8-bit", "8 bit", "8bit"],
    &["Pixel Art", "Pixel", "Pixelated", "Pixelation", "Pixelate", "Pixel Art Style"],
    &[
        "Lowpoly",
        "Low Poly",
        "Low-poly",
        "Low Polygons",
        "Low-Polygons",
        "Low Polygons Count",
        "Low-Polygons Count",
    ],
    &["RPG", "Role-Playing Game", "Role Playing Game", "Roleplay", "Roleplay Game"],
    &[
        "RTS",
        "Real-Time Strategy",
        "Real Time Strategy",
        "Realtime Strategy",
        "Realtime Strategy Game",
    ],
    &["FPS", "First-Person Shooter", "First Person Shooter", "First-Person", "First Person"],
    &["Sci-Fi", "Science Fiction", "Science-Fiction", "SciFi", "Sci-Fi Game", "Science Fiction Game"],
];

/// Objects are free-form; every answer passes through unchanged
pub const OBJECT_VARIANTS: &[&[&str]] = &[];

/// Display colors available for new attribute tags
pub const TAG_COLORS: &[&str] = &[
    "grey", "blue", "purple", "green", "turk", "orange", "yellow", "red",
];

/// Working preview directory, relative to the system temp dir
pub const PREVIEW_DIR: &[&str] = &["anchorpoint", "ai_tagger", "previews"];

/// Number of hex characters of the content hash kept in preview file names
pub const PREVIEW_HASH_LEN: usize = 8;

/// Suffix the thumbnail host appends to rendered previews
pub const PREVIEW_SUFFIX: &str = "_pt.png";

/// Directory under the preview dir where each generation renders before its final rename
pub const PREVIEW_STAGING_DIR: &str = ".staging";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const FILE_SYSTEM_PROMPT: &str = "You are a file tagging AI. When asked, write tags for each file in the order they were presented.";

pub const FOLDER_SYSTEM_PROMPT: &str = "You are a folder tagging AI.";

/// Max tokens requested for one folder answer
pub const FOLDER_MAX_TOKENS: u32 = 100;
