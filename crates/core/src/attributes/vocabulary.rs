//! Word lists driving the heuristic trait parsers.
//!
//! All entries are lowercase. Matching is done on whole tokens produced by
//! the codec's tokenizer, so hyphenated entries must be listed hyphenated.

/// Base colors shared by hair and eyes.
pub const COLORS: &[&str] = &[
    "blonde", "blond", "brown", "black", "red", "auburn", "ginger", "chestnut", "copper",
    "silver", "grey", "gray", "white", "blue", "green", "hazel", "amber", "violet", "purple",
    "pink", "golden", "raven", "ebony", "teal", "emerald", "sapphire", "crimson", "scarlet",
    "brunette", "turquoise", "grey-blue", "blue-green",
];

/// Modifiers that combine with a following color ("dark brown"). A shade
/// with no color after it stands in for the color itself.
pub const SHADES: &[&str] = &[
    "dark", "light", "pale", "bright", "deep", "dirty", "ash", "strawberry", "platinum",
    "honey", "jet", "icy", "steel",
];

pub const HAIR_STYLES: &[&str] = &[
    "curly", "straight", "wavy", "braided", "braids", "braid", "ponytail", "bun", "spiky",
    "messy", "sleek", "tousled", "tangled", "shaved", "dreadlocks", "locs", "coiled", "frizzy",
    "slicked", "loose", "pinned", "mohawk", "plaited", "windswept", "undercut",
];

pub const HAIR_LENGTHS: &[&str] = &[
    "long", "short", "shoulder-length", "waist-length", "chin-length", "cropped", "buzzed",
];

pub const SKIN_TONES: &[&str] = &[
    "pale", "fair", "tan", "tanned", "olive", "dark", "bronze", "bronzed", "freckled",
    "porcelain", "ebony", "golden", "sun-kissed", "weathered", "ashen", "flushed", "rosy",
    "brown", "light", "ivory", "dusky", "sallow",
];

pub const BUILDS: &[&str] = &[
    "athletic", "slender", "slim", "muscular", "stocky", "lean", "petite", "curvy",
    "broad-shouldered", "lanky", "wiry", "heavyset", "willowy", "toned", "burly", "thin",
];

pub const HEIGHTS: &[&str] = &["tall", "towering", "average-height", "diminutive"];

/// Nouns that anchor appearance descriptors to a feature.
pub const HAIR_NOUNS: &[&str] = &["hair", "locks", "mane", "curls"];
pub const EYE_NOUNS: &[&str] = &["eyes", "eye", "gaze", "irises"];
pub const SKIN_NOUNS: &[&str] = &["skin", "complexion"];
pub const BUILD_NOUNS: &[&str] = &["build", "frame", "physique", "figure"];
pub const HEIGHT_NOUNS: &[&str] = &["height", "stature"];

pub const PERSONALITY_TRAITS: &[&str] = &[
    "brave", "shy", "kind", "curious", "confident", "cheerful", "stubborn", "playful",
    "sarcastic", "loyal", "gentle", "cautious", "bold", "reserved", "outgoing", "witty",
    "honest", "ambitious", "patient", "impulsive", "arrogant", "humble", "compassionate",
    "mischievous", "serious", "introverted", "extroverted", "optimistic", "pessimistic",
    "protective", "rebellious", "stoic", "flirtatious", "charming", "determined", "fierce",
    "quiet", "talkative", "clever", "wise", "naive", "grumpy", "warm", "aloof", "friendly",
    "generous", "jealous", "proud", "romantic", "adventurous", "reckless", "shrewd",
];

pub const MOODS: &[&str] = &[
    "happy", "sad", "angry", "nervous", "excited", "anxious", "calm", "relaxed", "tired",
    "exhausted", "content", "afraid", "scared", "frightened", "joyful", "melancholy",
    "furious", "irritated", "annoyed", "elated", "lonely", "hopeful", "bored", "confused",
    "embarrassed", "ashamed", "relieved", "grateful", "giddy", "tense", "upset", "frustrated",
    "overjoyed", "miserable", "restless", "peaceful",
];

pub const SCENT_NOTES: &[&str] = &[
    "vanilla", "lavender", "rose", "roses", "sandalwood", "musk", "citrus", "lemon", "orange",
    "cinnamon", "smoke", "woodsmoke", "pine", "cedar", "rain", "leather", "jasmine", "honey",
    "mint", "coffee", "tobacco", "salt", "ocean", "earth", "moss", "sweat", "chocolate",
    "peppermint", "amber", "bergamot", "patchouli", "lilac", "apple", "whiskey", "wine",
    "ink", "paper", "soap", "oak", "sage", "clove", "ozone", "iron", "blood",
];

pub const SCENT_INTENSITIES: &[&str] = &[
    "faint", "subtle", "light", "strong", "heavy", "overpowering", "lingering", "intoxicating",
    "sharp", "soft", "pungent",
];

/// Filler words ignored when collecting residual (unrecognized) descriptors.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "with", "my", "her", "his", "their", "your", "its",
    "is", "are", "was", "were", "now", "has", "have", "had", "very", "quite", "rather",
    "somewhat", "looks", "looked", "look", "be", "been", "in", "to", "that", "this", "she",
    "he", "they", "i", "it", "so",
];

/// Field-name keywords used by `get_field_type`, checked in declaration order.
pub const APPEARANCE_KEYWORDS: &[&str] = &[
    "hair", "eye", "skin", "face", "appearance", "complexion", "build", "height", "cloth",
    "outfit", "wear",
];
pub const PERSONALITY_KEYWORDS: &[&str] = &[
    "trait", "behavior", "behaviour", "mood", "feel", "personality", "emotion", "temper",
    "attitude",
];
pub const SCENT_KEYWORDS: &[&str] = &["smell", "scent", "aroma", "fragrance", "perfume", "odor", "odour"];

pub fn contains(list: &[&str], word: &str) -> bool {
    list.contains(&word)
}
