//! Content model for learning items
//!
//! These types mirror the embedded dataset one-to-one. Field names are camelCase on
//! the wire so the dataset stays interchangeable with the persisted records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mastery goal used when an item does not declare one
pub const DEFAULT_MASTERY_GOAL: u32 = 5;

fn default_mastery_goal() -> u32 {
    DEFAULT_MASTERY_GOAL
}

/// The fixed set of item categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Consonant,
    Vowel,
    Tone,
    Word,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 4] =
        [Category::Consonant, Category::Vowel, Category::Tone, Category::Word];

    /// Stable identifier used in the dataset and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Consonant => "consonant",
            Category::Vowel => "vowel",
            Category::Tone => "tone",
            Category::Word => "word",
        }
    }

    /// Parse a category identifier (case-insensitive, singular or plural)
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().to_lowercase();
        let input = input.strip_suffix('s').unwrap_or(&input);
        Self::ALL.into_iter().find(|c| c.as_str() == input)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display metadata for a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMeta {
    pub id: Category,
    pub label: String,
    pub color: String,
}

/// A recall question shown after a miss, tying the glyph to a picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnemonicQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// One flashcard unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningItem {
    /// Unique key
    pub id: String,
    /// What is shown on the card (glyph, tone name or word)
    pub script: String,
    /// The correct answer
    pub transliteration: String,
    pub category: Category,
    #[serde(default = "default_mastery_goal")]
    pub mastery_goal: u32,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub mnemonic: Option<String>,
    #[serde(default)]
    pub mnemonic_question: Option<MnemonicQuestion>,
    /// Text handed to speech synthesis; falls back to `script`
    #[serde(default)]
    pub speech_text: Option<String>,
    /// Ids of the items a word is built from
    #[serde(default)]
    pub breakdown: Vec<String>,
}

impl LearningItem {
    /// Text to pronounce for this item
    pub fn speech(&self) -> &str {
        self.speech_text.as_deref().unwrap_or(&self.script)
    }
}

/// An ordered gate over one or more categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub label: String,
    pub categories: Vec<Category>,
}

impl Stage {
    /// Whether this stage owns the category
    pub fn contains(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}
