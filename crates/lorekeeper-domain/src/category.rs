//! Extraction categories
//!
//! The category is a closed set. Everything that varies per category
//! (result shape, empty value, retrieval keywords, artifact key) is decided
//! by an exhaustive `match` here so adding a variant fails to compile until
//! every table is updated.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The kind of semantic element being extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionCategory {
    /// World facts: geography, history, technology, magic, society, ...
    Worldview,
    /// Characters: a list of entities keyed by name
    Characters,
    /// Plot: storylines, conflicts, turning points
    Plot,
}

/// Top-level JSON shape of results for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// A single JSON object
    Mapping,
    /// A JSON array of objects
    List,
}

/// Error returned when parsing an unknown category name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown extraction category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl ExtractionCategory {
    /// All categories, in pipeline order
    pub const ALL: [ExtractionCategory; 3] = [
        ExtractionCategory::Worldview,
        ExtractionCategory::Characters,
        ExtractionCategory::Plot,
    ];

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionCategory::Worldview => "worldview",
            ExtractionCategory::Characters => "characters",
            ExtractionCategory::Plot => "plot",
        }
    }

    /// Shape every intermediate and final result must have
    pub fn shape(&self) -> ResultShape {
        match self {
            ExtractionCategory::Worldview | ExtractionCategory::Plot => ResultShape::Mapping,
            ExtractionCategory::Characters => ResultShape::List,
        }
    }

    /// The value produced when nothing could be extracted
    ///
    /// # Examples
    ///
    /// ```
    /// use lorekeeper_domain::ExtractionCategory;
    /// use serde_json::json;
    ///
    /// assert_eq!(ExtractionCategory::Worldview.empty_value(), json!({}));
    /// assert_eq!(ExtractionCategory::Characters.empty_value(), json!([]));
    /// ```
    pub fn empty_value(&self) -> Value {
        match self.shape() {
            ResultShape::Mapping => Value::Object(serde_json::Map::new()),
            ResultShape::List => Value::Array(Vec::new()),
        }
    }

    /// Whether `value` has this category's top-level shape
    pub fn matches_shape(&self, value: &Value) -> bool {
        match self.shape() {
            ResultShape::Mapping => value.is_object(),
            ResultShape::List => value.is_array(),
        }
    }

    /// Fixed keyword query used to narrow a chunk through the similarity index
    pub fn context_query(&self) -> &'static str {
        match self {
            ExtractionCategory::Worldview => {
                "worldview world geography history background technology magic society culture politics economy \
                 世界观 地理 历史 背景 科技 魔法 社会 文化 政治"
            }
            ExtractionCategory::Characters => {
                "character role protagonist supporting antagonist personality ability relationship background \
                 角色 人物 主角 配角 性格 能力 关系 背景"
            }
            ExtractionCategory::Plot => {
                "plot storyline conflict climax ending development turning point \
                 剧情 故事线 情节 冲突 高潮 结局 发展 转折"
            }
        }
    }

    /// Key of this category in the persisted artifact
    pub fn artifact_key(&self) -> &'static str {
        match self {
            ExtractionCategory::Worldview => "worldview",
            ExtractionCategory::Characters => "characters",
            ExtractionCategory::Plot => "plot_outline",
        }
    }
}

impl fmt::Display for ExtractionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worldview" | "world" => Ok(ExtractionCategory::Worldview),
            "characters" | "character" => Ok(ExtractionCategory::Characters),
            "plot" | "plot_outline" => Ok(ExtractionCategory::Plot),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}
