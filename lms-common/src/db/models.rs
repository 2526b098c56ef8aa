//! Database models shared between services

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of content a course module delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    Video,
    Pdf,
    TextStream,
}

impl ModuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Video => "video",
            ModuleType::Pdf => "pdf",
            ModuleType::TextStream => "text_stream",
        }
    }

    /// Lenient parse used by import flows: unknown kinds become `Video`
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or(ModuleType::Video)
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(ModuleType::Video),
            "pdf" => Ok(ModuleType::Pdf),
            "text_stream" => Ok(ModuleType::TextStream),
            other => Err(format!("Unknown module type: {}", other)),
        }
    }
}

/// Row of the `modules` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub module_type: ModuleType,
    pub content_url: Option<String>,
    pub module_order: i64,
    pub duration_mins: i64,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_type_parse() {
        assert_eq!("text_stream".parse::<ModuleType>(), Ok(ModuleType::TextStream));
        assert_eq!(" PDF ".parse::<ModuleType>(), Ok(ModuleType::Pdf));
        assert!("slides".parse::<ModuleType>().is_err());
    }

    #[test]
    fn test_module_type_lossy_defaults_to_video() {
        assert_eq!(ModuleType::from_str_lossy("slides"), ModuleType::Video);
        assert_eq!(ModuleType::from_str_lossy("Text_Stream"), ModuleType::TextStream);
    }

    #[test]
    fn test_module_type_serde_matches_column_value() {
        let json = serde_json::to_string(&ModuleType::TextStream).unwrap();
        assert_eq!(json, "\"text_stream\"");
        assert_eq!(ModuleType::TextStream.to_string(), "text_stream");
    }
}
