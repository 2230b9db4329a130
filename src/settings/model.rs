// model.rs: the settings record and its value types

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

/// Background value meaning "leave the page background alone".
pub const NO_BACKGROUND: &str = "#FFFFFF";

/// Inclusive bounds for the text scale percentage.
pub const SCALE_MIN: u16 = 50;
pub const SCALE_MAX: u16 = 200;
pub const SCALE_DEFAULT: u16 = 100;

#[derive(Debug, Clone, Error)]
#[error("not a #RGB/#RRGGBB color: {0:?}")]
pub struct ColorError(String);

/// A validated hex color. Accepts `#RGB` shorthand on input and normalizes
/// to the uppercase `#RRGGBB` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn parse(input: &str) -> Result<Self, ColorError> {
        let trimmed = input.trim();
        if !HEX_COLOR_RE.is_match(trimmed) {
            return Err(ColorError(input.to_string()));
        }
        let hex = &trimmed[1..];
        let expanded = if hex.len() == 3 {
            let mut wide = String::with_capacity(6);
            for ch in hex.chars() {
                wide.push(ch);
                wide.push(ch);
            }
            wide
        } else {
            hex.to_string()
        };
        Ok(Color(format!("#{}", expanded.to_uppercase())))
    }

    /// The normalized `#RRGGBB` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_rgb(&self) -> (u8, u8, u8) {
        let hex = &self.0[1..];
        let part = |range| u8::from_str_radix(&hex[range], 16).unwrap_or(0);
        (part(0..2), part(2..4), part(4..6))
    }

    /// True for the sentinel that disables background painting.
    pub fn is_no_background(&self) -> bool {
        self.0 == NO_BACKGROUND
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Color {
    type Err = ColorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> String {
        color.0
    }
}

/// Which unit alternates between the two colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Char,
    Word,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Char => "char",
            Algorithm::Word => "word",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "char" => Ok(Algorithm::Char),
            "word" => Ok(Algorithm::Word),
            other => Err(format!("unknown algorithm {:?} (expected char or word)", other)),
        }
    }
}

/// The full user-configurable record. Field names mirror the persisted key
/// contract (camelCase) via serde renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "colorA")]
    pub color_a: Color,
    #[serde(rename = "colorB")]
    pub color_b: Color,
    /// Page background; the sentinel `#FFFFFF` means "do not touch it".
    #[serde(rename = "bgColor")]
    pub background: Color,
    pub algorithm: Algorithm,
    /// Font size percentage applied to colored spans; 100 means unscaled.
    #[serde(rename = "textScale")]
    pub text_scale: u16,
    /// Desired filter state as carried in toggle messages.
    #[serde(rename = "isEnabled")]
    pub enabled: bool,
    /// Epoch millis of the moment the filter was last enabled, while on.
    #[serde(rename = "startTime")]
    pub start_time: Option<u64>,
    /// Filter-on millis accumulated across completed enable/disable cycles.
    #[serde(rename = "elapsedTime")]
    pub elapsed_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color_a: Color("#FF0000".to_string()),
            color_b: Color("#0000FF".to_string()),
            background: Color(NO_BACKGROUND.to_string()),
            algorithm: Algorithm::Char,
            text_scale: SCALE_DEFAULT,
            enabled: false,
            start_time: None,
            elapsed_ms: 0,
        }
    }
}

impl Settings {
    /// Overlay a stored record onto the defaults, key by key. A record that
    /// no longer decodes as a whole falls back to the defaults entirely.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let mut merged = match serde_json::to_value(Settings::default()) {
            Ok(Value::Object(map)) => map,
            _ => return Settings::default(),
        };
        for (key, value) in record {
            merged.insert(key.clone(), value.clone());
        }
        match serde_json::from_value::<Settings>(Value::Object(merged)) {
            Ok(mut settings) => {
                settings.text_scale = Settings::clamp_scale(settings.text_scale);
                settings
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored settings unusable, using defaults");
                Settings::default()
            }
        }
    }

    /// The flat key/value form handed to a settings store.
    pub fn to_record(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn clamp_scale(scale: u16) -> u16 {
        scale.clamp(SCALE_MIN, SCALE_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse_normalizes() {
        assert_eq!(Color::parse("#ff8800").unwrap().as_str(), "#FF8800");
        assert_eq!(Color::parse("#fa0").unwrap().as_str(), "#FFAA00");
        assert_eq!(Color::parse(" #abcdef ").unwrap().as_str(), "#ABCDEF");
    }

    #[test]
    fn test_color_parse_rejects_garbage() {
        assert!(Color::parse("").is_err());
        assert!(Color::parse("red").is_err());
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("#GGHHII").is_err());
        assert!(Color::parse("FF0000").is_err());
    }

    #[test]
    fn test_color_to_rgb() {
        assert_eq!(Color::parse("#FF8001").unwrap().to_rgb(), (255, 128, 1));
    }

    #[test]
    fn test_no_background_sentinel() {
        assert!(Color::parse("#ffffff").unwrap().is_no_background());
        assert!(!Color::parse("#fffffe").unwrap().is_no_background());
    }

    #[test]
    fn test_defaults_match_documented_record() {
        let s = Settings::default();
        assert_eq!(s.color_a.as_str(), "#FF0000");
        assert_eq!(s.color_b.as_str(), "#0000FF");
        assert!(s.background.is_no_background());
        assert_eq!(s.algorithm, Algorithm::Char);
        assert_eq!(s.text_scale, 100);
        assert!(!s.enabled);
        assert_eq!(s.start_time, None);
        assert_eq!(s.elapsed_ms, 0);
    }

    #[test]
    fn test_record_round_trip_keeps_camel_case_keys() {
        let record = Settings::default().to_record();
        for key in [
            "colorA",
            "colorB",
            "bgColor",
            "algorithm",
            "textScale",
            "isEnabled",
            "startTime",
            "elapsedTime",
        ] {
            assert!(record.contains_key(key), "missing key {}", key);
        }
        assert_eq!(Settings::from_record(&record), Settings::default());
    }

    #[test]
    fn test_partial_record_merges_over_defaults() {
        let mut record = Map::new();
        record.insert("colorA".to_string(), Value::String("#00FF00".to_string()));
        record.insert("isEnabled".to_string(), Value::Bool(true));
        let s = Settings::from_record(&record);
        assert_eq!(s.color_a.as_str(), "#00FF00");
        assert!(s.enabled);
        assert_eq!(s.color_b.as_str(), "#0000FF");
        assert_eq!(s.text_scale, 100);
    }

    #[test]
    fn test_bad_record_falls_back_to_defaults() {
        let mut record = Map::new();
        record.insert("textScale".to_string(), Value::String("huge".to_string()));
        assert_eq!(Settings::from_record(&record), Settings::default());
    }

    #[test]
    fn test_out_of_range_scale_is_clamped_on_load() {
        let mut record = Map::new();
        record.insert("textScale".to_string(), Value::from(500));
        assert_eq!(Settings::from_record(&record).text_scale, SCALE_MAX);
        record.insert("textScale".to_string(), Value::from(10));
        assert_eq!(Settings::from_record(&record).text_scale, SCALE_MIN);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let mut record = Map::new();
        record.insert("futureKnob".to_string(), Value::Bool(true));
        record.insert("textScale".to_string(), Value::from(130));
        let s = Settings::from_record(&record);
        assert_eq!(s.text_scale, 130);
    }

    #[test]
    fn test_algorithm_serde_names() {
        assert_eq!(
            serde_json::to_value(Algorithm::Word).unwrap(),
            Value::String("word".to_string())
        );
        assert_eq!("CHAR".parse::<Algorithm>().unwrap(), Algorithm::Char);
        assert!("sentence".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_clamp_scale() {
        assert_eq!(Settings::clamp_scale(10), SCALE_MIN);
        assert_eq!(Settings::clamp_scale(500), SCALE_MAX);
        assert_eq!(Settings::clamp_scale(120), 120);
    }
}
