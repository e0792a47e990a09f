//! Statement builder configuration.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How bind placeholders are written into statement text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// Anonymous `?` placeholders.
    #[default]
    Question,
    /// Numbered `?1`, `?2`, ... placeholders.
    Numbered,
    /// Numbered `$1`, `$2`, ... placeholders.
    Dollar,
}

impl PlaceholderStyle {
    /// Render the placeholder for the 1-based binding `index`.
    pub fn render(&self, index: usize) -> String {
        match self {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Numbered => format!("?{index}"),
            PlaceholderStyle::Dollar => format!("${index}"),
        }
    }
}

/// Options shaping generated statement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Placeholder style for bindings.
    pub placeholder: PlaceholderStyle,
    /// Wrap table and column identifiers in double quotes.
    pub quote_identifiers: bool,
    /// Escape character declared on LIKE predicates.
    pub like_escape: Option<char>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            placeholder: PlaceholderStyle::Question,
            quote_identifiers: true,
            like_escape: None,
        }
    }
}

impl BuilderConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Set the placeholder style.
    pub fn with_placeholder(mut self, placeholder: PlaceholderStyle) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Enable or disable identifier quoting.
    pub fn with_quoted_identifiers(mut self, quote: bool) -> Self {
        self.quote_identifiers = quote;
        self
    }

    /// Declare an escape character for LIKE patterns.
    pub fn with_like_escape(mut self, escape: char) -> Self {
        self.like_escape = Some(escape);
        self
    }

    /// Render an identifier according to the quoting setting.
    pub fn identifier(&self, name: &str) -> String {
        if self.quote_identifiers {
            format!("\"{}\"", name.replace('"', "\"\""))
        } else {
            name.to_string()
        }
    }
}
