//! Template text in its native character width.
//!
//! Templates are either narrow (UTF-8 `String`) or wide (one `char` per
//! code point). Both widths flow through the same evaluator; operations
//! that combine two strings require them to share a width.

use crate::error::TemplateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Character width of template text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharWidth {
    #[default]
    Narrow,
    Wide,
}

impl fmt::Display for CharWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Narrow => write!(f, "narrow"),
            Self::Wide => write!(f, "wide"),
        }
    }
}

/// Wide template text: one element per code point.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WideString(pub Vec<char>);

impl WideString {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn as_chars(&self) -> &[char] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for WideString {
    fn from(s: &str) -> Self {
        Self(s.chars().collect())
    }
}

impl From<Vec<char>> for WideString {
    fn from(chars: Vec<char>) -> Self {
        Self(chars)
    }
}

impl fmt::Display for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in &self.0 {
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

/// A string in the engine's target representation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetString {
    Narrow(String),
    Wide(WideString),
}

impl TargetString {
    /// An empty string of the given width.
    pub fn empty(width: CharWidth) -> Self {
        match width {
            CharWidth::Narrow => Self::Narrow(String::new()),
            CharWidth::Wide => Self::Wide(WideString::new()),
        }
    }

    /// Build a string of the given width from UTF-8 text.
    pub fn from_str_with_width(s: &str, width: CharWidth) -> Self {
        match width {
            CharWidth::Narrow => Self::Narrow(s.to_string()),
            CharWidth::Wide => Self::Wide(WideString::from(s)),
        }
    }

    pub fn width(&self) -> CharWidth {
        match self {
            Self::Narrow(_) => CharWidth::Narrow,
            Self::Wide(_) => CharWidth::Wide,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Narrow(s) => s.is_empty(),
            Self::Wide(w) => w.is_empty(),
        }
    }

    /// Number of code points.
    pub fn char_count(&self) -> usize {
        match self {
            Self::Narrow(s) => s.chars().count(),
            Self::Wide(w) => w.len(),
        }
    }

    /// The text as code points, independent of width.
    pub fn to_chars(&self) -> Vec<char> {
        match self {
            Self::Narrow(s) => s.chars().collect(),
            Self::Wide(w) => w.0.clone(),
        }
    }

    /// Rebuild a string of `width` from code points.
    pub fn from_chars(chars: Vec<char>, width: CharWidth) -> Self {
        match width {
            CharWidth::Narrow => Self::Narrow(chars.into_iter().collect()),
            CharWidth::Wide => Self::Wide(WideString(chars)),
        }
    }

    /// Apply a code-point transformation, keeping this string's width.
    pub fn map_chars(&self, f: impl FnOnce(&[char]) -> Vec<char>) -> Self {
        match self {
            Self::Narrow(s) => {
                let chars: Vec<char> = s.chars().collect();
                Self::Narrow(f(&chars).into_iter().collect())
            }
            Self::Wide(w) => Self::Wide(WideString(f(&w.0))),
        }
    }

    /// Convert to `width`, re-encoding the code points if necessary.
    pub fn into_width(self, width: CharWidth) -> Self {
        match (self, width) {
            (Self::Wide(w), CharWidth::Narrow) => Self::Narrow(w.to_string()),
            (Self::Narrow(s), CharWidth::Wide) => Self::Wide(WideString::from(s.as_str())),
            (same, _) => same,
        }
    }

    /// Append `other` in place. Both strings must share a width.
    pub fn append(&mut self, other: &TargetString) -> Result<(), TemplateError> {
        match (self, other) {
            (Self::Narrow(a), Self::Narrow(b)) => {
                a.push_str(b);
                Ok(())
            }
            (Self::Wide(a), Self::Wide(b)) => {
                a.0.extend_from_slice(&b.0);
                Ok(())
            }
            (left, right) => Err(TemplateError::WidthMismatch {
                left: left.width(),
                right: right.width(),
            }),
        }
    }

    /// Concatenate two strings of the same width.
    pub fn concat(mut self, other: &TargetString) -> Result<Self, TemplateError> {
        self.append(other)?;
        Ok(self)
    }
}

impl From<&str> for TargetString {
    fn from(s: &str) -> Self {
        Self::Narrow(s.to_string())
    }
}

impl From<String> for TargetString {
    fn from(s: String) -> Self {
        Self::Narrow(s)
    }
}

impl From<WideString> for TargetString {
    fn from(w: WideString) -> Self {
        Self::Wide(w)
    }
}

impl fmt::Display for TargetString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Narrow(s) => write!(f, "{s}"),
            Self::Wide(w) => write!(f, "{w}"),
        }
    }
}
