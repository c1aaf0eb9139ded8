//! Title/author attribution value object.

use serde::{Deserialize, Serialize};

/// Best-guess `(title, author)` pair inferred from a free-text description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionResult {
    /// Always present; falls back to the trimmed description.
    pub title: String,
    /// Present only when a separator pattern matched.
    pub author: Option<String>,
}

impl AttributionResult {
    pub fn title_only(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
        }
    }

    pub fn with_author(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: Some(author.into()),
        }
    }
}
