//! Project document records.
//!
//! Documents are markdown records produced by the project coordinator and
//! stored in the `documents` KV namespace. Their kind is determined by the
//! numbered directory prefix they live under.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of a project document, one per numbered docs directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Vision,
    Adr,
    Prd,
    Epic,
    Feature,
    Task,
    Spec,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::Adr => "adr",
            Self::Prd => "prd",
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::Task => "task",
            Self::Spec => "spec",
        }
    }

    /// Directory prefix under the docs root for this kind.
    pub fn storage_prefix(&self) -> &'static str {
        match self {
            Self::Vision => "docs/01-vision",
            Self::Adr => "docs/02-adrs",
            Self::Prd => "docs/03-prds",
            Self::Epic => "docs/04-epics",
            Self::Feature => "docs/05-features",
            Self::Task => "docs/06-tasks",
            Self::Spec => "docs/07-specs",
        }
    }

    /// Determine the kind from a storage path's directory prefix.
    pub fn from_path(path: &str) -> Option<Self> {
        [
            Self::Vision,
            Self::Adr,
            Self::Prd,
            Self::Epic,
            Self::Feature,
            Self::Task,
            Self::Spec,
        ]
        .into_iter()
        .find(|k| path.starts_with(k.storage_prefix()))
    }
}

/// A markdown document record with a shared header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub title: String,
    /// Markdown body.
    pub body: String,
    /// Free-form metadata (tags, acceptance criteria, technical approach).
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(kind: DocumentKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            body: body.into(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Storage key under the document's directory prefix.
    pub fn storage_key(&self) -> String {
        let slug: String = self
            .title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        format!("{}/{}.md", self.kind.storage_prefix(), slug.trim_matches('-'))
    }

    /// Number of acceptance criteria listed in metadata, 0 when absent.
    pub fn acceptance_criteria_count(&self) -> usize {
        self.metadata
            .get("acceptance_criteria")
            .and_then(|v| v.as_array())
            .map_or(0, Vec::len)
    }

    /// Tags listed in metadata.
    pub fn tags(&self) -> Vec<String> {
        self.metadata
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Technical approach text in metadata, empty when absent.
    pub fn technical_approach(&self) -> &str {
        self.metadata
            .get("technical_approach")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// A document is complex when it carries more than three acceptance
    /// criteria, a "complex"/"architecture" tag, or an architecture-heavy
    /// technical approach. Complex documents route through the structured
    /// pipeline.
    pub fn is_complex(&self) -> bool {
        if self.acceptance_criteria_count() > 3 {
            return true;
        }
        let tags = self.tags();
        if tags.iter().any(|t| t == "complex" || t == "architecture") {
            return true;
        }
        self.technical_approach().to_lowercase().contains("architecture")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(
            DocumentKind::from_path("docs/01-vision/product.md"),
            Some(DocumentKind::Vision)
        );
        assert_eq!(
            DocumentKind::from_path("docs/02-adrs/adr-001.md"),
            Some(DocumentKind::Adr)
        );
        assert_eq!(DocumentKind::from_path("src/main.rs"), None);
    }

    #[test]
    fn test_storage_key() {
        let doc = Document::new(DocumentKind::Vision, "Product Vision", "# Vision");
        assert_eq!(doc.storage_key(), "docs/01-vision/product-vision.md");
    }

    #[test]
    fn test_complexity_by_acceptance_criteria() {
        let doc = Document::new(DocumentKind::Prd, "Simple", "")
            .with_metadata("acceptance_criteria", json!(["a", "b"]));
        assert!(!doc.is_complex());

        let doc = Document::new(DocumentKind::Prd, "Busy", "")
            .with_metadata("acceptance_criteria", json!(["a", "b", "c", "d"]));
        assert!(doc.is_complex());
    }

    #[test]
    fn test_complexity_by_tags_and_approach() {
        let doc = Document::new(DocumentKind::Prd, "Tagged", "")
            .with_metadata("tags", json!(["complex"]));
        assert!(doc.is_complex());

        let doc = Document::new(DocumentKind::Prd, "Arch", "")
            .with_metadata("technical_approach", json!("Event-driven architecture rework"));
        assert!(doc.is_complex());

        let doc = Document::new(DocumentKind::Prd, "Plain", "");
        assert!(!doc.is_complex());
    }
}
