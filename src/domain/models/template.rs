//! Template registry domain records.
//!
//! Templates are scored against a project and, when compatible, seed the
//! specification, pseudocode, and architecture phases. The generator
//! functions themselves live behind the `DomainTemplate` trait in the
//! template registry service; this module holds the data records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::project::{Complexity, ProjectDomain};

/// Static metadata describing a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    /// Template identifier, unique within the registry.
    pub id: String,
    /// Domain the template is designed for.
    pub domain: ProjectDomain,
    /// Complexity the template targets.
    pub complexity: Complexity,
    /// Search tags.
    pub tags: Vec<String>,
    /// Requirement titles the template addresses out of the box.
    pub requirements: Vec<String>,
    /// Estimated build time in minutes.
    pub estimated_time_min: u32,
}

/// Mutable usage counters tracked per template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateUsage {
    pub usage_count: u64,
    pub last_used: Option<DateTime<Utc>>,
    pub average_rating: f64,
    pub rating_count: u64,
}

impl TemplateUsage {
    /// Record one application of the template.
    pub fn record_use(&mut self) {
        self.usage_count += 1;
        self.last_used = Some(Utc::now());
    }

    /// Fold a rating in [0, 5] into the rolling average.
    pub fn record_rating(&mut self, rating: f64) {
        let rating = rating.clamp(0.0, 5.0);
        let n = self.rating_count as f64;
        self.average_rating = (self.average_rating * n + rating) / (n + 1.0);
        self.rating_count += 1;
    }
}

/// Report of how a template was customized for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationReport {
    pub template_id: String,
    pub project_id: Uuid,
    /// Human-readable customization notes.
    pub customizations: Vec<String>,
    pub applied_at: DateTime<Utc>,
}

/// Compatibility score between a template and a project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityScore {
    /// Final score in [0, 1].
    pub score: f64,
    /// Fraction of project requirements the template covers.
    pub requirement_coverage: f64,
}

impl CompatibilityScore {
    /// Compatible templates score at least 0.6.
    pub const THRESHOLD: f64 = 0.6;

    pub fn is_compatible(&self) -> bool {
        self.score >= Self::THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_counters() {
        let mut usage = TemplateUsage::default();
        usage.record_use();
        usage.record_use();
        assert_eq!(usage.usage_count, 2);
        assert!(usage.last_used.is_some());
    }

    #[test]
    fn test_rating_rolling_average() {
        let mut usage = TemplateUsage::default();
        usage.record_rating(4.0);
        usage.record_rating(2.0);
        assert!((usage.average_rating - 3.0).abs() < f64::EPSILON);

        usage.record_rating(9.0); // clamped to 5
        assert!((usage.average_rating - (11.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_compatibility_threshold() {
        let score = CompatibilityScore {
            score: 0.6,
            requirement_coverage: 0.5,
        };
        assert!(score.is_compatible());

        let score = CompatibilityScore {
            score: 0.59,
            requirement_coverage: 0.5,
        };
        assert!(!score.is_compatible());
    }
}
