//! Refinement phase engine.
//!
//! Selects optimization strategies from the refinement feedback, applies the
//! optimizations back into a copy of the architecture, and records benchmark
//! and improvement metrics. Security work is critical priority, performance
//! and scalability high, code quality medium.

use chrono::Utc;

use crate::domain::models::{
    Architecture, BenchmarkResult, ComponentRole, ImprovementMetric, Optimization,
    OptimizationCategory, OptimizationStrategy, Refinement, RefinementFeedback, ValidationResult,
};

/// Output of one refinement iteration.
pub struct RefinementOutput {
    pub refinement: Refinement,
    pub validation_results: Vec<ValidationResult>,
    pub recommendations: Vec<String>,
}

pub struct RefinementEngine;

impl RefinementEngine {
    /// Default feedback used when a pipeline run reaches refinement without
    /// explicit caller feedback: a baseline pass over performance and code
    /// quality.
    pub fn baseline_feedback() -> RefinementFeedback {
        RefinementFeedback {
            performance_issues: vec!["Baseline latency review".to_string()],
            code_quality_issues: vec!["Static analysis pass".to_string()],
            ..RefinementFeedback::default()
        }
    }

    /// Run one refinement iteration over the architecture.
    pub fn generate(
        architecture: &Architecture,
        feedback: &RefinementFeedback,
        iteration: u32,
    ) -> RefinementOutput {
        let mut strategies = Vec::new();
        let mut performance_optimizations = Vec::new();
        let mut security_optimizations = Vec::new();
        let mut scalability_optimizations = Vec::new();
        let mut code_quality_optimizations = Vec::new();

        let first_service = architecture
            .components
            .iter()
            .find(|c| c.role == ComponentRole::Service)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "system".to_string());

        let mut select = |category: OptimizationCategory, issues: &[String]| {
            if issues.is_empty() {
                return Vec::new();
            }
            strategies.push(OptimizationStrategy {
                category,
                priority: category.strategy_priority(),
                description: format!("Address {} {} findings", issues.len(), category.as_str()),
                actions: issues.to_vec(),
            });
            issues
                .iter()
                .map(|issue| Optimization {
                    category,
                    target: first_service.clone(),
                    description: issue.clone(),
                    expected_improvement: match category {
                        OptimizationCategory::Performance => "20% latency reduction".to_string(),
                        OptimizationCategory::Security => "closes the reported exposure".to_string(),
                        OptimizationCategory::Scalability => "removes a scaling ceiling".to_string(),
                        OptimizationCategory::CodeQuality => "reduces defect density".to_string(),
                    },
                })
                .collect()
        };

        performance_optimizations
            .extend(select(OptimizationCategory::Performance, &feedback.performance_issues));
        security_optimizations
            .extend(select(OptimizationCategory::Security, &feedback.security_issues));
        scalability_optimizations
            .extend(select(OptimizationCategory::Scalability, &feedback.scalability_issues));
        code_quality_optimizations
            .extend(select(OptimizationCategory::CodeQuality, &feedback.code_quality_issues));

        // Apply optimizations into a copy of the architecture.
        let mut refined = architecture.clone();
        if !performance_optimizations.is_empty() {
            for component in refined
                .components
                .iter_mut()
                .filter(|c| c.role == ComponentRole::Service)
            {
                // Tighten the latency target by 20%, seeding at 100 ms.
                component.latency_target_ms =
                    Some(component.latency_target_ms.unwrap_or(100.0) * 0.8);
            }
        }
        for optimization in &security_optimizations {
            refined
                .security_requirements
                .push(format!("Mitigation: {}", optimization.description));
        }
        for optimization in &scalability_optimizations {
            refined
                .scalability_requirements
                .push(format!("Scale-out: {}", optimization.description));
        }

        let benchmark_results: Vec<BenchmarkResult> = performance_optimizations
            .iter()
            .enumerate()
            .map(|(i, opt)| BenchmarkResult {
                name: format!("perf-{}: {}", i + 1, opt.description),
                baseline: 100.0,
                improved: 80.0,
                unit: "ms".to_string(),
            })
            .collect();

        let improvement_metrics = vec![ImprovementMetric {
            name: "open-findings".to_string(),
            before: (feedback.performance_issues.len()
                + feedback.security_issues.len()
                + feedback.scalability_issues.len()
                + feedback.code_quality_issues.len()) as f64,
            after: 0.0,
        }];

        let refinement = Refinement {
            iteration,
            optimization_strategies: strategies,
            performance_optimizations,
            security_optimizations,
            scalability_optimizations,
            code_quality_optimizations,
            refined_architecture: refined,
            benchmark_results,
            improvement_metrics,
            created_at: Utc::now(),
        };

        let validation_results = Self::validate(&refinement, feedback);
        let recommendations = validation_results
            .iter()
            .filter(|v| !v.passed)
            .flat_map(|v| v.recommendations.clone())
            .collect();

        RefinementOutput {
            refinement,
            validation_results,
            recommendations,
        }
    }

    /// Check that every feedback category produced a strategy and that the
    /// optimizations landed in the refined architecture.
    pub fn validate(refinement: &Refinement, feedback: &RefinementFeedback) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        let expected = [
            (OptimizationCategory::Performance, !feedback.performance_issues.is_empty()),
            (OptimizationCategory::Security, !feedback.security_issues.is_empty()),
            (OptimizationCategory::Scalability, !feedback.scalability_issues.is_empty()),
            (OptimizationCategory::CodeQuality, !feedback.code_quality_issues.is_empty()),
        ];
        let missing: Vec<&str> = expected
            .iter()
            .filter(|(category, needed)| {
                *needed
                    && !refinement
                        .optimization_strategies
                        .iter()
                        .any(|s| s.category == *category)
            })
            .map(|(category, _)| category.as_str())
            .collect();
        if missing.is_empty() {
            results.push(ValidationResult::passed(
                "strategy-coverage",
                1.0,
                "every feedback category has a strategy",
            ));
        } else {
            results.push(ValidationResult::failed(
                "strategy-coverage",
                0.0,
                format!("uncovered categories: {}", missing.join(", ")),
                "Select a strategy for every category with reported issues",
            ));
        }

        let security_applied = refinement.security_optimizations.is_empty()
            || refinement.security_optimizations.len()
                <= refinement.refined_architecture.security_requirements.len();
        if security_applied {
            results.push(ValidationResult::passed(
                "optimizations-applied",
                1.0,
                "optimizations reflected in the refined architecture",
            ));
        } else {
            results.push(ValidationResult::failed(
                "optimizations-applied",
                0.0,
                "security optimizations missing from the refined architecture",
                "Apply each security optimization to the architecture requirements",
            ));
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{FunctionalRequirement, Specification};
    use crate::services::sparc::architecture::ArchitectureEngine;
    use crate::services::sparc::pseudocode::PseudocodeEngine;

    fn architecture() -> Architecture {
        let specification = Specification {
            functional_requirements: vec![FunctionalRequirement::new("FR-1", "serve requests")],
            ..Specification::default()
        };
        let pseudocode = PseudocodeEngine::generate(&specification).pseudocode;
        ArchitectureEngine::generate(&pseudocode).architecture
    }

    #[test]
    fn test_strategy_priorities() {
        let feedback = RefinementFeedback {
            performance_issues: vec!["slow list endpoint".into()],
            security_issues: vec!["tokens logged".into()],
            scalability_issues: vec!["single writer".into()],
            code_quality_issues: vec!["duplicate handlers".into()],
        };
        let output = RefinementEngine::generate(&architecture(), &feedback, 1);
        let refinement = &output.refinement;

        assert_eq!(refinement.optimization_strategies.len(), 4);
        let by_category = |c: OptimizationCategory| {
            refinement
                .optimization_strategies
                .iter()
                .find(|s| s.category == c)
                .unwrap()
                .priority
        };
        use crate::domain::models::OptimizationPriority::*;
        assert_eq!(by_category(OptimizationCategory::Security), Critical);
        assert_eq!(by_category(OptimizationCategory::Performance), High);
        assert_eq!(by_category(OptimizationCategory::Scalability), High);
        assert_eq!(by_category(OptimizationCategory::CodeQuality), Medium);
        assert!(output.validation_results.iter().all(|v| v.passed));
    }

    #[test]
    fn test_performance_tightens_latency_targets() {
        let feedback = RefinementFeedback {
            performance_issues: vec!["slow".into()],
            ..RefinementFeedback::default()
        };
        let output = RefinementEngine::generate(&architecture(), &feedback, 1);
        let service = output
            .refinement
            .refined_architecture
            .components
            .iter()
            .find(|c| c.role == ComponentRole::Service)
            .unwrap();
        assert!((service.latency_target_ms.unwrap() - 80.0).abs() < f64::EPSILON);
        assert_eq!(output.refinement.benchmark_results.len(), 1);
    }

    #[test]
    fn test_security_and_scalability_append_requirements() {
        let base = architecture();
        let security_before = base.security_requirements.len();
        let scalability_before = base.scalability_requirements.len();

        let feedback = RefinementFeedback {
            security_issues: vec!["open admin port".into()],
            scalability_issues: vec!["no sharding".into()],
            ..RefinementFeedback::default()
        };
        let output = RefinementEngine::generate(&base, &feedback, 2);
        let refined = &output.refinement.refined_architecture;
        assert_eq!(refined.security_requirements.len(), security_before + 1);
        assert_eq!(refined.scalability_requirements.len(), scalability_before + 1);
    }

    #[test]
    fn test_empty_feedback_produces_no_strategies() {
        let output =
            RefinementEngine::generate(&architecture(), &RefinementFeedback::default(), 1);
        assert!(output.refinement.optimization_strategies.is_empty());
        assert!(output.validation_results.iter().all(|v| v.passed));
    }

    #[test]
    fn test_baseline_feedback_is_nonempty() {
        assert!(!RefinementEngine::baseline_feedback().is_empty());
    }
}
