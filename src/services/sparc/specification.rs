//! Specification phase engine.
//!
//! Builds the project specification, starting from the best compatible
//! domain template when one exists and enhancing it with project-specific
//! risks, dependencies, and acceptance criteria. A completeness validator
//! scores the result over six criteria.

use crate::domain::models::{
    AcceptanceCriterion, Complexity, FunctionalRequirement, NonFunctionalRequirement,
    RequirementPriority, Risk, RiskLevel, SparcProject, Specification, ValidationResult,
};
use crate::services::template_registry::TemplateRegistry;

/// Output of the specification phase.
pub struct SpecificationOutput {
    pub specification: Specification,
    pub validation_results: Vec<ValidationResult>,
    pub recommendations: Vec<String>,
    /// Template the specification was seeded from, if any.
    pub template_id: Option<String>,
}

pub struct SpecificationEngine;

impl SpecificationEngine {
    /// Produce the specification for a project.
    pub async fn generate(
        project: &SparcProject,
        templates: &TemplateRegistry,
    ) -> SpecificationOutput {
        let (mut specification, template_id) = match templates.apply_best(project).await {
            Some(application) => (application.specification, Some(application.template_id)),
            None => (Self::from_scratch(project), None),
        };

        Self::enhance(&mut specification, project);

        let validation_results = Self::validate_completeness(&specification);
        let recommendations = validation_results
            .iter()
            .filter(|v| !v.passed)
            .flat_map(|v| v.recommendations.clone())
            .collect();

        SpecificationOutput {
            specification,
            validation_results,
            recommendations,
            template_id,
        }
    }

    /// Baseline specification when no template is compatible.
    fn from_scratch(project: &SparcProject) -> Specification {
        let functional_requirements: Vec<FunctionalRequirement> = project
            .requirements
            .iter()
            .enumerate()
            .map(|(i, r)| {
                FunctionalRequirement::new(format!("FR-{}", i + 1), r)
                    .with_priority(RequirementPriority::High)
            })
            .collect();

        Specification {
            functional_requirements,
            non_functional_requirements: vec![NonFunctionalRequirement {
                id: "NFR-1".to_string(),
                category: "maintainability".to_string(),
                description: "Changes ship with tests".to_string(),
                target: "all changes".to_string(),
            }],
            constraints: project.constraints.clone(),
            assumptions: Vec::new(),
            dependencies: Vec::new(),
            acceptance_criteria: Vec::new(),
            risk_assessment: Default::default(),
            success_metrics: vec!["All acceptance criteria pass".to_string()],
        }
    }

    /// Enhance a seeded specification with project-specific detail.
    fn enhance(specification: &mut Specification, project: &SparcProject) {
        // Requirements the seed did not carry become high-priority FRs.
        for requirement in &project.requirements {
            let covered = specification
                .functional_requirements
                .iter()
                .any(|fr| fr.title.eq_ignore_ascii_case(requirement));
            if !covered {
                let id = format!("FR-{}", specification.functional_requirements.len() + 1);
                specification.functional_requirements.push(
                    FunctionalRequirement::new(id, requirement)
                        .with_priority(RequirementPriority::High),
                );
            }
        }

        for constraint in &project.constraints {
            if !specification.constraints.contains(constraint) {
                specification.constraints.push(constraint.clone());
            }
        }

        // Complexity-driven risk.
        if project.complexity >= Complexity::Complex {
            let id = format!("R-{}", specification.risk_assessment.risks.len() + 1);
            specification.risk_assessment.risks.push(Risk {
                id,
                description: format!(
                    "{} scope at {} complexity risks schedule overrun",
                    project.name,
                    project.complexity.as_str()
                ),
                likelihood: RiskLevel::Medium,
                impact: RiskLevel::High,
            });
            specification
                .risk_assessment
                .mitigations
                .push("Deliver phase outputs incrementally".to_string());
            specification.risk_assessment.overall_risk = RiskLevel::Medium;
        }

        // Every high-priority FR gets an acceptance criterion.
        let uncovered: Vec<(String, String)> = specification
            .functional_requirements
            .iter()
            .filter(|fr| fr.priority == RequirementPriority::High)
            .filter(|fr| {
                !specification
                    .acceptance_criteria
                    .iter()
                    .any(|ac| ac.covers.contains(&fr.id))
            })
            .map(|fr| (fr.id.clone(), fr.title.clone()))
            .collect();
        for (fr_id, title) in uncovered {
            let id = format!("AC-{}", specification.acceptance_criteria.len() + 1);
            specification.acceptance_criteria.push(AcceptanceCriterion {
                id,
                description: format!("'{title}' is demonstrably satisfied"),
                covers: vec![fr_id],
            });
        }
    }

    /// Six-criterion completeness validation with remediation
    /// recommendations for failures.
    pub fn validate_completeness(specification: &Specification) -> Vec<ValidationResult> {
        let mut results = Vec::with_capacity(6);

        results.push(presence(
            "functional-requirements",
            !specification.functional_requirements.is_empty(),
            specification.functional_requirements.len(),
            "Add at least one functional requirement",
        ));
        results.push(presence(
            "non-functional-requirements",
            !specification.non_functional_requirements.is_empty(),
            specification.non_functional_requirements.len(),
            "Specify measurable non-functional requirements",
        ));
        results.push(presence(
            "acceptance-criteria",
            !specification.acceptance_criteria.is_empty(),
            specification.acceptance_criteria.len(),
            "Write acceptance criteria for the requirements",
        ));
        results.push(presence(
            "risk-assessment",
            !specification.risk_assessment.risks.is_empty(),
            specification.risk_assessment.risks.len(),
            "Identify project risks and mitigations",
        ));
        results.push(presence(
            "success-metrics",
            !specification.success_metrics.is_empty(),
            specification.success_metrics.len(),
            "Define success metrics",
        ));

        // Coverage: every high-priority FR has a covering AC.
        let high: Vec<&FunctionalRequirement> = specification
            .functional_requirements
            .iter()
            .filter(|fr| fr.priority == RequirementPriority::High)
            .collect();
        let covered = high
            .iter()
            .filter(|fr| {
                specification
                    .acceptance_criteria
                    .iter()
                    .any(|ac| ac.covers.contains(&fr.id))
            })
            .count();
        let ratio = if high.is_empty() {
            1.0
        } else {
            covered as f64 / high.len() as f64
        };
        if ratio >= 1.0 {
            results.push(ValidationResult::passed(
                "high-priority-coverage",
                1.0,
                format!("{covered}/{} high-priority requirements covered", high.len()),
            ));
        } else {
            results.push(ValidationResult::failed(
                "high-priority-coverage",
                ratio,
                format!("{covered}/{} high-priority requirements covered", high.len()),
                "Add acceptance criteria covering every high-priority requirement",
            ));
        }

        results
    }
}

fn presence(criterion: &str, present: bool, count: usize, recommendation: &str) -> ValidationResult {
    if present {
        ValidationResult::passed(criterion, 1.0, format!("{count} present"))
    } else {
        ValidationResult::failed(criterion, 0.0, "none present", recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ProjectDomain;

    fn project() -> SparcProject {
        SparcProject::new("DemoAPI", ProjectDomain::RestApi)
            .with_complexity(Complexity::Moderate)
            .with_requirements(["CRUD users"])
    }

    #[tokio::test]
    async fn test_generation_seeds_from_template_and_enhances() {
        let templates = TemplateRegistry::with_builtins();
        let output = SpecificationEngine::generate(&project(), &templates).await;

        assert!(output.template_id.is_some());
        // The project requirement lands as a functional requirement even
        // though the template did not carry it verbatim.
        assert!(output
            .specification
            .functional_requirements
            .iter()
            .any(|fr| fr.title == "CRUD users"));
        // And every high-priority requirement is covered.
        assert!(output.validation_results.iter().all(|v| v.passed));
    }

    #[tokio::test]
    async fn test_generation_without_template() {
        let templates = TemplateRegistry::new();
        let output = SpecificationEngine::generate(&project(), &templates).await;
        assert!(output.template_id.is_none());
        assert_eq!(output.specification.functional_requirements.len(), 1);
        assert!(!output.specification.acceptance_criteria.is_empty());
    }

    #[tokio::test]
    async fn test_complexity_adds_risk() {
        let templates = TemplateRegistry::new();
        let complex = SparcProject::new("Big", ProjectDomain::General)
            .with_complexity(Complexity::Enterprise)
            .with_requirements(["scale out"]);
        let output = SpecificationEngine::generate(&complex, &templates).await;
        assert!(!output.specification.risk_assessment.risks.is_empty());
    }

    #[test]
    fn test_validator_flags_missing_sections() {
        let results = SpecificationEngine::validate_completeness(&Specification::default());
        let failed: Vec<&str> = results
            .iter()
            .filter(|v| !v.passed)
            .map(|v| v.criterion.as_str())
            .collect();
        assert!(failed.contains(&"functional-requirements"));
        assert!(failed.contains(&"acceptance-criteria"));
        // No high-priority FRs means coverage trivially passes.
        assert!(results
            .iter()
            .find(|v| v.criterion == "high-priority-coverage")
            .unwrap()
            .passed);
    }

    #[test]
    fn test_coverage_ratio_is_partial() {
        let mut spec = Specification::default();
        spec.functional_requirements = vec![
            FunctionalRequirement::new("FR-1", "one").with_priority(RequirementPriority::High),
            FunctionalRequirement::new("FR-2", "two").with_priority(RequirementPriority::High),
        ];
        spec.acceptance_criteria = vec![AcceptanceCriterion {
            id: "AC-1".into(),
            description: "covers one".into(),
            covers: vec!["FR-1".into()],
        }];

        let results = SpecificationEngine::validate_completeness(&spec);
        let coverage = results
            .iter()
            .find(|v| v.criterion == "high-priority-coverage")
            .unwrap();
        assert!(!coverage.passed);
        assert!((coverage.score - 0.5).abs() < f64::EPSILON);
    }
}
