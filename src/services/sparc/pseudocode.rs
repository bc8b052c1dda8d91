//! Pseudocode phase engine.
//!
//! Derives algorithms, data structures, and control flows from the
//! specification. The validator checks completeness and flags algorithms
//! whose step lists look too thin to implement from.

use crate::domain::models::{
    Algorithm, ComplexityAnalysis, ComplexitySummary, ControlFlow, DataStructureDef, ParameterDef,
    Pseudocode, ReturnDef, Specification, ValidationResult,
};

/// Output of the pseudocode phase.
pub struct PseudocodeOutput {
    pub pseudocode: Pseudocode,
    pub validation_results: Vec<ValidationResult>,
    pub recommendations: Vec<String>,
}

pub struct PseudocodeEngine;

impl PseudocodeEngine {
    /// Derive pseudocode from a specification.
    pub fn generate(specification: &Specification) -> PseudocodeOutput {
        let algorithms: Vec<Algorithm> = specification
            .functional_requirements
            .iter()
            .map(|fr| {
                let mut algorithm = Algorithm::new(
                    algorithm_name(&fr.title),
                    format!("Satisfy {}: {}", fr.id, fr.title),
                )
                .with_step("Validate inputs and preconditions")
                .with_step(format!("Perform: {}", fr.title))
                .with_step("Record the outcome and emit the result");
                algorithm.parameters = vec![ParameterDef {
                    name: "request".to_string(),
                    type_name: "Request".to_string(),
                    description: format!("Input for {}", fr.id),
                }];
                algorithm.returns = ReturnDef {
                    type_name: "Result".to_string(),
                    description: "Outcome record or failure".to_string(),
                };
                algorithm.complexity = ComplexitySummary {
                    time: "O(n)".to_string(),
                    space: "O(1)".to_string(),
                };
                algorithm.dependencies = vec!["StateStore".to_string()];
                algorithm
            })
            .collect();

        let mut data_structures = vec![DataStructureDef {
            name: "StateStore".to_string(),
            kind: "map".to_string(),
            purpose: "Authoritative state consulted by every algorithm".to_string(),
            operations: vec!["get".to_string(), "put".to_string(), "remove".to_string()],
        }];
        // External dependencies each get a boundary record.
        for dependency in &specification.dependencies {
            data_structures.push(DataStructureDef {
                name: format!("{}Adapter", algorithm_name(dependency)),
                kind: "record".to_string(),
                purpose: format!("Boundary to {dependency}"),
                operations: vec!["call".to_string()],
            });
        }

        let control_flows = vec![
            ControlFlow {
                name: "request-flow".to_string(),
                flow_type: "sequential".to_string(),
                description: "validate -> execute -> record".to_string(),
            },
            ControlFlow {
                name: "failure-flow".to_string(),
                flow_type: "branch".to_string(),
                description: "validation failure short-circuits with a structured error".to_string(),
            },
        ];

        let pseudocode = Pseudocode {
            complexity_analysis: ComplexityAnalysis {
                time: "O(n) per operation".to_string(),
                space: "O(n) state".to_string(),
                scalability: "Linear in stored entities".to_string(),
                worst_case: "O(n)".to_string(),
                average_case: "O(n)".to_string(),
                best_case: "O(1)".to_string(),
                bottlenecks: vec!["StateStore contention".to_string()],
            },
            algorithms,
            data_structures,
            control_flows,
            optimizations: vec!["Batch state reads per request".to_string()],
            dependencies: specification.dependencies.clone(),
        };

        let validation_results = Self::validate(&pseudocode);
        let recommendations = validation_results
            .iter()
            .filter(|v| !v.passed)
            .flat_map(|v| v.recommendations.clone())
            .collect();

        PseudocodeOutput {
            pseudocode,
            validation_results,
            recommendations,
        }
    }

    /// Completeness checks plus per-algorithm logic issues.
    pub fn validate(pseudocode: &Pseudocode) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        if pseudocode.algorithms.is_empty() {
            results.push(ValidationResult::failed(
                "algorithms",
                0.0,
                "no algorithms specified",
                "Derive at least one algorithm from the functional requirements",
            ));
        } else {
            results.push(ValidationResult::passed(
                "algorithms",
                1.0,
                format!("{} algorithms", pseudocode.algorithms.len()),
            ));
        }

        if pseudocode.complexity_analysis.time.is_empty() {
            results.push(ValidationResult::failed(
                "complexity-analysis",
                0.0,
                "missing complexity analysis",
                "Add time/space complexity with best, average, and worst cases",
            ));
        } else {
            results.push(ValidationResult::passed(
                "complexity-analysis",
                1.0,
                "complexity analysis present",
            ));
        }

        if pseudocode.data_structures.is_empty() {
            results.push(ValidationResult::failed(
                "data-structures",
                0.0,
                "no data structures specified",
                "Name the data structures the algorithms operate on",
            ));
        } else {
            results.push(ValidationResult::passed(
                "data-structures",
                1.0,
                format!("{} data structures", pseudocode.data_structures.len()),
            ));
        }

        // Per-algorithm logic issues: a workable algorithm has at least two
        // steps and a declared return.
        let thin: Vec<String> = pseudocode
            .algorithms
            .iter()
            .filter(|a| a.steps.len() < 2 || a.returns.type_name.is_empty())
            .map(|a| a.name.clone())
            .collect();
        if thin.is_empty() {
            results.push(ValidationResult::passed(
                "algorithm-logic",
                1.0,
                "all algorithms have workable step lists",
            ));
        } else {
            let ratio = 1.0 - thin.len() as f64 / pseudocode.algorithms.len().max(1) as f64;
            results.push(ValidationResult::failed(
                "algorithm-logic",
                ratio,
                format!("underspecified algorithms: {}", thin.join(", ")),
                "Expand each flagged algorithm to at least two steps with a return definition",
            ));
        }

        results
    }
}

/// Requirement title to a PascalCase algorithm name.
fn algorithm_name(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{FunctionalRequirement, RequirementPriority};

    fn specification() -> Specification {
        Specification {
            functional_requirements: vec![
                FunctionalRequirement::new("FR-1", "create user")
                    .with_priority(RequirementPriority::High),
                FunctionalRequirement::new("FR-2", "list users"),
            ],
            dependencies: vec!["identity provider".to_string()],
            ..Specification::default()
        }
    }

    #[test]
    fn test_algorithm_per_requirement() {
        let output = PseudocodeEngine::generate(&specification());
        assert_eq!(output.pseudocode.algorithms.len(), 2);
        assert_eq!(output.pseudocode.algorithms[0].name, "CreateUser");
        assert!(output.pseudocode.algorithms[0].steps.len() >= 3);
        assert!(output.validation_results.iter().all(|v| v.passed));
    }

    #[test]
    fn test_dependency_adapters_derived() {
        let output = PseudocodeEngine::generate(&specification());
        assert!(output
            .pseudocode
            .data_structures
            .iter()
            .any(|d| d.name == "IdentityProviderAdapter"));
    }

    #[test]
    fn test_validator_flags_empty_design() {
        let results = PseudocodeEngine::validate(&Pseudocode::default());
        assert!(results.iter().any(|v| v.criterion == "algorithms" && !v.passed));
        assert!(results
            .iter()
            .any(|v| v.criterion == "complexity-analysis" && !v.passed));
    }

    #[test]
    fn test_validator_flags_thin_algorithms() {
        let mut pseudocode = PseudocodeEngine::generate(&specification()).pseudocode;
        pseudocode.algorithms[0].steps.truncate(1);
        let results = PseudocodeEngine::validate(&pseudocode);
        let logic = results
            .iter()
            .find(|v| v.criterion == "algorithm-logic")
            .unwrap();
        assert!(!logic.passed);
        assert!(logic.details.contains("CreateUser"));
    }

    #[test]
    fn test_algorithm_name_conversion() {
        assert_eq!(algorithm_name("create user"), "CreateUser");
        assert_eq!(algorithm_name("CRUD users"), "CRUDUsers");
        assert_eq!(algorithm_name("rate-limit requests"), "RateLimitRequests");
    }
}
