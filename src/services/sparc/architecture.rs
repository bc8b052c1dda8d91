//! Architecture phase engine.
//!
//! Derives components from the pseudocode (one service per algorithm, one
//! data manager per data structure, fixed infrastructure components),
//! resolves relationships, infers data flows, and selects architectural
//! patterns. The validator checks that every declared dependency resolves
//! and every provided interface is defined.

use crate::domain::models::{
    Architecture, Component, ComponentRole, DataFlow, DeploymentUnit, InterfaceDef, Pseudocode,
    QualityAttribute, Relationship, ValidationResult,
};

/// Output of the architecture phase.
pub struct ArchitectureOutput {
    pub architecture: Architecture,
    pub validation_results: Vec<ValidationResult>,
    pub recommendations: Vec<String>,
}

pub struct ArchitectureEngine;

impl ArchitectureEngine {
    /// Derive the architecture from pseudocode.
    pub fn generate(pseudocode: &Pseudocode) -> ArchitectureOutput {
        let mut components = Vec::new();
        let mut interfaces = Vec::new();

        // One service per algorithm.
        for algorithm in &pseudocode.algorithms {
            let name = format!("{}Service", algorithm.name);
            let interface = format!("I{}", algorithm.name);
            interfaces.push(InterfaceDef {
                name: interface.clone(),
                description: algorithm.purpose.clone(),
                operations: vec![algorithm.name.clone()],
            });
            components.push(Component {
                id: slug(&name),
                name,
                role: ComponentRole::Service,
                responsibility: algorithm.purpose.clone(),
                dependencies: algorithm.dependencies.clone(),
                provided_interfaces: vec![interface],
                latency_target_ms: None,
            });
        }

        // One data manager per data structure.
        for structure in &pseudocode.data_structures {
            let name = format!("{}Manager", structure.name);
            let interface = format!("I{}Store", structure.name);
            interfaces.push(InterfaceDef {
                name: interface.clone(),
                description: structure.purpose.clone(),
                operations: structure.operations.clone(),
            });
            components.push(Component {
                id: slug(&name),
                name,
                role: ComponentRole::DataManager,
                responsibility: format!("Own the {} data structure", structure.name),
                dependencies: Vec::new(),
                provided_interfaces: vec![interface],
                latency_target_ms: None,
            });
        }

        // Fixed infrastructure components. The gateway fronts every service.
        let service_names: Vec<String> = components
            .iter()
            .filter(|c| c.role == ComponentRole::Service)
            .map(|c| c.name.clone())
            .collect();
        components.push(Component {
            id: "api-gateway".to_string(),
            name: "ApiGateway".to_string(),
            role: ComponentRole::Gateway,
            responsibility: "Single entry point routing external requests".to_string(),
            dependencies: service_names,
            provided_interfaces: Vec::new(),
            latency_target_ms: None,
        });
        components.push(Component {
            id: "configuration-manager".to_string(),
            name: "ConfigurationManager".to_string(),
            role: ComponentRole::Configuration,
            responsibility: "Hierarchical configuration for every component".to_string(),
            dependencies: Vec::new(),
            provided_interfaces: Vec::new(),
            latency_target_ms: None,
        });
        components.push(Component {
            id: "monitoring-service".to_string(),
            name: "MonitoringService".to_string(),
            role: ComponentRole::Monitoring,
            responsibility: "Collect health and performance signals".to_string(),
            dependencies: Vec::new(),
            provided_interfaces: Vec::new(),
            latency_target_ms: None,
        });

        // Relationships: resolve each declared dependency by component name
        // or provided interface, then connect every service to every data
        // manager.
        let mut relationships = Vec::new();
        for component in &components {
            for dependency in &component.dependencies {
                if let Some(target) = resolve(&components, dependency) {
                    relationships.push(Relationship {
                        from: component.name.clone(),
                        to: target,
                        relation: "uses".to_string(),
                    });
                }
            }
        }
        let managers: Vec<String> = components
            .iter()
            .filter(|c| c.role == ComponentRole::DataManager)
            .map(|c| c.name.clone())
            .collect();
        for component in &components {
            if component.role != ComponentRole::Service {
                continue;
            }
            for manager in &managers {
                let exists = relationships
                    .iter()
                    .any(|r| r.from == component.name && r.to == *manager);
                if !exists {
                    relationships.push(Relationship {
                        from: component.name.clone(),
                        to: manager.clone(),
                        relation: "stores".to_string(),
                    });
                }
            }
        }

        // Pattern selection heuristics.
        let mut patterns = Vec::new();
        if components.len() > 5 {
            patterns.push("Microservices".to_string());
        }
        let coordination_naming = components.iter().any(|c| {
            let name = c.name.to_lowercase();
            name.contains("coordination") || name.contains("agent") || name.contains("swarm")
        });
        if coordination_naming {
            patterns.push("Event-Driven".to_string());
        }
        if !managers.is_empty() {
            patterns.push("CQRS".to_string());
        }
        patterns.push("Layered".to_string());

        // One data flow per relationship, typed by the endpoint roles.
        let data_flow = relationships
            .iter()
            .map(|r| flow_for(&components, r))
            .collect();

        let deployment_units = vec![
            DeploymentUnit {
                name: "edge".to_string(),
                components: vec!["ApiGateway".to_string()],
                replicas: 2,
            },
            DeploymentUnit {
                name: "application".to_string(),
                components: components
                    .iter()
                    .filter(|c| c.role == ComponentRole::Service)
                    .map(|c| c.name.clone())
                    .collect(),
                replicas: 2,
            },
            DeploymentUnit {
                name: "data".to_string(),
                components: managers.clone(),
                replicas: 1,
            },
            DeploymentUnit {
                name: "platform".to_string(),
                components: vec![
                    "ConfigurationManager".to_string(),
                    "MonitoringService".to_string(),
                ],
                replicas: 1,
            },
        ];

        let architecture = Architecture {
            components,
            interfaces,
            relationships,
            data_flow,
            deployment_units,
            quality_attributes: vec![
                QualityAttribute {
                    name: "observability".to_string(),
                    target: "all components report health".to_string(),
                },
                QualityAttribute {
                    name: "modifiability".to_string(),
                    target: "components replaceable behind interfaces".to_string(),
                },
            ],
            architectural_patterns: patterns,
            technology_stack: vec![
                "Async runtime".to_string(),
                "Key-value store".to_string(),
                "HTTP".to_string(),
            ],
            security_requirements: vec!["Authenticated component-to-component calls".to_string()],
            scalability_requirements: vec!["Stateless services scale horizontally".to_string()],
        };

        let validation_results = Self::validate(&architecture);
        let recommendations = validation_results
            .iter()
            .filter(|v| !v.passed)
            .flat_map(|v| v.recommendations.clone())
            .collect();

        ArchitectureOutput {
            architecture,
            validation_results,
            recommendations,
        }
    }

    /// Check dependency resolution and interface definition.
    pub fn validate(architecture: &Architecture) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        let mut unresolved = Vec::new();
        for component in &architecture.components {
            for dependency in &component.dependencies {
                if resolve(&architecture.components, dependency).is_none() {
                    unresolved.push(format!("{} -> {}", component.name, dependency));
                }
            }
        }
        if unresolved.is_empty() {
            results.push(ValidationResult::passed(
                "dependency-resolution",
                1.0,
                "every declared dependency resolves to a component",
            ));
        } else {
            results.push(ValidationResult::failed(
                "dependency-resolution",
                0.0,
                format!("unresolved: {}", unresolved.join(", ")),
                "Add the missing components or correct the dependency names",
            ));
        }

        let mut undefined = Vec::new();
        for component in &architecture.components {
            for interface in &component.provided_interfaces {
                if !architecture.has_interface(interface) {
                    undefined.push(format!("{} provides {}", component.name, interface));
                }
            }
        }
        if undefined.is_empty() {
            results.push(ValidationResult::passed(
                "interface-definition",
                1.0,
                "every provided interface is defined",
            ));
        } else {
            results.push(ValidationResult::failed(
                "interface-definition",
                0.0,
                format!("undefined: {}", undefined.join(", ")),
                "Define each provided interface in the interface list",
            ));
        }

        results
    }
}

/// Resolve a dependency to a component by name, or by a provided interface,
/// or by a data structure's manager naming convention.
fn resolve(components: &[Component], dependency: &str) -> Option<String> {
    components
        .iter()
        .find(|c| {
            c.name == dependency
                || c.provided_interfaces.iter().any(|i| i == dependency)
                || c.name == format!("{dependency}Manager")
        })
        .map(|c| c.name.clone())
}

/// Infer a data flow record for a relationship by endpoint roles.
fn flow_for(components: &[Component], relationship: &Relationship) -> DataFlow {
    let role_of = |name: &str| {
        components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.role)
    };
    let from_role = role_of(&relationship.from);
    let to_role = role_of(&relationship.to);

    let (data_type, protocol, frequency) = match (from_role, to_role) {
        (Some(ComponentRole::Gateway), _) => ("Request", "HTTP/REST", "per-request"),
        (Some(ComponentRole::Service), Some(ComponentRole::DataManager))
        | (Some(ComponentRole::DataManager), Some(ComponentRole::Service)) => {
            ("Entity", "TCP/SQL", "per-operation")
        }
        _ => ("Message", "Internal", "ad-hoc"),
    };

    DataFlow {
        from: relationship.from.clone(),
        to: relationship.to.clone(),
        data_type: data_type.to_string(),
        protocol: protocol.to_string(),
        frequency: frequency.to_string(),
    }
}

fn slug(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            out.push('-');
        }
        out.extend(c.to_lowercase());
    }
    out
}
