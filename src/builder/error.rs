//! Errors for definition building and validation.

use thiserror::Error;

/// A single problem found while validating a definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Violation {
    #[error("no states declared; the first state is the initial state")]
    NoStates,

    #[error("state '{name}' is declared more than once")]
    DuplicateState { name: String },

    #[error("transition {index} references undeclared state '{state}'")]
    UndeclaredState { index: usize, state: String },
}

/// Errors that can occur when building or validating definitions.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Instance factory not specified. Call .factory(f) before .build()")]
    MissingFactory,

    #[error("invalid definition '{name}': {}", render(.violations))]
    Invalid {
        name: String,
        violations: Vec<Violation>,
    },
}

fn render(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
