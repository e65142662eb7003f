//! Definition lint.
//!
//! Checks run together and every violation is reported at once, so a
//! broken table can be fixed in one pass.

use crate::builder::error::{DefinitionError, Violation};
use crate::core::State;
use crate::definition::Definition;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Validate a definition, accumulating all violations.
///
/// - the state set is non-empty (its first element is the initial state)
/// - state names are unique, since durable task names are derived from them
/// - every transition starts and ends in a declared state
pub fn validate<D: Definition>(definition: &D) -> Validation<(), NonEmptyVec<Violation>> {
    let states = definition.states();
    let mut checks: Vec<Validation<(), NonEmptyVec<Violation>>> = Vec::new();

    checks.push(if states.is_empty() {
        Validation::fail(Violation::NoStates)
    } else {
        Validation::success(())
    });

    for (i, state) in states.iter().enumerate() {
        let duplicate = states[..i].iter().any(|seen| seen.name() == state.name());
        if duplicate {
            checks.push(Validation::fail(Violation::DuplicateState {
                name: state.name().to_string(),
            }));
        }
    }

    for (index, transition) in definition.transitions().iter().enumerate() {
        for endpoint in [&transition.from, &transition.to] {
            if !states.contains(endpoint) {
                checks.push(Validation::fail(Violation::UndeclaredState {
                    index,
                    state: endpoint.name().to_string(),
                }));
            }
        }
    }

    Validation::all_vec(checks).map(|_| ())
}

/// [`validate`] folded into a `Result`.
pub fn check<D: Definition>(definition: &D) -> Result<(), DefinitionError> {
    match validate(definition) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(violations) => Err(DefinitionError::Invalid {
            name: definition.name().to_string(),
            violations: violations.iter().cloned().collect(),
        }),
    }
}

/// Validate `definition` and return its initial state.
pub fn initial_state<D: Definition>(definition: &D) -> Result<D::State, DefinitionError> {
    check(definition)?;
    definition
        .states()
        .into_iter()
        .next()
        .ok_or_else(|| DefinitionError::Invalid {
            name: definition.name().to_string(),
            violations: vec![Violation::NoStates],
        })
}
