//! Builder API and validation for definitions.
//!
//! Definitions can be written by hand as `Definition` impls or assembled
//! with [`DefinitionBuilder`]. Either way, [`validate`] checks the table
//! before an engine or durable job runs it.

pub mod error;
pub mod macros;
pub mod table;
pub mod validate;

pub use error::{DefinitionError, Violation};
pub use table::{DefinitionBuilder, TableDefinition};
pub use validate::{check, initial_state, validate};
