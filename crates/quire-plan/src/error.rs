use thiserror::Error;

use crate::unit::UnitId;

/// Errors for malformed unit sets. Ledger failures are never surfaced here:
/// a unit whose state cannot be determined is planned for sending.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("duplicate unit id: {0}")]
    DuplicateUnit(UnitId),

    #[error("unit {unit} depends on unknown unit {dependency}")]
    UnknownDependency { unit: UnitId, dependency: UnitId },

    #[error("dependency cycle through manifest {0}")]
    DependencyCycle(UnitId),
}

pub type PlanResult<T> = Result<T, PlanError>;
