//! Upload planning for Quire.
//!
//! Before anything is written, an [`UploadPlanner`] asks the ledger which
//! units of an upload are already stored with identical content, splitting
//! the upload into units to send and units to skip. Re-uploading unchanged
//! content therefore writes nothing.
//!
//! Leaves are checked fully in parallel. A manifest is skipped only when
//! every unit it depends on is skipped and its own stored content matches:
//! once any dependency must be sent, so must the manifest.

pub mod error;
pub mod planner;
pub mod unit;

pub use error::{PlanError, PlanResult};
pub use planner::UploadPlanner;
pub use unit::{UnitId, UnitKind, UnitPayload, UploadPlan, UploadUnit};
