//! Core types for configuration data.
//!
//! This module provides the data model shared by every other part of the
//! crate: parameter values and metadata, scope identifiers, and the wire
//! types exchanged with the daemon's batch endpoint.
//!
//! ## Usage Example
//!
//! ```rust
//! use motionctl::types::{ApplyOutcome, OutcomeKind, ParamValue, Scope};
//!
//! let scope: Scope = "camera:2".parse().unwrap();
//! assert_eq!(scope.id(), 2);
//!
//! let value = ParamValue::from(80);
//! assert_eq!(value.to_candidate(), "80");
//!
//! let outcome = ApplyOutcome::restart_required("movie_container");
//! assert_eq!(outcome.kind(), OutcomeKind::RestartRequired);
//! ```

mod outcome;
mod param;
mod scope;
mod value;

pub use outcome::{
    ApplyOutcome, BatchRequest, BatchResponse, BatchSummary, OutcomeKind, PendingBatch,
};
pub use param::{ParamType, Parameter};
pub use scope::Scope;
pub use value::ParamValue;
pub(crate) use value::parse_bool;
