//! reconciliation::core — structure, layout, options and input guards.
//!
//! These modules hold everything the numerical stages share: the temporal
//! aggregation structure, the level-major ↔ horizon-matrix layout, the
//! configuration surface and the cheap precondition checks.
pub mod layout;
pub mod options;
pub mod structure;
pub mod validation;
