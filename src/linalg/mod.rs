//! linalg — small dense linear-algebra capability used by reconciliation.
//!
//! Purpose
//! -------
//! Collect the handful of matrix utilities the reconciliation engine needs:
//! an `ndarray` ↔ `nalgebra` bridge with an SVD-based robust inverse, and
//! dense block builders (block-diagonal stacking, AR(1) Toeplitz blocks,
//! diagonal scaling).
//!
//! Conventions
//! -----------
//! - Data lives in `ndarray`; factorizations run on `nalgebra`.
//! - Temporal hierarchies are small (`kt ≤ 28` for monthly data), so every
//!   matrix is stored densely.
//! - Nothing here performs I/O or returns errors; callers validate inputs.

pub mod blocks;
pub mod bridge;

pub use self::blocks::{ar1_correlation, block_diag, diag_from, scale_correlation};
pub use self::bridge::{Inverse, SINGULAR_RCOND, from_dmatrix, robust_inverse, to_dmatrix};
