//! reconciliation::covariance — forecast-error covariance (Ω) estimation.
//!
//! - [`estimator`]: the eleven Ω methods behind [`estimate_omega`].
//! - [`moments`]: residual second moments, pooled level variances, lag-1 ACF.
//! - [`shrink`]: the [`Shrinker`] capability and its two default estimators.
pub mod estimator;
pub mod moments;
pub mod shrink;

pub use self::estimator::{
    CovInputs, CovMethod, CovOutcome, estimate_omega, level_autocorrelations, residual_matrix,
};
pub use self::shrink::{CorrelationShrink, DiagonalTargetShrink, ShrinkOutcome, Shrinker};
