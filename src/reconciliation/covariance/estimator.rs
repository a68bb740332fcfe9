//! reconciliation::covariance::estimator — Omega estimation for temporal GLS.
//!
//! Purpose
//! -------
//! Build the `kt × kt` weighting matrix Ω used by the projection and
//! structural solvers, under one of eleven modeling assumptions selected by
//! [`CovMethod`].
//!
//! Key behaviors
//! -------------
//! - Residual-free methods (`ols`, `struc`, `omega`) never look at residuals.
//! - Residual methods read an `N × kt` matrix in stacked order and honour the
//!   [`MeanCorrection`] convention.
//! - AR(1) methods estimate one lag-1 autocorrelation per aggregation order
//!   on the order's residuals in time order and scale Toeplitz blocks by the
//!   square root of the chosen diagonal.
//! - Short histories raise [`RecoWarning::SingularityRisk`] instead of
//!   failing: `N < kt` for `sam`, `N < m` for `acov`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The returned Ω is symmetric with non-negative diagonal.
//! - Shape and finiteness of residuals are checked here, before any moment
//!   is computed.
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView2, s};

use crate::{
    linalg::{ar1_correlation, block_diag, diag_from, scale_correlation},
    reconciliation::{
        core::{
            layout::to_horizon_matrix,
            options::{MeanCorrection, ResidualInput},
            structure::TemporalStructure,
            validation::{validate_finite, validate_finite_matrix},
        },
        covariance::{
            moments::{lag1_autocorrelation, level_series, pooled_level_variances, second_moment},
            shrink::Shrinker,
        },
        errors::{RecoError, RecoResult, RecoWarning},
    },
};

/// Covariance modeling assumption for Ω.
///
/// Codes (case-insensitive): `ols`, `struc`, `wlsv`, `wlsh`, `acov`,
/// `strar1`, `sar1`, `har1`, `shr`, `sam`, `omega`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovMethod {
    Identity,
    StructuralScaling,
    LevelVariance,
    NodeVariance,
    BlockAutocovariance,
    StructuralAr1,
    LevelAr1,
    NodeAr1,
    Shrink,
    Sample,
    User,
}

impl CovMethod {
    pub fn code(&self) -> &'static str {
        match self {
            CovMethod::Identity => "ols",
            CovMethod::StructuralScaling => "struc",
            CovMethod::LevelVariance => "wlsv",
            CovMethod::NodeVariance => "wlsh",
            CovMethod::BlockAutocovariance => "acov",
            CovMethod::StructuralAr1 => "strar1",
            CovMethod::LevelAr1 => "sar1",
            CovMethod::NodeAr1 => "har1",
            CovMethod::Shrink => "shr",
            CovMethod::Sample => "sam",
            CovMethod::User => "omega",
        }
    }

    /// Whether the method reads in-sample residuals.
    pub fn needs_residuals(&self) -> bool {
        !matches!(self, CovMethod::Identity | CovMethod::StructuralScaling | CovMethod::User)
    }
}

impl FromStr for CovMethod {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ols" => Ok(CovMethod::Identity),
            "struc" => Ok(CovMethod::StructuralScaling),
            "wlsv" => Ok(CovMethod::LevelVariance),
            "wlsh" => Ok(CovMethod::NodeVariance),
            "acov" => Ok(CovMethod::BlockAutocovariance),
            "strar1" => Ok(CovMethod::StructuralAr1),
            "sar1" => Ok(CovMethod::LevelAr1),
            "har1" => Ok(CovMethod::NodeAr1),
            "shr" => Ok(CovMethod::Shrink),
            "sam" => Ok(CovMethod::Sample),
            "omega" => Ok(CovMethod::User),
            _ => Err(RecoError::InvalidOption {
                name: s.to_string(),
                reason: "Valid covariance codes are ols, struc, wlsv, wlsh, acov, strar1, sar1, har1, shr, sam, omega.",
            }),
        }
    }
}

/// Estimated Ω with the advisory conditions met along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct CovOutcome {
    pub omega: Array2<f64>,
    pub warnings: Vec<RecoWarning>,
    /// Shrinkage intensity, reported for `shr` only.
    pub shrinkage: Option<f64>,
}

/// Inputs to [`estimate_omega`] beyond the structure and method.
#[derive(Clone, Copy)]
pub struct CovInputs<'a> {
    pub residuals: Option<ArrayView2<'a, f64>>,
    pub user_omega: Option<ArrayView2<'a, f64>>,
    pub mean_correction: MeanCorrection,
    pub shrinker: &'a dyn Shrinker,
}

/// Normalize residual input into an `N × kt` matrix and check it.
///
/// # Errors
/// - `ShapeMismatch` for a stacked vector whose length is not a multiple of `kt`.
/// - `ResidualShapeMismatch` for a matrix with the wrong column count.
/// - `NonFiniteInput` for NaN/∞ entries.
pub fn residual_matrix(
    structure: &TemporalStructure, input: &ResidualInput,
) -> RecoResult<Array2<f64>> {
    match input {
        ResidualInput::Stacked(values) => {
            let flat = values.to_vec();
            validate_finite("residuals", &flat)?;
            to_horizon_matrix(structure, &flat, "residuals")
        }
        ResidualInput::Matrix(mat) => {
            if mat.ncols() != structure.kt() {
                return Err(RecoError::ResidualShapeMismatch {
                    expected_cols: structure.kt(),
                    found_cols: mat.ncols(),
                });
            }
            validate_finite_matrix("residuals", mat.view())?;
            Ok(mat.clone())
        }
    }
}

/// Estimate Ω for `method`.
///
/// # Errors
/// - [`RecoError::MissingResiduals`] when a residual method receives none.
/// - [`RecoError::MissingOmega`] / [`RecoError::OmegaShapeMismatch`] for `omega`.
/// - [`RecoError::InsufficientResiduals`] when the moment convention needs
///   more periods than supplied.
pub fn estimate_omega(
    structure: &TemporalStructure, method: CovMethod, inputs: CovInputs<'_>,
) -> RecoResult<CovOutcome> {
    let kt = structure.kt();
    let mut warnings = Vec::new();
    let mut shrinkage = None;

    let residuals = if method.needs_residuals() {
        let e = inputs.residuals.ok_or(RecoError::MissingResiduals { method: method.code() })?;
        if e.ncols() != kt {
            return Err(RecoError::ResidualShapeMismatch { expected_cols: kt, found_cols: e.ncols() });
        }
        Some(e)
    } else {
        None
    };

    let omega = match (method, residuals) {
        (CovMethod::Identity, _) => Array2::<f64>::eye(kt),
        (CovMethod::StructuralScaling, _) => diag_from(&structure.row_sums()),
        (CovMethod::User, _) => {
            let omega = inputs.user_omega.ok_or(RecoError::MissingOmega)?;
            if omega.dim() != (kt, kt) {
                return Err(RecoError::OmegaShapeMismatch { expected: kt, found: omega.dim() });
            }
            validate_finite_matrix("omega", omega)?;
            omega.to_owned()
        }
        (CovMethod::LevelVariance, Some(e)) => {
            diag_from(&pooled_level_variances(structure, e, inputs.mean_correction)?)
        }
        (CovMethod::NodeVariance, Some(e)) => {
            diag_from(&second_moment(e, inputs.mean_correction)?.diag().to_owned())
        }
        (CovMethod::BlockAutocovariance, Some(e)) => {
            if e.nrows() < structure.m() {
                warnings.push(RecoWarning::SingularityRisk {
                    method: method.code(),
                    periods: e.nrows(),
                    required: structure.m(),
                });
            }
            within_level_blocks(structure, &second_moment(e, inputs.mean_correction)?)
        }
        (CovMethod::StructuralAr1, Some(e)) => ar1_omega(structure, e, &structure.row_sums()),
        (CovMethod::LevelAr1, Some(e)) => {
            let d = pooled_level_variances(structure, e, inputs.mean_correction)?;
            ar1_omega(structure, e, &d)
        }
        (CovMethod::NodeAr1, Some(e)) => {
            let d = second_moment(e, inputs.mean_correction)?.diag().to_owned();
            ar1_omega(structure, e, &d)
        }
        (CovMethod::Shrink, Some(e)) => {
            let out = inputs.shrinker.shrink(e, inputs.mean_correction)?;
            shrinkage = Some(out.lambda);
            out.covariance
        }
        (CovMethod::Sample, Some(e)) => {
            if e.nrows() < kt {
                warnings.push(RecoWarning::SingularityRisk {
                    method: method.code(),
                    periods: e.nrows(),
                    required: kt,
                });
            }
            second_moment(e, inputs.mean_correction)?
        }
        (_, None) => return Err(RecoError::MissingResiduals { method: method.code() }),
    };

    Ok(CovOutcome { omega, warnings, shrinkage })
}

/// Lag-1 autocorrelation per aggregation order (in `kset` order).
pub fn level_autocorrelations(
    structure: &TemporalStructure, residuals: ArrayView2<'_, f64>,
) -> Vec<f64> {
    (0..structure.kset().len())
        .map(|level| lag1_autocorrelation(&level_series(structure, residuals, level)))
        .collect()
}

// ---- Helper Methods ----

fn within_level_blocks(structure: &TemporalStructure, full: &Array2<f64>) -> Array2<f64> {
    let offsets = structure.level_offsets();
    let blocks: Vec<Array2<f64>> = structure
        .kset()
        .iter()
        .zip(offsets.iter())
        .map(|(&k, &start)| {
            let n = structure.block_size(k);
            full.slice(s![start..start + n, start..start + n]).to_owned()
        })
        .collect();
    block_diag(&blocks)
}

fn ar1_omega(
    structure: &TemporalStructure, residuals: ArrayView2<'_, f64>, diagonal: &Array1<f64>,
) -> Array2<f64> {
    let rhos = level_autocorrelations(structure, residuals);
    let blocks: Vec<Array2<f64>> = structure
        .kset()
        .iter()
        .zip(rhos.iter())
        .map(|(&k, &rho)| ar1_correlation(rho, structure.block_size(k)))
        .collect();
    scale_correlation(&block_diag(&blocks), diagonal)
}
