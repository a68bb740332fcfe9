//! reconciliation::core::options — configuration for temporal reconciliation.
//!
//! Purpose
//! -------
//! Collect every knob of [`reconcile_temporal`](crate::reconciliation::thf::reconcile_temporal)
//! in one explicit value, [`ThfOptions`], together with the closed selector
//! enums it is made of. Nothing here is global: each call receives its own
//! options by reference.
//!
//! Key behaviors
//! -------------
//! - [`CombMethod`] selects bottom-up or one of the covariance-based methods
//!   ([`CovMethod`]); [`SolverForm`], [`SolveMode`], [`NnStrategy`],
//!   [`OutputDetail`] and [`MeanCorrection`] select the remaining behavior.
//! - Every selector implements `FromStr` with case-insensitive codes so the
//!   Python boundary can pass plain strings. Unknown codes return
//!   [`RecoError::InvalidOption`].
//! - [`ResidualInput`] accepts residuals either as an `N × kt` matrix or as a
//!   level-major vector laid out like the base forecasts.
//!
//! Invariants & assumptions
//! ------------------------
//! - Options describe intent only. Shape checks against the temporal
//!   structure (residual columns, Omega dimension, order subsets) happen in
//!   the entry point, before any numerical work.
//! - [`QpSettings`] carried here are expected to be validated already
//!   (via [`QpSettings::new`] or `Default`).
//!
//! Conventions
//! -----------
//! - Defaults follow the usual temporal-reconciliation conventions:
//!   projection form, closed-form solve, no non-negativity, uncentered
//!   residual moments and full output detail.
use std::str::FromStr;

use ndarray::{Array1, Array2};

use crate::{
    qp::QpSettings,
    reconciliation::{
        covariance::CovMethod,
        errors::{RecoError, RecoResult},
    },
};

/// Combination method: bottom-up or a covariance-based GLS/QP reconciliation.
///
/// Parsing accepts `"bu"` plus every [`CovMethod`] code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombMethod {
    BottomUp,
    Covariance(CovMethod),
}

impl CombMethod {
    /// Short code (`"bu"`, `"ols"`, `"shr"`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            CombMethod::BottomUp => "bu",
            CombMethod::Covariance(method) => method.code(),
        }
    }
}

impl FromStr for CombMethod {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("bu") {
            return Ok(CombMethod::BottomUp);
        }
        s.parse::<CovMethod>().map(CombMethod::Covariance).map_err(|_| RecoError::InvalidOption {
            name: s.to_string(),
            reason: "Valid comb codes are bu, ols, struc, wlsv, wlsh, acov, strar1, sar1, har1, shr, sam, omega.",
        })
    }
}

/// Closed-form representation used for the GLS solve.
///
/// - `Projection`: `M = R (Rᵀ Ω⁻¹ R)⁻¹ Rᵀ Ω⁻¹` (code `"projection"`, alias `"proj"`).
/// - `Structural`: `G = I − Ω Ztᵀ (Zt Ω Ztᵀ)⁻¹ Zt` (code `"structural"`, alias `"struc"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverForm {
    #[default]
    Projection,
    Structural,
}

impl FromStr for SolverForm {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "projection" | "proj" => Ok(SolverForm::Projection),
            "structural" | "struc" => Ok(SolverForm::Structural),
            _ => Err(RecoError::InvalidOption {
                name: s.to_string(),
                reason: "Valid forms are 'projection' or 'structural'.",
            }),
        }
    }
}

/// How each horizon is solved.
///
/// - `ClosedForm`: linear projection (`"closed"`, alias `"lin"`).
/// - `Qp`: quadratic program for every horizon (`"qp"`, alias `"osqp"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveMode {
    #[default]
    ClosedForm,
    Qp,
}

impl FromStr for SolveMode {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "closed" | "lin" | "closedform" => Ok(SolveMode::ClosedForm),
            "qp" | "osqp" => Ok(SolveMode::Qp),
            _ => Err(RecoError::InvalidOption {
                name: s.to_string(),
                reason: "Valid solve modes are 'closed' or 'qp'.",
            }),
        }
    }
}

/// Correction applied to horizons with negative closed-form values.
///
/// - `Qp`: re-solve the whole horizon with a bounded QP (`"qp"`, alias `"osqp"`).
/// - `SetNegativeToZero`: zero negative base-level values and re-aggregate
///   (`"sntz"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NnStrategy {
    #[default]
    Qp,
    SetNegativeToZero,
}

impl FromStr for NnStrategy {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qp" | "osqp" => Ok(NnStrategy::Qp),
            "sntz" => Ok(NnStrategy::SetNegativeToZero),
            _ => Err(RecoError::InvalidOption {
                name: s.to_string(),
                reason: "Valid non-negativity strategies are 'qp' or 'sntz'.",
            }),
        }
    }
}

/// Amount of detail kept in the outcome.
///
/// `Summary` drops Omega and the solver matrices; warnings, diagnostics and
/// checks are always kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputDetail {
    #[default]
    Full,
    Summary,
}

impl FromStr for OutputDetail {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(OutputDetail::Full),
            "summary" => Ok(OutputDetail::Summary),
            _ => Err(RecoError::InvalidOption {
                name: s.to_string(),
                reason: "Valid output details are 'full' or 'summary'.",
            }),
        }
    }
}

/// Second-moment convention for residual-based covariance estimates.
///
/// - `Uncentered`: `EᵀE / N` (`"uncentered"`, or `"true"` for the boolean
///   `mean_correction` flag).
/// - `Unbiased`: column-centered, divided by `N − 1` (`"unbiased"` or
///   `"false"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeanCorrection {
    #[default]
    Uncentered,
    Unbiased,
}

impl FromStr for MeanCorrection {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uncentered" | "true" => Ok(MeanCorrection::Uncentered),
            "unbiased" | "false" => Ok(MeanCorrection::Unbiased),
            _ => Err(RecoError::InvalidOption {
                name: s.to_string(),
                reason: "Valid mean corrections are 'uncentered' or 'unbiased'.",
            }),
        }
    }
}

/// In-sample residuals for covariance estimation.
///
/// - `Matrix`: `N × kt`, one row per historical top cycle in stacked order.
/// - `Stacked`: level-major vector of length `N·kt` (same layout as the base
///   forecasts).
#[derive(Debug, Clone, PartialEq)]
pub enum ResidualInput {
    Matrix(Array2<f64>),
    Stacked(Array1<f64>),
}

/// ThfOptions — configuration for one temporal reconciliation call.
///
/// Fields
/// ------
/// - `comb`: combination method (no default; chosen in [`ThfOptions::new`]).
/// - `residuals`: optional in-sample residuals.
/// - `mean_correction`: residual moment convention (default `Uncentered`).
/// - `use_shrink_library`: use the correlation-shrink estimator for `shr`.
/// - `omega`: user weighting matrix for `comb = omega`.
/// - `form`: closed-form representation (default `Projection`).
/// - `solve_mode`: closed form or QP per horizon (default `ClosedForm`).
/// - `enforce_nonnegative`: keep base-level values ≥ 0 (default `false`).
/// - `nn_strategy`: correction used after a closed-form solve (default `Qp`).
/// - `output_detail`: `Full` or `Summary` (default `Full`).
/// - `qp_settings`: settings for every QP solve.
/// - `orders`: optional subset of the divisors of `m` (must contain `m` and `1`).
#[derive(Debug, Clone, PartialEq)]
pub struct ThfOptions {
    pub comb: CombMethod,
    pub residuals: Option<ResidualInput>,
    pub mean_correction: MeanCorrection,
    pub use_shrink_library: bool,
    pub omega: Option<Array2<f64>>,
    pub form: SolverForm,
    pub solve_mode: SolveMode,
    pub enforce_nonnegative: bool,
    pub nn_strategy: NnStrategy,
    pub output_detail: OutputDetail,
    pub qp_settings: QpSettings,
    pub orders: Option<Vec<usize>>,
}

impl ThfOptions {
    /// Options for `comb` with every other field at its default.
    pub fn new(comb: CombMethod) -> Self {
        Self {
            comb,
            residuals: None,
            mean_correction: MeanCorrection::default(),
            use_shrink_library: false,
            omega: None,
            form: SolverForm::default(),
            solve_mode: SolveMode::default(),
            enforce_nonnegative: false,
            nn_strategy: NnStrategy::default(),
            output_detail: OutputDetail::default(),
            qp_settings: QpSettings::default(),
            orders: None,
        }
    }

    /// Parse `comb` from its code and build default options.
    ///
    /// # Errors
    /// - [`RecoError::InvalidOption`] for an unknown code.
    pub fn from_code(comb: &str) -> RecoResult<Self> {
        Ok(Self::new(comb.parse()?))
    }

    pub fn with_residual_matrix(mut self, residuals: Array2<f64>) -> Self {
        self.residuals = Some(ResidualInput::Matrix(residuals));
        self
    }

    pub fn with_stacked_residuals(mut self, residuals: Array1<f64>) -> Self {
        self.residuals = Some(ResidualInput::Stacked(residuals));
        self
    }

    pub fn with_omega(mut self, omega: Array2<f64>) -> Self {
        self.omega = Some(omega);
        self
    }

    pub fn with_form(mut self, form: SolverForm) -> Self {
        self.form = form;
        self
    }

    pub fn with_solve_mode(mut self, mode: SolveMode) -> Self {
        self.solve_mode = mode;
        self
    }

    /// Enforce non-negativity with the given correction strategy.
    pub fn with_nonnegative(mut self, strategy: NnStrategy) -> Self {
        self.enforce_nonnegative = true;
        self.nn_strategy = strategy;
        self
    }

    pub fn with_mean_correction(mut self, correction: MeanCorrection) -> Self {
        self.mean_correction = correction;
        self
    }

    pub fn with_shrink_library(mut self, enabled: bool) -> Self {
        self.use_shrink_library = enabled;
        self
    }

    pub fn with_output_detail(mut self, detail: OutputDetail) -> Self {
        self.output_detail = detail;
        self
    }

    pub fn with_qp_settings(mut self, settings: QpSettings) -> Self {
        self.qp_settings = settings;
        self
    }

    pub fn with_orders(mut self, orders: Vec<usize>) -> Self {
        self.orders = Some(orders);
        self
    }
}
