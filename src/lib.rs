//! rust_temporal_hierarchy — temporal-hierarchy forecast reconciliation with
//! Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! temporal reconciliation to Python via the `_rust_temporal_hierarchy`
//! extension module. When the `python-bindings` feature is enabled, this
//! module defines the Python-facing class and the `reconciliation` submodule
//! used by the `rust_temporal_hierarchy` package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`reconciliation`, `qp`, `linalg`) as
//!   the public crate surface.
//! - Define the `ThfRec` `#[pyclass]` wrapper and the `#[pymodule]`
//!   initializer for the `_rust_temporal_hierarchy` Python extension.
//! - Register the `reconciliation` submodule under `rust_temporal_hierarchy`
//!   so that dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in the inner Rust modules; this file
//!   performs only FFI glue, option parsing and error mapping.
//! - The Python-visible constructor mirrors
//!   [`reconcile_temporal`](reconciliation::reconcile_temporal), with string
//!   codes for every selector.
//!
//! Conventions
//! -----------
//! - Python-exposed classes live under `_rust_temporal_hierarchy.<submodule>`
//!   and are wrapped by thin pure-Python facades in the top-level package.
//! - Vector layouts follow [`reconciliation`]: level-major, order `m` first.
//! - Errors from core Rust code are propagated as rich error types internally
//!   and converted to `PyErr` (`ValueError`) at the PyO3 boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`reconciliation`] directly and can
//!   ignore the PyO3 items guarded by the `python-bindings` feature.
//! - The Python packaging layer imports `_rust_temporal_hierarchy` and wraps
//!   `ThfRec` in its user-facing API.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in the inner modules and by
//!   `tests/integration_thf_pipeline.rs`.
//! - The bindings are exercised from Python against the built extension.

pub mod linalg;
pub mod qp;
pub mod reconciliation;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    reconciliation::{
        core::validation::validate_frequency, outcome::ThfOutcome, thf::reconcile_temporal,
    },
    utils::{build_qp_settings, build_thf_options, extract_vector},
};

/// ThfRec — Python-facing wrapper for one temporal reconciliation.
///
/// Purpose
/// -------
/// Run [`reconcile_temporal`] from Python arguments and expose the resulting
/// [`ThfOutcome`] through read-only properties.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `ThfRec(basef, m, comb, res=None, mean_correction="uncentered", ...)`:
/// - `basef`: level-major base forecasts (1-D array-like of float64).
/// - `m`: top frequency; must be a positive integer.
/// - `comb`: `"bu"`, `"ols"`, `"struc"`, `"wlsv"`, `"wlsh"`, `"acov"`,
///   `"strar1"`, `"sar1"`, `"har1"`, `"shr"`, `"sam"` or `"omega"`.
/// - `res`: residuals as an `N × kt` matrix or a level-major vector.
/// - `mean_correction`: `"uncentered"` or `"unbiased"`.
/// - `shrink_library`: use the correlation-shrink estimator for `"shr"`.
/// - `omega`: `kt × kt` matrix for `comb="omega"`.
/// - `form`: `"projection"` or `"structural"`.
/// - `solve`: `"closed"` or `"qp"`.
/// - `nonnegative`, `nn_strategy` (`"qp"` or `"sntz"`).
/// - `detail`: `"full"` or `"summary"`.
/// - `eps_abs`, `eps_rel`, `polish`, `polish_refine_iter`, `max_iter`,
///   `time_limit` (seconds): QP settings; `None` keeps the defaults.
///
/// Fields
/// ------
/// - `inner`: [`ThfOutcome`] of the call.
///
/// Notes
/// -----
/// - Native Rust code should call [`reconcile_temporal`] directly.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_temporal_hierarchy.reconciliation")]
pub struct ThfRec {
    inner: ThfOutcome,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl ThfRec {
    #[new]
    #[pyo3(
        signature = (
            basef,
            m,
            comb,
            res = None,
            mean_correction = "uncentered",
            shrink_library = false,
            omega = None,
            form = "projection",
            solve = "closed",
            nonnegative = false,
            nn_strategy = "qp",
            detail = "full",
            eps_abs = None,
            eps_rel = None,
            polish = None,
            polish_refine_iter = None,
            max_iter = None,
            time_limit = None,
        ),
        text_signature = "(basef, m, comb, /, res=None, mean_correction='uncentered', \
                          shrink_library=False, omega=None, form='projection', solve='closed', \
                          nonnegative=False, nn_strategy='qp', detail='full', eps_abs=None, \
                          eps_rel=None, polish=None, polish_refine_iter=None, max_iter=None, \
                          time_limit=None)"
    )]
    pub fn new<'py>(
        py: Python<'py>, basef: &Bound<'py, PyAny>, m: f64, comb: &str,
        res: Option<&Bound<'py, PyAny>>, mean_correction: &str, shrink_library: bool,
        omega: Option<&Bound<'py, PyAny>>, form: &str, solve: &str, nonnegative: bool,
        nn_strategy: &str, detail: &str, eps_abs: Option<f64>, eps_rel: Option<f64>,
        polish: Option<bool>, polish_refine_iter: Option<usize>, max_iter: Option<usize>,
        time_limit: Option<f64>,
    ) -> PyResult<Self> {
        let m = validate_frequency(m)?;
        let base = extract_vector(py, basef, "basef")?;
        let qp_settings =
            build_qp_settings(eps_abs, eps_rel, polish, polish_refine_iter, max_iter, time_limit)?;
        let options = build_thf_options(
            py,
            comb,
            res,
            mean_correction,
            shrink_library,
            omega,
            form,
            solve,
            nonnegative,
            nn_strategy,
            detail,
            qp_settings,
        )?;
        let base = base.to_vec();
        let inner = py.allow_threads(|| reconcile_temporal(&base, m, &options))?;
        Ok(ThfRec { inner })
    }

    /// Reconciled forecasts, level-major.
    #[getter]
    pub fn recf(&self) -> Vec<f64> {
        self.inner.reconciled.to_vec()
    }

    /// `"k{k} h{j}"` label of every reconciled value.
    #[getter]
    pub fn labels(&self) -> Vec<String> {
        self.inner.labels.clone()
    }

    /// Aggregation orders, descending.
    #[getter]
    pub fn kset(&self) -> Vec<usize> {
        self.inner.kset().to_vec()
    }

    /// Weighting matrix used (row-major), `None` for bottom-up or summary detail.
    #[getter]
    pub fn omega(&self) -> Option<Vec<Vec<f64>>> {
        self.inner.omega.as_ref().map(|o| o.outer_iter().map(|row| row.to_vec()).collect())
    }

    /// Number of negative values before any correction.
    #[getter]
    pub fn nn_check(&self) -> usize {
        self.inner.negative_count
    }

    #[getter]
    pub fn rec_check(&self) -> bool {
        self.inner.rec_check
    }

    #[getter]
    pub fn warnings(&self) -> Vec<String> {
        self.inner.warnings.iter().map(|w| w.to_string()).collect()
    }

    /// Per-horizon QP diagnostics as tuples
    /// `(horizon, status, polish, iterations, prim_res, dual_res, objective, run_time_s)`.
    #[getter]
    pub fn info(&self) -> Vec<(usize, String, String, u64, f64, f64, f64, f64)> {
        self.inner
            .qp_diagnostics
            .iter()
            .map(|d| {
                (
                    d.horizon,
                    d.status.to_string(),
                    d.polish.to_string(),
                    d.iterations,
                    d.primal_residual,
                    d.dual_residual,
                    d.objective,
                    d.run_time.as_secs_f64(),
                )
            })
            .collect()
    }

    /// Reconciled series of aggregation order `k`, or `None` if absent.
    pub fn level(&self, k: usize) -> Option<Vec<f64>> {
        self.inner.level(k).map(|v| v.to_vec())
    }
}

/// Define the `_rust_temporal_hierarchy` Python module and register its
/// `reconciliation` submodule.
///
/// Errors
/// ------
/// - `PyErr`
///   If creating the submodule or manipulating `sys.modules` fails.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_temporal_hierarchy<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let reconciliation_mod = PyModule::new(_py, "reconciliation")?;
    reconciliation(_py, m, &reconciliation_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("rust_temporal_hierarchy.reconciliation", reconciliation_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn reconciliation<'py>(
    _py: Python, parent: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<ThfRec>()?;
    parent.add_submodule(m)?;
    Ok(())
}
