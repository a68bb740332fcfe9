//! Solver configuration for the QP layer.
//!
//! [`QpSettings`] is an explicit value passed to every solve. There is no
//! global default object: each call site either builds one with
//! [`QpSettings::new`] (validated) or uses [`QpSettings::default`].
use std::time::Duration;

use crate::qp::errors::{QpError, QpResult};

/// Operator-splitting QP solver settings.
///
/// Fields:
/// - `eps_abs`, `eps_rel`: absolute/relative tolerances on the primal and
///   dual residuals (∞-norm).
/// - `max_iter`: hard cap on ADMM iterations.
/// - `polish`: attempt an active-set polish after convergence.
/// - `polish_refine_iter`: iterative-refinement steps in the polish solve.
/// - `rho`, `sigma`, `alpha`: ADMM step size, proximal regularization and
///   over-relaxation parameter.
/// - `time_limit`: optional wall-clock budget per solve.
/// - `verbose`: attach a terminal observer (behind `obs_slog`).
///
/// Default:
/// - `eps_abs = 1e-5`, `eps_rel = 1e-5`, `max_iter = 10_000`
/// - `polish = true`, `polish_refine_iter = 100`
/// - `rho = 0.1`, `sigma = 1e-6`, `alpha = 1.6`
/// - `time_limit = None`, `verbose = false`
#[derive(Debug, Clone, PartialEq)]
pub struct QpSettings {
    pub eps_abs: f64,
    pub eps_rel: f64,
    pub max_iter: usize,
    pub polish: bool,
    pub polish_refine_iter: usize,
    pub rho: f64,
    pub sigma: f64,
    pub alpha: f64,
    pub time_limit: Option<Duration>,
    pub verbose: bool,
}

impl QpSettings {
    /// Construct validated settings with default ADMM internals.
    ///
    /// # Rules
    /// - `eps_abs` and `eps_rel` must be finite and non-negative, and not both zero.
    /// - `max_iter` must be `> 0`.
    ///
    /// # Errors
    /// - [`QpError::InvalidSetting`] naming the offending field.
    pub fn new(
        eps_abs: f64, eps_rel: f64, polish: bool, polish_refine_iter: usize, max_iter: usize,
    ) -> QpResult<Self> {
        let settings = Self { eps_abs, eps_rel, polish, polish_refine_iter, max_iter, ..Self::default() };
        settings.validate()?;
        Ok(settings)
    }

    /// Set the ADMM internals `(rho, sigma, alpha)`.
    ///
    /// # Errors
    /// - [`QpError::InvalidSetting`] if `rho` or `sigma` is not positive and
    ///   finite, or if `alpha` lies outside `(0, 2)`.
    pub fn with_admm(mut self, rho: f64, sigma: f64, alpha: f64) -> QpResult<Self> {
        self.rho = rho;
        self.sigma = sigma;
        self.alpha = alpha;
        self.validate()?;
        Ok(self)
    }

    /// Set a wall-clock budget per solve.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Check every field against its admissible range.
    pub fn validate(&self) -> QpResult<()> {
        verify_tolerance("eps_abs", self.eps_abs)?;
        verify_tolerance("eps_rel", self.eps_rel)?;
        if self.eps_abs == 0.0 && self.eps_rel == 0.0 {
            return Err(QpError::InvalidSetting {
                name: "eps_abs",
                value: 0.0,
                reason: "At least one of eps_abs and eps_rel must be positive.",
            });
        }
        if self.max_iter == 0 {
            return Err(QpError::InvalidSetting {
                name: "max_iter",
                value: 0.0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        verify_positive("rho", self.rho)?;
        verify_positive("sigma", self.sigma)?;
        if !(self.alpha > 0.0 && self.alpha < 2.0) {
            return Err(QpError::InvalidSetting {
                name: "alpha",
                value: self.alpha,
                reason: "Relaxation parameter must lie in (0, 2).",
            });
        }
        Ok(())
    }
}

impl Default for QpSettings {
    fn default() -> Self {
        Self {
            eps_abs: 1e-5,
            eps_rel: 1e-5,
            max_iter: 10_000,
            polish: true,
            polish_refine_iter: 100,
            rho: 0.1,
            sigma: 1e-6,
            alpha: 1.6,
            time_limit: None,
            verbose: false,
        }
    }
}

// ---- Helper Methods ----

fn verify_tolerance(name: &'static str, value: f64) -> QpResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(QpError::InvalidSetting {
            name,
            value,
            reason: "Tolerance must be finite and non-negative.",
        });
    }
    Ok(())
}

fn verify_positive(name: &'static str, value: f64) -> QpResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(QpError::InvalidSetting {
            name,
            value,
            reason: "Value must be finite and strictly positive.",
        });
    }
    Ok(())
}
