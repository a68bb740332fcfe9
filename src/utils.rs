//! Python-boundary helpers: array extraction and option building for the
//! `ThfRec` binding.
#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyTypeError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    qp::QpSettings,
    reconciliation::{
        core::options::{
            MeanCorrection, NnStrategy, OutputDetail, SolveMode, SolverForm, ThfOptions,
        },
        errors::RecoError,
    },
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1, PyReadonlyArray2,
};

/// Accept a 1-D numpy array, a pandas Series, or any float sequence.
#[cfg(feature = "python-bindings")]
pub fn extract_vector<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Array1<f64>> {
    let arr: PyReadonlyArray1<'py, f64> =
        if let Ok(arr_ro) = raw.extract::<PyReadonlyArray1<f64>>() {
            arr_ro
        } else if let Ok(series_ro) = raw
            .call_method("to_numpy", (false,), None)
            .and_then(|obj| obj.extract::<PyReadonlyArray1<f64>>())
        {
            series_ro
        } else {
            let vec: Vec<f64> = raw.extract().map_err(|_| {
                PyTypeError::new_err(format!(
                    "{name} must be a 1-D numpy.ndarray, pandas.Series, or sequence of float64"
                ))
            })?;
            vec.into_pyarray(py).readonly()
        };
    Ok(arr.as_array().to_owned())
}

/// Accept a 2-D numpy array (or pandas DataFrame) of float64.
#[cfg(feature = "python-bindings")]
pub fn extract_matrix<'py>(raw: &Bound<'py, PyAny>, name: &str) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }
    if let Ok(frame_ro) = raw
        .call_method("to_numpy", (), None)
        .and_then(|obj| obj.extract::<PyReadonlyArray2<f64>>())
    {
        return Ok(frame_ro.as_array().to_owned());
    }
    Err(PyTypeError::new_err(format!("{name} must be a 2-D float64 numpy.ndarray or DataFrame")))
}

/// Build [`ThfOptions`] from the string codes used by the Python API.
///
/// `res` may be a 2-D `N × kt` matrix or a level-major vector.
#[cfg(feature = "python-bindings")]
pub fn build_thf_options<'py>(
    py: Python<'py>, comb: &str, res: Option<&Bound<'py, PyAny>>, mean_correction: &str,
    shrink_library: bool, omega: Option<&Bound<'py, PyAny>>, form: &str, solve: &str,
    nonnegative: bool, nn_strategy: &str, detail: &str, qp_settings: QpSettings,
) -> PyResult<ThfOptions> {
    let mut options = ThfOptions::from_code(comb)?
        .with_mean_correction(mean_correction.parse::<MeanCorrection>()?)
        .with_shrink_library(shrink_library)
        .with_form(form.parse::<SolverForm>()?)
        .with_solve_mode(solve.parse::<SolveMode>()?)
        .with_output_detail(detail.parse::<OutputDetail>()?)
        .with_qp_settings(qp_settings);

    if nonnegative {
        options = options.with_nonnegative(nn_strategy.parse::<NnStrategy>()?);
    }
    if let Some(raw) = res {
        options = match raw.extract::<PyReadonlyArray2<f64>>() {
            Ok(mat) => options.with_residual_matrix(mat.as_array().to_owned()),
            Err(_) => options.with_stacked_residuals(extract_vector(py, raw, "res")?),
        };
    }
    if let Some(raw) = omega {
        options = options.with_omega(extract_matrix(raw, "omega")?);
    }
    Ok(options)
}

/// Build [`QpSettings`], falling back to the defaults for `None` entries.
#[cfg(feature = "python-bindings")]
pub fn build_qp_settings(
    eps_abs: Option<f64>, eps_rel: Option<f64>, polish: Option<bool>,
    polish_refine_iter: Option<usize>, max_iter: Option<usize>, time_limit: Option<f64>,
) -> PyResult<QpSettings> {
    let defaults = QpSettings::default();
    let settings = QpSettings::new(
        eps_abs.unwrap_or(defaults.eps_abs),
        eps_rel.unwrap_or(defaults.eps_rel),
        polish.unwrap_or(defaults.polish),
        polish_refine_iter.unwrap_or(defaults.polish_refine_iter),
        max_iter.unwrap_or(defaults.max_iter),
    )
    .map_err(RecoError::from)?;

    match time_limit {
        Some(secs) if secs.is_finite() && secs > 0.0 => {
            Ok(settings.with_time_limit(std::time::Duration::from_secs_f64(secs)))
        }
        Some(_) => Err(pyo3::exceptions::PyValueError::new_err("time_limit must be positive")),
        None => Ok(settings),
    }
}
