//! reconciliation::core::structure — temporal aggregation structure.
//!
//! Purpose
//! -------
//! Derive everything the reconciliation engine needs to know about a
//! temporal hierarchy from its top frequency `m`: the aggregation orders,
//! per-level block sizes, the aggregation matrix `K`, the summing matrix
//! `R = [K; I_m]` and the zero-constraint matrix `Zt = [I_{k*} | −K]`.
//!
//! Key behaviors
//! -------------
//! - [`TemporalStructure::new`] uses every divisor of `m`.
//! - [`TemporalStructure::with_orders`] accepts a subset of the divisors
//!   (e.g. `{12, 4, 1}` to skip semi-annual, four-monthly and bi-monthly).
//! - Accessors expose the stacked layout: per-level offsets inside one
//!   cycle, the aggregation order of every stacked column, and the
//!   structural weights `R·1`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `kset` is strictly descending, starts at `m` and ends at `1`, and every
//!   element divides `m`.
//! - `kt = k* + m` where `k* = Σ_{k ≠ 1} m/k`.
//! - The bottom `m` rows of `R` are the identity and `Zt · R = 0`.
//!
//! Conventions
//! -----------
//! - An aggregation order `k` sums `k` base periods into one observation,
//!   so `k = m` is the most aggregated level (one value per cycle) and
//!   `k = 1` is the base level (`m` values per cycle).
//! - Within one cycle the stacked vector is ordered from `k = m` down to
//!   `k = 1`, and each level's values run forward in time.
use ndarray::{Array1, Array2, s};

use crate::reconciliation::{
    core::validation::MAX_FREQUENCY,
    errors::{RecoError, RecoResult},
};

/// TemporalStructure — aggregation orders and constraint matrices for `m`.
///
/// Fields
/// ------
/// - `m`: top frequency (base periods per cycle).
/// - `kset`: aggregation orders, descending from `m` to `1`.
/// - `k_star`: number of aggregated (non-base) values per cycle.
/// - `k_mat`: `k* × m` aggregation matrix.
/// - `r_mat`: `kt × m` summing matrix.
/// - `zt_mat`: `k* × kt` zero-constraint matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalStructure {
    m: usize,
    kset: Vec<usize>,
    k_star: usize,
    k_mat: Array2<f64>,
    r_mat: Array2<f64>,
    zt_mat: Array2<f64>,
}

impl TemporalStructure {
    /// Build the full temporal hierarchy for top frequency `m`.
    ///
    /// # Errors
    /// - [`RecoError::InvalidFrequency`] when `m == 0` or `m > MAX_FREQUENCY`.
    pub fn new(m: usize) -> RecoResult<Self> {
        check_frequency(m)?;
        Ok(Self::build(m, divisors(m)))
    }

    /// Build a hierarchy over a subset of the divisors of `m`.
    ///
    /// Orders are deduplicated and sorted descending.
    ///
    /// # Errors
    /// - [`RecoError::InvalidFrequency`] when `m == 0` or `m > MAX_FREQUENCY`.
    /// - [`RecoError::InvalidAggregationOrder`] when an order is zero or does
    ///   not divide `m`, or when `m` or `1` is missing from `orders`.
    pub fn with_orders(m: usize, orders: &[usize]) -> RecoResult<Self> {
        check_frequency(m)?;
        let mut kset: Vec<usize> = Vec::with_capacity(orders.len());
        for &k in orders {
            if k == 0 || m % k != 0 {
                return Err(RecoError::InvalidAggregationOrder {
                    order: k,
                    m,
                    reason: "Aggregation orders must be positive divisors of m.",
                });
            }
            if !kset.contains(&k) {
                kset.push(k);
            }
        }
        if !kset.contains(&m) {
            return Err(RecoError::InvalidAggregationOrder {
                order: m,
                m,
                reason: "The order set must contain m (the most aggregated level).",
            });
        }
        if !kset.contains(&1) {
            return Err(RecoError::InvalidAggregationOrder {
                order: 1,
                m,
                reason: "The order set must contain 1 (the base level).",
            });
        }
        kset.sort_unstable_by(|a, b| b.cmp(a));
        Ok(Self::build(m, kset))
    }

    /// Top frequency.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Aggregation orders, descending from `m` to `1`.
    pub fn kset(&self) -> &[usize] {
        &self.kset
    }

    /// Number of aggregated (non-base) values per cycle.
    pub fn k_star(&self) -> usize {
        self.k_star
    }

    /// Stacked dimension `k* + m`.
    pub fn kt(&self) -> usize {
        self.k_star + self.m
    }

    /// Number of values per cycle at aggregation order `k` (`m / k`).
    pub fn block_size(&self, k: usize) -> usize {
        self.m / k
    }

    /// Start offset of each level inside one stacked cycle, aligned with `kset`.
    pub fn level_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.kset.len());
        let mut acc = 0;
        for &k in &self.kset {
            offsets.push(acc);
            acc += self.block_size(k);
        }
        offsets
    }

    /// Aggregation order of every stacked column, in stacked order.
    pub fn level_of_column(&self) -> Vec<usize> {
        self.kset.iter().flat_map(|&k| std::iter::repeat(k).take(self.block_size(k))).collect()
    }

    /// Structural weights `R · 1_m` (number of base periods behind each node).
    pub fn row_sums(&self) -> Array1<f64> {
        Array1::from_iter(self.level_of_column().into_iter().map(|k| k as f64))
    }

    /// `k* × m` aggregation matrix.
    pub fn k_matrix(&self) -> &Array2<f64> {
        &self.k_mat
    }

    /// `kt × m` summing matrix `R = [K; I_m]`.
    pub fn r_matrix(&self) -> &Array2<f64> {
        &self.r_mat
    }

    /// `k* × kt` zero-constraint matrix `Zt = [I_{k*} | −K]`.
    pub fn zt_matrix(&self) -> &Array2<f64> {
        &self.zt_mat
    }

    // ---- Helper Methods ----

    fn build(m: usize, kset: Vec<usize>) -> Self {
        let k_star: usize = kset.iter().filter(|&&k| k != 1).map(|&k| m / k).sum();
        let kt = k_star + m;

        let mut k_mat = Array2::<f64>::zeros((k_star, m));
        let mut row = 0;
        for &k in kset.iter().filter(|&&k| k != 1) {
            for block in 0..m / k {
                k_mat.slice_mut(s![row, block * k..(block + 1) * k]).fill(1.0);
                row += 1;
            }
        }

        let mut r_mat = Array2::<f64>::zeros((kt, m));
        r_mat.slice_mut(s![..k_star, ..]).assign(&k_mat);
        r_mat.slice_mut(s![k_star.., ..]).assign(&Array2::<f64>::eye(m));

        let mut zt_mat = Array2::<f64>::zeros((k_star, kt));
        zt_mat.slice_mut(s![.., ..k_star]).assign(&Array2::<f64>::eye(k_star));
        zt_mat.slice_mut(s![.., k_star..]).assign(&k_mat.mapv(|v| -v));

        Self { m, kset, k_star, k_mat, r_mat, zt_mat }
    }
}

fn check_frequency(m: usize) -> RecoResult<()> {
    if m == 0 {
        return Err(RecoError::InvalidFrequency {
            value: 0.0,
            reason: "Top frequency must be a positive integer.",
        });
    }
    if m > MAX_FREQUENCY {
        return Err(RecoError::InvalidFrequency {
            value: m as f64,
            reason: "Top frequency exceeds the supported maximum.",
        });
    }
    Ok(())
}

/// Positive divisors of `m`, sorted descending. Empty for `m == 0`.
pub fn divisors(m: usize) -> Vec<usize> {
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d = 1;
    while d <= m / d {
        if m % d == 0 {
            small.push(d);
            if d != m / d {
                large.push(m / d);
            }
        }
        d += 1;
    }
    large.extend(small.into_iter().rev());
    large
}
