//! Feature scaling
//!
//! A configuration tag selects exactly one of five transforms. Scaler
//! sweeps also compare a Yeo-Johnson power transform. The fitted state is
//! kept so the same transform is applied to anything the model scores
//! later.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::{GridironError, Result};

/// Upper bound on the number of reference quantiles per column
const MAX_QUANTILES: usize = 1000;

/// Quantile outputs are clipped away from 0 and 1 before the normal inverse CDF
const GAUSSIAN_CLIP: f64 = 1e-7;

/// Search interval for Yeo-Johnson lambdas
const LAMBDA_RANGE: (f64, f64) = (-5.0, 5.0);
const LAMBDA_GRID_STEP: f64 = 0.25;
const GOLDEN_ITERATIONS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalerKind {
    /// Map each column to its empirical quantile (uniform output)
    Quantile,
    /// Quantile mapping followed by the normal inverse CDF
    QuantileGaussian,
    /// Center on the median, scale by the interquartile range
    Robust,
    /// Map each column to [0, 1]
    MinMax,
    /// Zero mean, unit variance
    Standard,
}

impl ScalerKind {
    pub const ALL: [ScalerKind; 5] = [
        ScalerKind::Quantile,
        ScalerKind::QuantileGaussian,
        ScalerKind::Robust,
        ScalerKind::MinMax,
        ScalerKind::Standard,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ScalerKind::Quantile => "quantile",
            ScalerKind::QuantileGaussian => "gaussian",
            ScalerKind::Robust => "robust",
            ScalerKind::MinMax => "minmax",
            ScalerKind::Standard => "standard",
        }
    }

    /// Fit this transform on `x`
    pub fn fit(self, x: ArrayView2<f64>) -> Result<FittedScaler> {
        check_fit_shape(self.tag(), x)?;

        let columns: Vec<Vec<f64>> = x.axis_iter(Axis(1)).map(sorted_column).collect();

        let scaler = match self {
            ScalerKind::Quantile | ScalerKind::QuantileGaussian => {
                let n_quantiles = x.nrows().min(MAX_QUANTILES);
                let references: Vec<f64> = if n_quantiles == 1 {
                    vec![0.0]
                } else {
                    (0..n_quantiles)
                        .map(|i| i as f64 / (n_quantiles - 1) as f64)
                        .collect()
                };
                let quantiles = columns
                    .iter()
                    .map(|sorted| references.iter().map(|&p| percentile(sorted, p)).collect())
                    .collect();

                FittedScaler::Quantile {
                    gaussian: self == ScalerKind::QuantileGaussian,
                    quantiles,
                    references,
                }
            }
            ScalerKind::Robust => {
                let offset = columns.iter().map(|c| percentile(c, 0.5));
                let scale = columns
                    .iter()
                    .map(|c| non_zero(percentile(c, 0.75) - percentile(c, 0.25)));
                FittedScaler::Affine {
                    kind: self,
                    offset: offset.collect(),
                    scale: scale.collect(),
                }
            }
            ScalerKind::MinMax => {
                let offset = columns.iter().map(|c| c[0]);
                let scale = columns.iter().map(|c| non_zero(c[c.len() - 1] - c[0]));
                FittedScaler::Affine {
                    kind: self,
                    offset: offset.collect(),
                    scale: scale.collect(),
                }
            }
            ScalerKind::Standard => {
                let (offset, scale): (Vec<f64>, Vec<f64>) = columns
                    .iter()
                    .map(|c| {
                        let (mean, variance) = moments(c);
                        (mean, non_zero(variance.sqrt()))
                    })
                    .unzip();
                FittedScaler::Affine {
                    kind: self,
                    offset: Array1::from(offset),
                    scale: Array1::from(scale),
                }
            }
        };

        Ok(scaler)
    }
}

impl FromStr for ScalerKind {
    type Err = GridironError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "quantile" => Ok(ScalerKind::Quantile),
            "gaussian" | "quantile-gaussian" => Ok(ScalerKind::QuantileGaussian),
            "robust" => Ok(ScalerKind::Robust),
            "minmax" => Ok(ScalerKind::MinMax),
            "standard" => Ok(ScalerKind::Standard),
            _ => Err(GridironError::Configuration(format!(
                "unknown scaler '{}'. Use quantile, gaussian, robust, minmax or standard.",
                s
            ))),
        }
    }
}

impl fmt::Display for ScalerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Any transform a scaler sweep compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalingMethod {
    Kind(ScalerKind),
    /// Yeo-Johnson with a per-column lambda, then zero mean and unit variance
    YeoJohnson,
}

impl ScalingMethod {
    /// Transforms compared by a sweep, in sweep order
    pub const SWEEP: [ScalingMethod; 5] = [
        ScalingMethod::Kind(ScalerKind::MinMax),
        ScalingMethod::Kind(ScalerKind::Robust),
        ScalingMethod::Kind(ScalerKind::Quantile),
        ScalingMethod::YeoJohnson,
        ScalingMethod::Kind(ScalerKind::Standard),
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ScalingMethod::Kind(kind) => kind.tag(),
            ScalingMethod::YeoJohnson => "power",
        }
    }

    pub fn fit(self, x: ArrayView2<f64>) -> Result<FittedScaler> {
        match self {
            ScalingMethod::Kind(kind) => kind.fit(x),
            ScalingMethod::YeoJohnson => {
                check_fit_shape(self.tag(), x)?;

                let mut lambdas = Vec::with_capacity(x.ncols());
                let mut offset = Vec::with_capacity(x.ncols());
                let mut scale = Vec::with_capacity(x.ncols());
                for column in x.axis_iter(Axis(1)) {
                    let values = column.to_vec();
                    let lambda = yeo_johnson_lambda(&values);
                    let transformed: Vec<f64> =
                        values.iter().map(|&v| yeo_johnson(v, lambda)).collect();
                    let (mean, variance) = moments(&transformed);
                    lambdas.push(lambda);
                    offset.push(mean);
                    scale.push(non_zero(variance.sqrt()));
                }
                log::debug!("Yeo-Johnson lambdas: {:?}", lambdas);

                Ok(FittedScaler::Power {
                    lambdas,
                    offset: Array1::from(offset),
                    scale: Array1::from(scale),
                })
            }
        }
    }
}

impl From<ScalerKind> for ScalingMethod {
    fn from(kind: ScalerKind) -> Self {
        ScalingMethod::Kind(kind)
    }
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A transform fitted on training data
#[derive(Debug, Clone)]
pub enum FittedScaler {
    Quantile {
        gaussian: bool,
        /// Reference quantiles per column, ascending
        quantiles: Vec<Vec<f64>>,
        /// Probability of each reference quantile
        references: Vec<f64>,
    },
    /// `(x - offset) / scale`, column-wise
    Affine {
        kind: ScalerKind,
        offset: Array1<f64>,
        scale: Array1<f64>,
    },
    /// Yeo-Johnson per column, then `(y - offset) / scale`
    Power {
        lambdas: Vec<f64>,
        offset: Array1<f64>,
        scale: Array1<f64>,
    },
}

impl FittedScaler {
    pub fn method(&self) -> ScalingMethod {
        match self {
            FittedScaler::Quantile { gaussian: true, .. } => ScalerKind::QuantileGaussian.into(),
            FittedScaler::Quantile { gaussian: false, .. } => ScalerKind::Quantile.into(),
            FittedScaler::Affine { kind, .. } => (*kind).into(),
            FittedScaler::Power { .. } => ScalingMethod::YeoJohnson,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            FittedScaler::Quantile { quantiles, .. } => quantiles.len(),
            FittedScaler::Affine { offset, .. } => offset.len(),
            FittedScaler::Power { lambdas, .. } => lambdas.len(),
        }
    }

    /// Apply the fitted transform; `x` must have the fitted width
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(GridironError::DataShape(format!(
                "{} scaler was fitted on {} features, got {}",
                self.method(),
                self.n_features(),
                x.ncols()
            )));
        }

        let mut out = x.to_owned();
        match self {
            FittedScaler::Quantile {
                gaussian,
                quantiles,
                references,
            } => {
                for (mut column, column_quantiles) in out.axis_iter_mut(Axis(1)).zip(quantiles) {
                    column.mapv_inplace(|v| {
                        let p = quantile_position(v, column_quantiles, references);
                        if *gaussian {
                            normal_quantile(p.clamp(GAUSSIAN_CLIP, 1.0 - GAUSSIAN_CLIP))
                        } else {
                            p
                        }
                    });
                }
            }
            FittedScaler::Affine { offset, scale, .. } => {
                for ((mut column, &o), &s) in out.axis_iter_mut(Axis(1)).zip(offset).zip(scale) {
                    column.mapv_inplace(|v| (v - o) / s);
                }
            }
            FittedScaler::Power {
                lambdas,
                offset,
                scale,
            } => {
                let columns = out.axis_iter_mut(Axis(1)).zip(lambdas).zip(offset).zip(scale);
                for (((mut column, &lambda), &o), &s) in columns {
                    column.mapv_inplace(|v| (yeo_johnson(v, lambda) - o) / s);
                }
            }
        }
        Ok(out)
    }
}

/// Fit `method` on `x` and return the fitted scaler with the transformed matrix
pub fn fit_transform(
    method: impl Into<ScalingMethod>,
    x: ArrayView2<f64>,
) -> Result<(FittedScaler, Array2<f64>)> {
    let method = method.into();
    let scaler = method.fit(x)?;
    let scaled = scaler.transform(x)?;
    log::debug!("Fitted {} scaler on {}x{}", method, x.nrows(), x.ncols());
    Ok((scaler, scaled))
}

fn check_fit_shape(tag: &str, x: ArrayView2<f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(GridironError::DataShape(format!(
            "cannot fit {} scaler on a {}x{} matrix",
            tag,
            x.nrows(),
            x.ncols()
        )));
    }
    Ok(())
}

/// Mean and population variance
fn moments(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

fn yeo_johnson(v: f64, lambda: f64) -> f64 {
    const EPS: f64 = 1e-10;
    if v >= 0.0 {
        if lambda.abs() < EPS {
            v.ln_1p()
        } else {
            ((v + 1.0).powf(lambda) - 1.0) / lambda
        }
    } else if (lambda - 2.0).abs() < EPS {
        -(-v).ln_1p()
    } else {
        -((1.0 - v).powf(2.0 - lambda) - 1.0) / (2.0 - lambda)
    }
}

/// Profile log-likelihood of `lambda` under a normal model of the output
fn yeo_johnson_log_likelihood(values: &[f64], lambda: f64) -> f64 {
    let transformed: Vec<f64> = values.iter().map(|&v| yeo_johnson(v, lambda)).collect();
    let (_, variance) = moments(&transformed);
    if !(variance > 0.0 && variance.is_finite()) {
        return f64::NEG_INFINITY;
    }
    let n = values.len() as f64;
    let jacobian: f64 = values.iter().map(|v| v.signum() * v.abs().ln_1p()).sum();
    -0.5 * n * variance.ln() + (lambda - 1.0) * jacobian
}

/// Maximum-likelihood lambda: a coarse grid over `LAMBDA_RANGE`, then a
/// golden-section search around the best grid point. Constant columns keep
/// lambda 1.
fn yeo_johnson_lambda(values: &[f64]) -> f64 {
    let llf = |lambda: f64| yeo_johnson_log_likelihood(values, lambda);
    let (low, high) = LAMBDA_RANGE;

    let mut best = (1.0, llf(1.0));
    let steps = ((high - low) / LAMBDA_GRID_STEP).round() as usize;
    for i in 0..=steps {
        let lambda = low + i as f64 * LAMBDA_GRID_STEP;
        let score = llf(lambda);
        if score > best.1 {
            best = (lambda, score);
        }
    }
    if !best.1.is_finite() {
        return 1.0;
    }

    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let mut a = (best.0 - LAMBDA_GRID_STEP).max(low);
    let mut b = (best.0 + LAMBDA_GRID_STEP).min(high);
    let mut c = b - ratio * (b - a);
    let mut d = a + ratio * (b - a);
    let (mut fc, mut fd) = (llf(c), llf(d));
    for _ in 0..GOLDEN_ITERATIONS {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - ratio * (b - a);
            fc = llf(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + ratio * (b - a);
            fd = llf(d);
        }
    }

    let refined = 0.5 * (a + b);
    if llf(refined) >= best.1 {
        refined
    } else {
        best.0
    }
}

fn sorted_column(column: ndarray::ArrayView1<f64>) -> Vec<f64> {
    let mut values = column.to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Linearly interpolated percentile of sorted values, `p` in [0, 1]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = position - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Constant columns are left unscaled
fn non_zero(scale: f64) -> f64 {
    if scale.abs() < 10.0 * f64::EPSILON {
        1.0
    } else {
        scale
    }
}

/// Reference probability of `v`; values equal to one or more reference
/// quantiles take the midpoint of their references
fn quantile_position(v: f64, quantiles: &[f64], references: &[f64]) -> f64 {
    let n = quantiles.len();
    let lower = quantiles.partition_point(|&q| q < v);
    let upper = quantiles.partition_point(|&q| q <= v);

    if lower < upper {
        return 0.5 * (references[lower] + references[upper - 1]);
    }
    if lower == 0 {
        return references[0];
    }
    if lower == n {
        return references[n - 1];
    }

    let (q0, q1) = (quantiles[lower - 1], quantiles[lower]);
    let (r0, r1) = (references[lower - 1], references[lower]);
    r0 + (v - q0) / (q1 - q0) * (r1 - r0)
}

/// Standard normal inverse CDF (Acklam's rational approximation)
fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239e0,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838e0,
        -2.549732539343734e0,
        4.374664141464968e0,
        2.938163982698783e0,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996e0,
        3.754408661907416e0,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn sample() -> Array2<f64> {
        array![
            [1.0, 10.0, 5.0],
            [2.0, 20.0, 5.0],
            [3.0, 30.0, 5.0],
            [4.0, 40.0, 5.0],
            [100.0, 50.0, 5.0],
        ]
    }

    #[test]
    fn test_every_kind_preserves_shape() {
        let x = sample();
        for kind in ScalerKind::ALL {
            let (scaler, scaled) = fit_transform(kind, x.view()).unwrap();
            assert_eq!(scaled.dim(), x.dim(), "{}", kind);
            assert_eq!(scaler.method(), ScalingMethod::Kind(kind));
            assert!(scaled.iter().all(|v| v.is_finite()), "{}", kind);
        }
    }

    #[test]
    fn test_tags() {
        for kind in ScalerKind::ALL {
            assert_eq!(kind.tag().parse::<ScalerKind>().unwrap(), kind);
        }
        assert_eq!(
            "Quantile-Gaussian".parse::<ScalerKind>().unwrap(),
            ScalerKind::QuantileGaussian
        );
    }

    #[test]
    fn test_unknown_tag_is_configuration_error() {
        assert!(matches!(
            "bogus".parse::<ScalerKind>(),
            Err(GridironError::Configuration(_))
        ));
        assert!("".parse::<ScalerKind>().is_err());
    }

    #[test]
    fn test_minmax() {
        let (_, scaled) = fit_transform(ScalerKind::MinMax, sample().view()).unwrap();
        assert_abs_diff_eq!(scaled[[0, 1]], 0.0);
        assert_abs_diff_eq!(scaled[[4, 1]], 1.0);
        assert_abs_diff_eq!(scaled[[2, 1]], 0.5);
        // Constant column only shifts
        assert_abs_diff_eq!(scaled[[3, 2]], 0.0);
    }

    #[test]
    fn test_standard() {
        let (_, scaled) = fit_transform(ScalerKind::Standard, sample().view()).unwrap();
        let column = scaled.column(1);
        let mean = column.sum() / column.len() as f64;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(variance, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_robust_ignores_outlier() {
        let (_, scaled) = fit_transform(ScalerKind::Robust, sample().view()).unwrap();
        // median 3, IQR 4 - 2
        assert_abs_diff_eq!(scaled[[2, 0]], 0.0);
        assert_abs_diff_eq!(scaled[[3, 0]], 0.5);
        assert_abs_diff_eq!(scaled[[4, 0]], 48.5);
    }

    #[test]
    fn test_quantile_uniform_output() {
        let (scaler, scaled) = fit_transform(ScalerKind::Quantile, sample().view()).unwrap();
        let column: Vec<f64> = scaled.column(0).to_vec();
        assert_abs_diff_eq!(column[0], 0.0);
        assert_abs_diff_eq!(column[2], 0.5);
        assert_abs_diff_eq!(column[4], 1.0);
        assert!(column.windows(2).all(|w| w[0] <= w[1]));

        // Unseen values interpolate and clip
        let unseen = array![[2.5, 0.0, 5.0], [1000.0, 60.0, 4.0]];
        let out = scaler.transform(unseen.view()).unwrap();
        assert_abs_diff_eq!(out[[0, 0]], 0.375);
        assert_abs_diff_eq!(out[[1, 0]], 1.0);
        assert_abs_diff_eq!(out[[0, 1]], 0.0);
        // Constant column: every training value ties, midpoint reference
        assert_abs_diff_eq!(scaled[[0, 2]], 0.5);
    }

    #[test]
    fn test_quantile_gaussian_output() {
        let (_, scaled) = fit_transform(ScalerKind::QuantileGaussian, sample().view()).unwrap();
        assert_abs_diff_eq!(scaled[[2, 0]], 0.0, epsilon = 1e-9);
        assert!(scaled[[0, 0]] < -5.0);
        assert!(scaled[[4, 0]] > 5.0);
    }

    #[test]
    fn test_power_transform_preserves_rows() {
        let x = sample();
        let (scaler, scaled) = fit_transform(ScalingMethod::YeoJohnson, x.view()).unwrap();
        assert_eq!(scaled.dim(), x.dim());
        assert_eq!(scaler.method(), ScalingMethod::YeoJohnson);
        assert!(scaled.iter().all(|v| v.is_finite()));

        for column in [0, 1] {
            let values = scaled.column(column);
            let mean = values.sum() / values.len() as f64;
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(variance, 1.0, epsilon = 1e-9);
        }
        // Constant column only shifts
        assert_abs_diff_eq!(scaled[[0, 2]], 0.0);

        let unseen = array![[-3.0, 25.0, 5.0]];
        let out = scaler.transform(unseen.view()).unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_power_lambda_pulls_in_right_skew() {
        let skewed = [1.0, 2.0, 3.0, 4.0, 100.0];
        assert!(yeo_johnson_lambda(&skewed) < 1.0);
        assert_abs_diff_eq!(yeo_johnson_lambda(&[5.0, 5.0, 5.0]), 1.0);
    }

    #[test]
    fn test_yeo_johnson_identities() {
        for v in [-4.0, -0.5, 0.0, 0.5, 4.0] {
            assert_abs_diff_eq!(yeo_johnson(v, 1.0), v, epsilon = 1e-12);
        }
        for lambda in [-1.0, 0.0, 0.5, 2.0, 3.0] {
            assert_abs_diff_eq!(yeo_johnson(0.0, lambda), 0.0);
        }
        assert_abs_diff_eq!(yeo_johnson(1.0, 0.0), 2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(yeo_johnson(-1.0, 2.0), -(2f64.ln()), epsilon = 1e-12);
    }

    #[test]
    fn test_sweep_methods() {
        let tags: Vec<&str> = ScalingMethod::SWEEP.iter().map(|m| m.tag()).collect();
        assert_eq!(tags, vec!["minmax", "robust", "quantile", "power", "standard"]);
        assert!("power".parse::<ScalerKind>().is_err());
    }

    #[test]
    fn test_normal_quantile() {
        assert_abs_diff_eq!(normal_quantile(0.5), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normal_quantile(0.975), 1.959964, epsilon = 1e-6);
        assert_abs_diff_eq!(normal_quantile(0.01), -2.326348, epsilon = 1e-6);
    }

    #[test]
    fn test_width_mismatch() {
        let scaler = ScalerKind::Standard.fit(sample().view()).unwrap();
        let narrow = Array2::<f64>::zeros((2, 2));
        assert!(matches!(
            scaler.transform(narrow.view()),
            Err(GridironError::DataShape(_))
        ));
    }

    #[test]
    fn test_empty_fit() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            ScalerKind::MinMax.fit(empty.view()),
            Err(GridironError::DataShape(_))
        ));
    }
}
