//! ARIMA models with AIC-driven order selection
//!
//! Orders are fitted by conditional least squares (Hannan-Rissanen): a long
//! AR regression supplies residual proxies, then one linear solve estimates
//! the AR and MA coefficients jointly. The grid winner is the candidate with
//! the lowest AIC; if nothing converges a relaxed `(1,1,1)` fit is the last
//! resort before reporting a training error.

use crate::error::{ForecastError, Result};
use crate::models::{ForecastBands, ForecastModel, TrainedForecastModel};
use crate::series::DailySeries;
use statrs::statistics::Statistics;

/// z-score for the 95% interval
const Z_95: f64 = 1.96;
/// Ridge applied to the normal equations for numeric stability
const DEFAULT_RIDGE: f64 = 1e-8;
/// Relaxed ridge used by the last-resort `(1,1,1)` fit
const RELAXED_RIDGE: f64 = 1e-4;
/// Order retried with relaxed tolerance when the whole grid fails
const FALLBACK_ORDER: (usize, usize, usize) = (1, 1, 1);
/// Floor for the residual variance so AIC stays finite on noiseless series
const SIGMA2_FLOOR: f64 = 1e-12;
/// Reject fits whose coefficients blow up past this magnitude
const MAX_COEFFICIENT: f64 = 10.0;

/// Default `(p, d, q)` candidate grid
pub const DEFAULT_ORDERS: [(usize, usize, usize); 5] =
    [(0, 1, 1), (1, 1, 1), (2, 1, 1), (0, 1, 2), (1, 1, 2)];

/// ARIMA model with a small grid of order candidates
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// Order candidates searched during training
    orders: Vec<(usize, usize, usize)>,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model, includes the selected order
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
    /// Fitted AR coefficients
    phi: Vec<f64>,
    /// Fitted MA coefficients
    theta: Vec<f64>,
    /// Mean of the differenced series, added back when forecasting
    mean_w: f64,
    /// Residual variance on the differenced scale
    sigma2: f64,
    /// Centered differenced training series
    wc: Vec<f64>,
    /// In-sample residuals on the differenced scale
    eps: Vec<f64>,
    /// Last value of each differencing level, for integration
    last_levels: Vec<f64>,
    /// AIC of the selected order
    aic: f64,
}

/// One converged order fit
struct FittedOrder {
    phi: Vec<f64>,
    theta: Vec<f64>,
    mean_w: f64,
    sigma2: f64,
    aic: f64,
    wc: Vec<f64>,
    eps: Vec<f64>,
}

impl ArimaModel {
    /// Create a model with the default order grid
    pub fn new() -> Self {
        Self {
            name: "ARIMA(auto)".to_string(),
            orders: DEFAULT_ORDERS.to_vec(),
        }
    }

    /// Create a model with a custom order grid
    pub fn with_orders(orders: Vec<(usize, usize, usize)>) -> Result<Self> {
        if orders.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "ARIMA order grid must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name: "ARIMA(auto)".to_string(),
            orders,
        })
    }
}

impl Default for ArimaModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, series: &DailySeries) -> Result<TrainedArimaModel> {
        let values = series.values();

        let mut best: Option<((usize, usize, usize), FittedOrder)> = None;
        for &(p, d, q) in &self.orders {
            if let Ok(fit) = fit_order(&values, p, d, q, DEFAULT_RIDGE) {
                let better = match &best {
                    Some((_, current)) => fit.aic < current.aic,
                    None => true,
                };
                if better {
                    best = Some(((p, d, q), fit));
                }
            }
        }

        let ((p, d, q), fit) = match best {
            Some(found) => found,
            None => {
                let (p, d, q) = FALLBACK_ORDER;
                let fit = fit_order(&values, p, d, q, RELAXED_RIDGE).map_err(|_| {
                    ForecastError::ModelTraining(
                        "no ARIMA order candidate converged".to_string(),
                    )
                })?;
                ((p, d, q), fit)
            }
        };

        // Last value at each differencing level, needed to undo differencing
        let mut last_levels = Vec::with_capacity(d);
        let mut level = values;
        for _ in 0..d {
            match level.last() {
                Some(&v) => last_levels.push(v),
                None => {
                    return Err(ForecastError::ModelTraining(
                        "series exhausted while differencing".to_string(),
                    ))
                }
            }
            level = difference(&level, 1);
        }

        Ok(TrainedArimaModel {
            name: format!("ARIMA({},{},{})", p, d, q),
            p,
            d,
            q,
            phi: fit.phi,
            theta: fit.theta,
            mean_w: fit.mean_w,
            sigma2: fit.sigma2,
            wc: fit.wc,
            eps: fit.eps,
            last_levels,
            aic: fit.aic,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    /// AIC of the selected order
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// The selected `(p, d, q)` order
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastBands> {
        if horizon == 0 {
            return ForecastBands::new(Vec::new(), Vec::new(), Vec::new());
        }

        let n = self.wc.len();

        // ARMA recursion on the centered differenced scale, future shocks zero
        let mut wc_ext = self.wc.clone();
        for step in 0..horizon {
            let t = n + step;
            let mut pred = 0.0;
            for i in 1..=self.p {
                if t >= i {
                    pred += self.phi[i - 1] * wc_ext[t - i];
                }
            }
            for j in 1..=self.q {
                if t >= j && t - j < n {
                    pred += self.theta[j - 1] * self.eps[t - j];
                }
            }
            wc_ext.push(pred);
        }
        let w_forecast: Vec<f64> = wc_ext[n..].iter().map(|v| v + self.mean_w).collect();

        // Undo the differencing, innermost level first
        let mut point = w_forecast;
        for lev in (0..self.d).rev() {
            let mut prev = self.last_levels[lev];
            for v in point.iter_mut() {
                *v += prev;
                prev = *v;
            }
        }

        // Psi-weight forecast variance, accumulated through the integration
        let mut psi = vec![0.0; horizon];
        psi[0] = 1.0;
        for j in 1..horizon {
            let mut v = if j <= self.q { self.theta[j - 1] } else { 0.0 };
            for i in 1..=self.p.min(j) {
                v += self.phi[i - 1] * psi[j - i];
            }
            psi[j] = v;
        }
        for _ in 0..self.d {
            for j in 1..horizon {
                psi[j] += psi[j - 1];
            }
        }

        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        let mut var_acc = 0.0;
        for (k, &value) in point.iter().enumerate() {
            var_acc += psi[k] * psi[k];
            let se = (self.sigma2 * var_acc).sqrt();
            lower.push(value - Z_95 * se);
            upper.push(value + Z_95 * se);
        }

        Ok(ForecastBands::new(point, lower, upper)?.sanitize())
    }

    fn forecast_over(&self, test: &DailySeries) -> Result<Vec<f64>> {
        Ok(self.forecast(test.len())?.values)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Difference a series `d` times
fn difference(values: &[f64], d: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    for _ in 0..d {
        if out.len() < 2 {
            return Vec::new();
        }
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Long AR order for the Hannan-Rissanen residual proxy stage
fn long_ar_order(n: usize, p: usize, q: usize) -> usize {
    (p + q).max((n / 3).min(8)).max(1)
}

/// Fit one `(p, d, q)` candidate by conditional least squares
fn fit_order(
    values: &[f64],
    p: usize,
    d: usize,
    q: usize,
    ridge: f64,
) -> Result<FittedOrder> {
    let w = difference(values, d);
    let n = w.len();
    let k = p + q + 1;
    if n < k + 3 {
        return Err(ForecastError::InsufficientData(format!(
            "ARIMA({},{},{}) needs at least {} differenced observations, got {}",
            p,
            d,
            q,
            k + 3,
            n
        )));
    }

    let mean_w = w.iter().mean();
    let wc: Vec<f64> = w.iter().map(|v| v - mean_w).collect();

    // Stage 1: residual proxies from a long AR regression
    let mut proxy = vec![0.0; n];
    let mut start = p;
    if q > 0 {
        let m = long_ar_order(n, p, q);
        if n <= m + 1 {
            return Err(ForecastError::InsufficientData(format!(
                "ARIMA({},{},{}) long AR stage needs more than {} observations",
                p,
                d,
                q,
                m + 1
            )));
        }
        let mut rows = Vec::with_capacity(n - m);
        let mut targets = Vec::with_capacity(n - m);
        for t in m..n {
            rows.push((1..=m).map(|i| wc[t - i]).collect::<Vec<f64>>());
            targets.push(wc[t]);
        }
        let a = solve_least_squares(&rows, &targets, ridge).ok_or_else(|| {
            ForecastError::ModelTraining(format!(
                "ARIMA({},{},{}) long AR stage is singular",
                p, d, q
            ))
        })?;
        for t in m..n {
            let fitted: f64 = (1..=m).map(|i| a[i - 1] * wc[t - i]).sum();
            proxy[t] = wc[t] - fitted;
        }
        start = p.max(m + q);
    }

    // Stage 2: joint AR + MA regression against the residual proxies
    let (phi, theta) = if p + q == 0 {
        (Vec::new(), Vec::new())
    } else {
        if n <= start || n - start < p + q + 1 {
            return Err(ForecastError::InsufficientData(format!(
                "ARIMA({},{},{}) regression stage has too few rows",
                p, d, q
            )));
        }
        let mut rows = Vec::with_capacity(n - start);
        let mut targets = Vec::with_capacity(n - start);
        for t in start..n {
            let mut row = Vec::with_capacity(p + q);
            for i in 1..=p {
                row.push(wc[t - i]);
            }
            for j in 1..=q {
                row.push(proxy[t - j]);
            }
            rows.push(row);
            targets.push(wc[t]);
        }
        let beta = solve_least_squares(&rows, &targets, ridge).ok_or_else(|| {
            ForecastError::ModelTraining(format!(
                "ARIMA({},{},{}) normal equations are singular",
                p, d, q
            ))
        })?;
        (beta[..p].to_vec(), beta[p..].to_vec())
    };

    if phi
        .iter()
        .chain(theta.iter())
        .any(|c| !c.is_finite() || c.abs() > MAX_COEFFICIENT)
    {
        return Err(ForecastError::ModelTraining(format!(
            "ARIMA({},{},{}) produced unstable coefficients",
            p, d, q
        )));
    }

    // In-sample residuals over the full centered series
    let mut eps = vec![0.0; n];
    for t in 0..n {
        let mut pred = 0.0;
        for i in 1..=p {
            if t >= i {
                pred += phi[i - 1] * wc[t - i];
            }
        }
        for j in 1..=q {
            if t >= j {
                pred += theta[j - 1] * eps[t - j];
            }
        }
        eps[t] = wc[t] - pred;
    }

    let n_eff = n - p;
    if n_eff == 0 {
        return Err(ForecastError::InsufficientData(format!(
            "ARIMA({},{},{}) has no effective observations",
            p, d, q
        )));
    }
    let sse: f64 = eps[p..].iter().map(|e| e * e).sum();
    let sigma2 = (sse / n_eff as f64).max(SIGMA2_FLOOR);
    if !sigma2.is_finite() {
        return Err(ForecastError::ModelTraining(format!(
            "ARIMA({},{},{}) residual variance diverged",
            p, d, q
        )));
    }
    let aic = n_eff as f64 * sigma2.ln() + 2.0 * k as f64;

    Ok(FittedOrder {
        phi,
        theta,
        mean_w,
        sigma2,
        aic,
        wc,
        eps,
    })
}

/// Solve `X'X b = X'y` with a small ridge term, by Gaussian elimination with
/// partial pivoting. Returns `None` when the system is singular.
fn solve_least_squares(rows: &[Vec<f64>], y: &[f64], ridge: f64) -> Option<Vec<f64>> {
    let k = rows.first()?.len();
    if k == 0 {
        return Some(Vec::new());
    }

    // Normal equations, augmented with X'y
    let mut a = vec![vec![0.0; k + 1]; k];
    for i in 0..k {
        for j in 0..k {
            a[i][j] = rows.iter().map(|r| r[i] * r[j]).sum();
        }
        a[i][i] += ridge;
        a[i][k] = rows.iter().zip(y.iter()).map(|(r, t)| r[i] * t).sum();
    }

    for col in 0..k {
        let pivot_row = (col..k).max_by(|&r1, &r2| {
            a[r1][col]
                .abs()
                .partial_cmp(&a[r2][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        for row in col + 1..k {
            let factor = a[row][col] / a[col][col];
            for j in col..=k {
                a[row][j] -= factor * a[col][j];
            }
        }
    }

    let mut solution = vec![0.0; k];
    for i in (0..k).rev() {
        let mut acc = a[i][k];
        for j in i + 1..k {
            acc -= a[i][j] * solution[j];
        }
        solution[i] = acc / a[i][i];
        if !solution[i].is_finite() {
            return None;
        }
    }
    Some(solution)
}
