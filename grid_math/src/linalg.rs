//! Dense least-squares solvers
//!
//! The design matrices in this workspace are tall and narrow (hundreds of
//! daily rows, a few dozen regressors), so the normal equations are formed
//! explicitly and handed to faer's LU factorisation.

use crate::{MathError, Result};
use faer::{prelude::*, solvers::PartialPivLu, Mat};

/// Largest accepted relative residual of a solved system
const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Dot product of two equally sized slices
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Solve `min ||X b - y||² + Σ λ_j b_j²`.
///
/// `design` holds the rows of `X`, `penalties` one ridge weight per column
/// (use `0.0` for unpenalised columns such as an intercept).
pub fn ridge_least_squares(design: &[Vec<f64>], target: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    if design.is_empty() {
        return Err(MathError::InsufficientData(
            "design matrix has no rows".to_string(),
        ));
    }
    if design.len() != target.len() {
        return Err(MathError::InvalidInput(format!(
            "design has {} rows but target has {} values",
            design.len(),
            target.len()
        )));
    }

    let k = design[0].len();
    if k == 0 {
        return Err(MathError::InvalidInput(
            "design matrix has no columns".to_string(),
        ));
    }
    if penalties.len() != k {
        return Err(MathError::InvalidInput(format!(
            "expected {} penalties, got {}",
            k,
            penalties.len()
        )));
    }
    if design.iter().any(|row| row.len() != k) {
        return Err(MathError::InvalidInput(
            "design rows have inconsistent widths".to_string(),
        ));
    }
    if penalties.iter().any(|p| *p < 0.0 || !p.is_finite()) {
        return Err(MathError::InvalidInput(
            "penalties must be finite and non-negative".to_string(),
        ));
    }

    let mut gram = vec![vec![0.0; k]; k];
    let mut rhs = vec![0.0; k];

    for (row, &y) in design.iter().zip(target.iter()) {
        for i in 0..k {
            rhs[i] += row[i] * y;
            for j in 0..=i {
                gram[i][j] += row[i] * row[j];
            }
        }
    }

    for i in 0..k {
        for j in 0..i {
            gram[j][i] = gram[i][j];
        }
        gram[i][i] += penalties[i];
    }

    solve_dense(&gram, &rhs)
}

/// Solve the square system `A x = b` with partial-pivoting LU.
///
/// Singular systems show up as non-finite solutions or a residual that does
/// not vanish and are reported as [`MathError::SingularMatrix`].
pub fn solve_dense(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "matrix must be {}x{}",
            n, n
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let mat = Mat::from_fn(n, n, |i, j| a[i][j]);
    let rhs = Mat::from_fn(n, 1, |i, _| b[i]);
    let lu = PartialPivLu::new(mat.as_ref());
    let sol = lu.solve(&rhs);
    let x: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MathError::SingularMatrix(
            "factorisation produced non-finite values".to_string(),
        ));
    }

    let residual = a
        .iter()
        .zip(b.iter())
        .map(|(row, bi)| (dot(row, &x) - bi).powi(2))
        .sum::<f64>()
        .sqrt();
    let scale = a
        .iter()
        .map(|row| dot(row, row).sqrt())
        .fold(0.0_f64, f64::max)
        * x.iter().map(|v| v * v).sum::<f64>().sqrt()
        + b.iter().map(|v| v * v).sum::<f64>().sqrt();
    if residual > RESIDUAL_TOLERANCE * scale.max(f64::MIN_POSITIVE) {
        return Err(MathError::SingularMatrix(format!(
            "residual {:e} does not vanish",
            residual
        )));
    }

    Ok(x)
}
