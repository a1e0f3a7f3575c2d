//! Dense linear algebra used by the closed-form regression models.
use anyhow::Result;
use armory_core::ArmoryError;
use ndarray::{concatenate, Array2, Axis};

/// Prepends a column of ones (the intercept) to `x`.
pub fn append_ones(x: &Array2<f64>) -> Result<Array2<f64>> {
    let ones = Array2::<f64>::ones((x.nrows(), 1));
    Ok(concatenate(Axis(1), &[ones.view(), x.view()])?)
}

/// Inverts a square matrix with Gauss-Jordan elimination and partial pivoting.
pub fn inverse(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(ArmoryError::DimensionMismatch {
            what: "columns of a square matrix".to_string(),
            expected: n,
            actual: a.ncols(),
        }
        .into());
    }

    let mut m = a.clone();
    let mut inv = Array2::<f64>::eye(n);
    // pivots are judged against the magnitude of the matrix
    let scale = a.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
    let tol = scale * n as f64 * f64::EPSILON;

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))
            .unwrap_or(col);
        let magnitude = m[[pivot, col]].abs();
        if !magnitude.is_finite() || magnitude <= tol {
            return Err(ArmoryError::SingularMatrix.into());
        }
        if pivot != col {
            for k in 0..n {
                m.swap([pivot, k], [col, k]);
                inv.swap([pivot, k], [col, k]);
            }
        }

        let p = m[[col, col]];
        for k in 0..n {
            m[[col, k]] /= p;
            inv[[col, k]] /= p;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = m[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                m[[row, k]] -= factor * m[[col, k]];
                inv[[row, k]] -= factor * inv[[col, k]];
            }
        }
    }

    Ok(inv)
}

/// Returns the lower-triangular Cholesky factor `L` of a symmetric positive definite matrix, `A = L L^T`.
pub fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let s: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let d = a[[i, i]] - s;
                if d <= 0.0 {
                    return Err(ArmoryError::NotPositiveDefinite.into());
                }
                l[[i, j]] = d.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - s) / l[[j, j]];
            }
        }
    }

    Ok(l)
}
