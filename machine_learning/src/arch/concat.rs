use ndarray::{Array2, ArrayView2, Axis, s};

use crate::{MlErr, Result};

/// Concatenates matrices along the feature axis, keeping the given order.
///
/// # Arguments
/// * `parts` - The `(batch, features)` matrices, all with the same amount of rows.
///
/// # Returns
/// A `(batch, sum of features)` matrix.
pub fn concat(parts: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>> {
    let Some(first) = parts.first() else {
        return Err(MlErr::InvalidLayer("nothing to concatenate".into()));
    };

    let rows = first.nrows();
    if let Some(part) = parts.iter().find(|part| part.nrows() != rows) {
        return Err(MlErr::SizeMismatch {
            what: "concatenated batch",
            got: part.nrows(),
            expected: rows,
        });
    }

    Ok(ndarray::concatenate(Axis(1), parts)?)
}

/// Splits a matrix along the feature axis, inverse of `concat`.
///
/// # Arguments
/// * `x` - The matrix to split.
/// * `widths` - The amount of columns of every part, must add up to `x`'s columns.
pub fn split(x: ArrayView2<'_, f32>, widths: &[usize]) -> Result<Vec<Array2<f32>>> {
    let total: usize = widths.iter().sum();
    if total != x.ncols() {
        return Err(MlErr::SizeMismatch {
            what: "split widths",
            got: total,
            expected: x.ncols(),
        });
    }

    let mut start = 0;
    let parts = widths
        .iter()
        .map(|&width| {
            let part = x.slice(s![.., start..start + width]).to_owned();
            start += width;
            part
        })
        .collect();

    Ok(parts)
}
