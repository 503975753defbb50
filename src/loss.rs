//! Margin loss used by the terminal layer.
//!
//! The terminal output solver minimizes this loss in closed form, so nothing here
//! participates in training directly. These helpers report the loss and map
//! bipolar targets onto binary labels.

use nalgebra::DMatrix;

use crate::error::ensure_shape;
use crate::{Error, Result};

/// Map a bipolar target entry onto a binary label: `+1 -> 1`, `-1 -> 0`.
#[inline]
pub fn bipolar_to_label(y: f64) -> Result<u8> {
    if y == 1.0 {
        Ok(1)
    } else if y == -1.0 {
        Ok(0)
    } else {
        Err(Error::InvalidData(format!(
            "target entries must be -1 or +1, got {y}"
        )))
    }
}

/// One-sided hinge loss.
///
/// - `label == 1`: `max(1 - z, 0)`
/// - `label == 0`: `max(z, 0)`
#[inline]
pub fn hinge(z: f64, label: u8) -> f64 {
    if label == 1 {
        (1.0 - z).max(0.0)
    } else {
        z.max(0.0)
    }
}

/// Sum of [`hinge`] over every entry of `z` against bipolar targets `y`.
pub fn hinge_sum(z: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<f64> {
    ensure_shape("target", z.shape(), y.shape())?;
    let mut total = 0.0;
    for (&z_ij, &y_ij) in z.iter().zip(y.iter()) {
        total += hinge(z_ij, bipolar_to_label(y_ij)?);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bipolar_mapping() {
        assert_eq!(bipolar_to_label(1.0).unwrap(), 1);
        assert_eq!(bipolar_to_label(-1.0).unwrap(), 0);
        assert!(bipolar_to_label(0.0).is_err());
        assert!(bipolar_to_label(f64::NAN).is_err());
    }

    #[test]
    fn hinge_is_one_sided() {
        assert_eq!(hinge(2.0, 1), 0.0);
        assert_eq!(hinge(0.25, 1), 0.75);
        assert_eq!(hinge(-1.0, 0), 0.0);
        assert_eq!(hinge(0.5, 0), 0.5);
    }

    #[test]
    fn hinge_sum_over_matrix() {
        let z = DMatrix::from_column_slice(3, 1, &[0.5, 2.0, -1.0]);
        let y = DMatrix::from_column_slice(3, 1, &[1.0, -1.0, -1.0]);
        assert_eq!(hinge_sum(&z, &y).unwrap(), 0.5 + 2.0 + 0.0);

        let bad = DMatrix::from_column_slice(2, 1, &[1.0, -1.0]);
        assert!(hinge_sum(&z, &bad).is_err());
    }
}
