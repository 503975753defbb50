use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An operand's dimensions violate a layer or solver contract.
    #[error("shape mismatch in {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// A system that should be positive definite could not be factorized.
    ///
    /// With `gamma > 0` this does not happen; seeing it means the penalties
    /// were misconfigured.
    #[error("singular matrix: {0}")]
    SingularMatrix(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fail with [`Error::ShapeMismatch`] unless `actual == expected`.
#[inline]
pub(crate) fn ensure_shape(
    what: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<()> {
    if expected != actual {
        return Err(Error::ShapeMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_message_names_the_operand() {
        let err = ensure_shape("weights", (3, 4), (4, 3)).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("weights"));
        assert!(msg.contains("(3, 4)"));
        assert!(ensure_shape("weights", (3, 4), (3, 4)).is_ok());
    }
}
