//! Errors raised by the numeric core.
//!
//! Every variant is a caller-visible result; nothing in the core retries or
//! treats one of these as fatal.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Non-physical input rejected at the boundary of the core
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// No finite terminal velocity exists for the given traction force
    #[error("Model infeasible: K1 = {k1:e}, K2 = {k2:e}; both must be positive for a finite terminal velocity")]
    ModelInfeasible { k1: f64, k2: f64 },

    /// Ratio with a zero denominator that has no policy-defined fallback
    #[error("Undefined ratio: {0}")]
    UndefinedRatio(&'static str),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    pub fn invalid<S: Into<String>>(name: &'static str, reason: S) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Returns `InvalidParameter` unless `val` is finite and strictly positive
pub fn ensure_positive(name: &'static str, val: f64) -> ModelResult<()> {
    if val.is_finite() && val > 0.0 {
        Ok(())
    } else {
        Err(ModelError::invalid(name, format!("must be finite and > 0, got {val}")))
    }
}

/// Returns `InvalidParameter` unless `val` is finite and non-negative
pub fn ensure_non_negative(name: &'static str, val: f64) -> ModelResult<()> {
    if val.is_finite() && val >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::invalid(name, format!("must be finite and >= 0, got {val}")))
    }
}

/// Returns `InvalidParameter` unless `val` is finite
pub fn ensure_finite(name: &'static str, val: f64) -> ModelResult<()> {
    if val.is_finite() {
        Ok(())
    } else {
        Err(ModelError::invalid(name, format!("must be finite, got {val}")))
    }
}

/// Returns `InvalidParameter` unless `val` lies in [0, 1]
pub fn ensure_fraction(name: &'static str, val: f64) -> ModelResult<()> {
    if (0.0..=1.0).contains(&val) {
        Ok(())
    } else {
        Err(ModelError::invalid(name, format!("must be within [0, 1], got {val}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_checks() {
        assert!(ensure_positive("mass_kg", 2570.0).is_ok());
        assert!(ensure_positive("mass_kg", 0.0).is_err());
        assert!(ensure_positive("mass_kg", f64::NAN).is_err());
        assert!(ensure_non_negative("rr_coef_static", 0.0).is_ok());
        assert!(ensure_non_negative("rr_coef_static", -1e-3).is_err());
        assert!(ensure_fraction("regen_eff", 1.0).is_ok());
        assert!(ensure_fraction("regen_eff", 1.01).is_err());
        assert!(ensure_fraction("regen_eff", f64::NAN).is_err());
        assert!(ensure_finite("headwind_mps", f64::INFINITY).is_err());
    }

    #[test]
    fn test_error_converts_to_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(ModelError::ModelInfeasible { k1: -1.0, k2: 1e-4 })?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(err.to_string().contains("Model infeasible"));
        assert!(matches!(
            err.downcast_ref::<ModelError>(),
            Some(ModelError::ModelInfeasible { .. })
        ));
    }
}
