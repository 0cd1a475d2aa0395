use thiserror::Error;

/// An error type indicating an invalid
/// genetic or population configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A required count was zero.
    #[error("'{field}' cannot be zero")]
    ZeroCount { field: &'static str },
    /// A probability fell outside of [0, 1].
    #[error("'{field}' should be between 0 and 1, got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f32 },
    /// A factor, threshold or magnitude was negative, NaN or infinite.
    #[error("'{field}' should be a finite, non-negative value, got {value}")]
    NegativeOrNonFinite { field: &'static str, value: f32 },
    /// A magnitude that must be strictly positive was zero.
    #[error("'{field}' should be strictly positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
}

pub(crate) fn check_probability(field: &'static str, value: f32) -> Result<(), ConfigurationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::ProbabilityOutOfRange { field, value })
    }
}

pub(crate) fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::NegativeOrNonFinite { field, value })
    }
}

pub(crate) fn check_positive(field: &'static str, value: f32) -> Result<(), ConfigurationError> {
    check_non_negative(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::NonPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_bounds_are_inclusive() {
        assert!(check_probability("p", 0.0).is_ok());
        assert!(check_probability("p", 1.0).is_ok());
        assert_eq!(
            check_probability("p", 1.5),
            Err(ConfigurationError::ProbabilityOutOfRange { field: "p", value: 1.5 })
        );
        assert!(check_probability("p", f32::NAN).is_err());
    }

    #[test]
    fn positivity_checks() {
        assert!(check_non_negative("c", 0.0).is_ok());
        assert!(check_non_negative("c", -0.1).is_err());
        assert!(check_non_negative("c", f32::INFINITY).is_err());
        assert_eq!(
            check_positive("b", 0.0),
            Err(ConfigurationError::NonPositive { field: "b", value: 0.0 })
        );
    }

    #[test]
    fn messages_name_the_field() {
        let e = ConfigurationError::ZeroCount { field: "input_count" };
        assert_eq!(e.to_string(), "'input_count' cannot be zero");
    }
}
