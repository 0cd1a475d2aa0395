use crate::errors::{check_non_negative, check_probability, ConfigurationError};

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for population generation
/// and evolution.
///
/// Only [`size`] is required; every other field has
/// a default, both through [`PopulationConfig::new`]
/// and when deserializing.
///
/// [`size`]: PopulationConfig::size
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the population.
    pub size: NonZeroUsize,
    /// Chance that an offspring is a mutated clone
    /// of a single parent, instead of the result
    /// of crossover.
    #[serde(default = "defaults::progeny_mutation_ratio")]
    pub progeny_mutation_ratio: f32,
    /// Compatibility distance threshold, at or beyond
    /// which genomes are considered as belonging to
    /// different species.
    #[serde(default = "defaults::speciation_threshold")]
    pub speciation_threshold: f32,
    /// Number of generations without a fitness increase
    /// at which a species is removed.
    #[serde(default = "defaults::allowed_stagnancy")]
    pub allowed_stagnancy: usize,
    /// Number of generations without an increase of the
    /// best fitness ever seen after which the population
    /// is reset. `None` disables resets.
    #[serde(default)]
    pub generations_to_extinction: Option<usize>,
}

impl PopulationConfig {
    /// Returns a configuration for a population of
    /// the specified size, with every other value set
    /// to its default.
    ///
    /// # Errors
    /// Returns an error if `size` is zero.
    ///
    /// # Examples
    /// ```
    /// use evoneat::PopulationConfig;
    ///
    /// let config = PopulationConfig {
    ///     // Specify some values here...
    ///     allowed_stagnancy: 20,
    ///     // Default the rest...
    ///     ..PopulationConfig::new(150).unwrap()
    /// };
    ///
    /// assert_eq!(config.speciation_threshold, 3.0);
    /// assert!(PopulationConfig::new(0).is_err());
    /// ```
    pub fn new(size: usize) -> Result<PopulationConfig, ConfigurationError> {
        Ok(PopulationConfig {
            size: NonZeroUsize::new(size).ok_or(ConfigurationError::ZeroCount { field: "size" })?,
            progeny_mutation_ratio: defaults::progeny_mutation_ratio(),
            speciation_threshold: defaults::speciation_threshold(),
            allowed_stagnancy: defaults::allowed_stagnancy(),
            generations_to_extinction: None,
        })
    }

    /// Checks that the mutation ratio is in [0, 1]
    /// and the speciation threshold is finite and
    /// non-negative.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_probability("progeny_mutation_ratio", self.progeny_mutation_ratio)?;
        check_non_negative("speciation_threshold", self.speciation_threshold)
    }
}

mod defaults {
    pub(super) fn progeny_mutation_ratio() -> f32 {
        0.25
    }

    pub(super) fn speciation_threshold() -> f32 {
        3.0
    }

    pub(super) fn allowed_stagnancy() -> usize {
        15
    }
}
