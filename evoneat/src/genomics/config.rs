use crate::errors::{check_non_negative, check_positive, check_probability, ConfigurationError};

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for genome generation
/// and inter-genome operations.
///
/// Only [`input_count`] and [`output_count`] are required;
/// every other field has a default, both through
/// [`GeneticConfig::new`] and when deserializing.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. This is
/// checked by [`GeneticConfig::validate`], which
/// populations call on construction.
///
/// [`input_count`]: GeneticConfig::input_count
/// [`output_count`]: GeneticConfig::output_count
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Number of inputs in a genome, excluding the bias.
    pub input_count: NonZeroUsize,
    /// Number of outputs in a genome.
    pub output_count: NonZeroUsize,
    /// Chance of a connection addition mutation
    /// taking place during mutation.
    #[serde(default = "defaults::connection_mutation_chance")]
    pub connection_mutation_chance: f32,
    /// Chance of a node addition mutation
    /// taking place during mutation.
    #[serde(default = "defaults::node_mutation_chance")]
    pub node_mutation_chance: f32,
    /// Chance, drawn independently per connection,
    /// of a connection's weight being mutated.
    #[serde(default = "defaults::weight_mutation_chance")]
    pub weight_mutation_chance: f32,
    /// Chance of a mutated weight being shifted by
    /// gaussian noise, instead of being reset.
    #[serde(default = "defaults::weight_shift_chance")]
    pub weight_shift_chance: f32,
    /// Standard deviation of the gaussian weight shift.
    #[serde(default = "defaults::weight_shift_power")]
    pub weight_shift_power: f32,
    /// Maximum magnitude of a connection's weight.
    #[serde(default = "defaults::weight_bound")]
    pub weight_bound: f32,
    /// Chance that a connection enabled in only one
    /// parent is enabled in the offspring.
    #[serde(default = "defaults::cross_gene_active_chance")]
    pub cross_gene_active_chance: f32,
    /// Weight of disjoint genes in compatibility distance.
    #[serde(default = "defaults::disjoint_gene_factor")]
    pub disjoint_gene_factor: f32,
    /// Weight of excess genes in compatibility distance.
    #[serde(default = "defaults::excess_gene_factor")]
    pub excess_gene_factor: f32,
    /// Weight of the average weight difference of
    /// common genes in compatibility distance.
    #[serde(default = "defaults::common_weight_factor")]
    pub common_weight_factor: f32,
}

impl GeneticConfig {
    /// Returns a configuration for genomes with the
    /// specified number of inputs and outputs, and
    /// every other value set to its default.
    ///
    /// # Errors
    /// Returns an error if either count is zero.
    ///
    /// # Examples
    /// ```
    /// use evoneat::GeneticConfig;
    ///
    /// let config = GeneticConfig::new(2, 1).unwrap();
    /// assert_eq!(config.connection_mutation_chance, 0.05);
    ///
    /// let tweaked = GeneticConfig {
    ///     // Specify some values here...
    ///     node_mutation_chance: 0.1,
    ///     // Default the rest...
    ///     ..GeneticConfig::new(2, 1).unwrap()
    /// };
    ///
    /// assert!(GeneticConfig::new(0, 1).is_err());
    /// ```
    pub fn new(input_count: usize, output_count: usize) -> Result<GeneticConfig, ConfigurationError> {
        Ok(GeneticConfig {
            input_count: NonZeroUsize::new(input_count)
                .ok_or(ConfigurationError::ZeroCount { field: "input_count" })?,
            output_count: NonZeroUsize::new(output_count)
                .ok_or(ConfigurationError::ZeroCount { field: "output_count" })?,
            connection_mutation_chance: defaults::connection_mutation_chance(),
            node_mutation_chance: defaults::node_mutation_chance(),
            weight_mutation_chance: defaults::weight_mutation_chance(),
            weight_shift_chance: defaults::weight_shift_chance(),
            weight_shift_power: defaults::weight_shift_power(),
            weight_bound: defaults::weight_bound(),
            cross_gene_active_chance: defaults::cross_gene_active_chance(),
            disjoint_gene_factor: defaults::disjoint_gene_factor(),
            excess_gene_factor: defaults::excess_gene_factor(),
            common_weight_factor: defaults::common_weight_factor(),
        })
    }

    /// Checks that every probability is in [0, 1],
    /// and every factor and magnitude is finite and
    /// non-negative (the weight bound strictly positive).
    ///
    /// # Examples
    /// ```
    /// use evoneat::GeneticConfig;
    ///
    /// let config = GeneticConfig {
    ///     weight_mutation_chance: 1.2,
    ///     ..GeneticConfig::new(3, 2).unwrap()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_probability("connection_mutation_chance", self.connection_mutation_chance)?;
        check_probability("node_mutation_chance", self.node_mutation_chance)?;
        check_probability("weight_mutation_chance", self.weight_mutation_chance)?;
        check_probability("weight_shift_chance", self.weight_shift_chance)?;
        check_probability("cross_gene_active_chance", self.cross_gene_active_chance)?;
        check_non_negative("weight_shift_power", self.weight_shift_power)?;
        check_positive("weight_bound", self.weight_bound)?;
        check_non_negative("disjoint_gene_factor", self.disjoint_gene_factor)?;
        check_non_negative("excess_gene_factor", self.excess_gene_factor)?;
        check_non_negative("common_weight_factor", self.common_weight_factor)
    }
}

mod defaults {
    pub(super) fn connection_mutation_chance() -> f32 {
        0.05
    }

    pub(super) fn node_mutation_chance() -> f32 {
        0.03
    }

    pub(super) fn weight_mutation_chance() -> f32 {
        0.8
    }

    pub(super) fn weight_shift_chance() -> f32 {
        0.9
    }

    pub(super) fn weight_shift_power() -> f32 {
        0.05
    }

    pub(super) fn weight_bound() -> f32 {
        1.0
    }

    pub(super) fn cross_gene_active_chance() -> f32 {
        0.25
    }

    pub(super) fn disjoint_gene_factor() -> f32 {
        1.0
    }

    pub(super) fn excess_gene_factor() -> f32 {
        1.0
    }

    pub(super) fn common_weight_factor() -> f32 {
        0.4
    }
}
