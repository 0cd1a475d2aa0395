use crate::genomics::GeneticConfig;
use crate::rng::Chance;
use crate::Innovation;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Connection genes are the principal components of genomes.
/// They are created between two nodes, and become weighted
/// connections in the genome's network. Disabled genes are
/// kept in the genome but carry no signal.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ConnectionGene {
    id: Innovation,
    source: Innovation,
    destination: Innovation,
    weight: f32,
    enabled: bool,
}

impl ConnectionGene {
    /// Returns a new _enabled_ gene with the specified parameters.
    ///
    /// # Examples
    /// ```
    /// use evoneat::genomics::ConnectionGene;
    ///
    /// let gene = ConnectionGene::new(42, 3, 9, 0.5);
    /// assert!(gene.enabled());
    /// ```
    pub fn new(id: Innovation, source: Innovation, destination: Innovation, weight: f32) -> ConnectionGene {
        ConnectionGene {
            id,
            source,
            destination,
            weight,
            enabled: true,
        }
    }

    /// Returns a random weight. Uses a uniform distribution
    /// over the range ±[`weight_bound`].
    ///
    /// [`weight_bound`]: GeneticConfig::weight_bound
    pub(crate) fn random_weight<R: Rng + ?Sized>(rng: &mut R, config: &GeneticConfig) -> f32 {
        rng.gen_range(-config.weight_bound..=config.weight_bound)
    }

    /// Replaces the gene's weight with a fresh uniformly
    /// random value in ±[`weight_bound`].
    ///
    /// [`weight_bound`]: GeneticConfig::weight_bound
    ///
    /// # Examples
    /// ```
    /// use evoneat::GeneticConfig;
    /// use evoneat::genomics::ConnectionGene;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig {
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::new(1, 1).unwrap()
    /// };
    /// let mut gene = ConnectionGene::new(42, 3, 9, 2.0);
    /// gene.randomize_weight(&mut StdRng::seed_from_u64(0), &config);
    ///
    /// assert!(gene.weight().abs() <= 5.0);
    /// ```
    pub fn randomize_weight<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &GeneticConfig) {
        self.weight = Self::random_weight(rng, config);
    }

    /// Shifts the gene's weight by gaussian noise with a
    /// standard deviation of [`weight_shift_power`]. The result
    /// is clamped into ±[`weight_bound`].
    ///
    /// [`weight_shift_power`]: GeneticConfig::weight_shift_power
    /// [`weight_bound`]: GeneticConfig::weight_bound
    ///
    /// # Examples
    /// ```
    /// use evoneat::GeneticConfig;
    /// use evoneat::genomics::ConnectionGene;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(1, 1).unwrap();
    /// let mut gene = ConnectionGene::new(42, 3, 9, 0.99);
    /// gene.shift_weight(&mut StdRng::seed_from_u64(0), &config);
    ///
    /// assert!(gene.weight().abs() <= config.weight_bound);
    /// ```
    pub fn shift_weight<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &GeneticConfig) {
        let noise: f32 = rng.sample(StandardNormal);
        self.weight = (self.weight + noise * config.weight_shift_power)
            .clamp(-config.weight_bound, config.weight_bound);
    }

    /// Shifts the weight with probability [`weight_shift_chance`],
    /// and otherwise resets it.
    ///
    /// [`weight_shift_chance`]: GeneticConfig::weight_shift_chance
    pub fn mutate_weight<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &GeneticConfig) {
        if rng.chance(config.weight_shift_chance) {
            self.shift_weight(rng, config);
        } else {
            self.randomize_weight(rng, config);
        }
    }

    /// Returns the gene's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.id
    }

    /// Returns the gene's source node's innovation number.
    pub fn source(&self) -> Innovation {
        self.source
    }

    /// Returns the gene's destination node's innovation number.
    pub fn destination(&self) -> Innovation {
        self.destination
    }

    /// Returns the gene's source and destination, in that order.
    pub fn endpoints(&self) -> (Innovation, Innovation) {
        (self.source, self.destination)
    }

    /// Returns the gene's weight.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Sets the gene's weight.
    ///
    /// # Examples
    /// ```
    /// use evoneat::genomics::ConnectionGene;
    ///
    /// let mut gene = ConnectionGene::new(42, 3, 9, 2.0);
    /// gene.set_weight(-0.5);
    ///
    /// assert_eq!(gene.weight(), -0.5);
    /// ```
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    /// Returns whether the gene carries signal.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the gene.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl fmt::Display for ConnectionGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?}[{:?}->{:?}, {:.3}]{}",
            if self.enabled { "" } else { "(" },
            self.id,
            self.source,
            self.destination,
            self.weight,
            if self.enabled { "" } else { ")" },
        )
    }
}
