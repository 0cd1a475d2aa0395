//! An implementation of NeuroEvolution of Augmenting Topologies,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! Genomes encode feed-forward neural networks as lists of node and
//! connection genes, each tagged with an innovation number shared by
//! every genome in a population. A [`Population`] groups genomes into
//! species, and evolves them by fitness-proportionate reproduction,
//! crossover and structural mutation. Generational population logging
//! is supported through [`logging`].
//!
//! The engine performs no I/O and installs no `tracing` subscriber;
//! diagnostic events are emitted for whichever subscriber the
//! application sets up.
//!
//! # Example usage: Evolution of XOR function approximator
//! ```
//! use evoneat::{GeneticConfig, Genome, Population, PopulationConfig};
//!
//! // Allowed error margin for neural net answers.
//! const ERROR_MARGIN: f32 = 0.3;
//!
//! fn evaluate_xor(genome: &Genome) -> f32 {
//!     let values = [
//!         ([0.0, 0.0], 0.0),
//!         ([0.0, 1.0], 1.0),
//!         ([1.0, 0.0], 1.0),
//!         ([1.0, 1.0], 0.0),
//!     ];
//!
//!     let mut errors = [0.0; 4];
//!     for (i, (input, output)) in values.iter().enumerate() {
//!         errors[i] = (genome.feed_forward(input).unwrap()[0] - output).abs();
//!         if errors[i] < ERROR_MARGIN {
//!             errors[i] = 0.0;
//!         }
//!     }
//!
//!     (4.0 - errors.iter().sum::<f32>()).powf(2.0)
//! }
//!
//! fn main() {
//!     let genetic_config = GeneticConfig {
//!         weight_bound: 5.0,
//!         weight_shift_power: 0.5,
//!         ..GeneticConfig::new(2, 1).unwrap()
//!     };
//!
//!     let population_config = PopulationConfig {
//!         speciation_threshold: 3.0,
//!         allowed_stagnancy: 15,
//!         ..PopulationConfig::new(150).unwrap()
//!     };
//!
//!     let mut population = Population::with_seed(population_config, genetic_config, 42).unwrap();
//!     for _ in 0..100 {
//!         population.evaluate_fitness(evaluate_xor);
//!         if (population.champion().unwrap().fitness() - 16.0).abs() < f32::EPSILON {
//!             println!("Solution found!: {}", population.champion().unwrap());
//!             break;
//!         }
//!         population.next_generation();
//!     }
//! }
//! ```

mod errors;
pub mod genomics;
pub mod populations;
mod rng;

pub use errors::ConfigurationError;
pub use genomics::{GeneticConfig, Genome, InnovationHistory};
pub use populations::{logging, Population, PopulationConfig};

/// Identifier type used to designate historically
/// identical mutations for the purposes of
/// genome comparison and genetic tracking.
pub type Innovation = usize;
