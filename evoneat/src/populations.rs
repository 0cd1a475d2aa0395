//! A Population is a collection of genomes.
//! These are grouped into species, which can
//! be evolved using a genome evaluation function
//! as the source of selective pressure.
mod config;
pub mod logging;
mod species;

use crate::errors::ConfigurationError;
use crate::genomics::{GeneticConfig, Genome, InnovationHistory};
pub use config::PopulationConfig;
pub use species::{Species, SpeciesId};

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};

use std::cmp::Ordering;

/// A population of genomes, together with the
/// innovation history and random number generator
/// that drive its evolution.
///
/// Each generation the caller assigns fitness to every
/// genome, through [`evaluate_fitness`] or directly on
/// [`genomes_mut`], and then calls [`next_generation`].
///
/// [`evaluate_fitness`]: Population::evaluate_fitness
/// [`genomes_mut`]: Population::genomes_mut
/// [`next_generation`]: Population::next_generation
#[derive(Clone, Debug)]
pub struct Population {
    genomes: Vec<Genome>,
    species: Vec<Species>,
    history: InnovationHistory,
    generation: usize,
    best_genome: Option<Genome>,
    best_fitness: f32,
    stagnation: usize,
    population_config: PopulationConfig,
    genetic_config: GeneticConfig,
    rng: StdRng,
}

impl Population {
    /// Creates a new population of freshly generated
    /// genomes, seeding its random number generator
    /// from system entropy.
    ///
    /// # Errors
    /// Returns an error if either configuration fails
    /// validation.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Population, PopulationConfig};
    ///
    /// let population_config = PopulationConfig {
    ///     // Set desired configuration
    ///     speciation_threshold: 2.0,
    ///     ..PopulationConfig::new(150).unwrap()
    /// };
    /// let genetic_config = GeneticConfig::new(3, 1).unwrap();
    ///
    /// let population = Population::new(population_config, genetic_config).unwrap();
    /// assert_eq!(population.genomes().len(), 150);
    /// ```
    pub fn new(
        population_config: PopulationConfig,
        genetic_config: GeneticConfig,
    ) -> Result<Population, ConfigurationError> {
        Population::with_rng(population_config, genetic_config, StdRng::from_entropy())
    }

    /// Creates a new population whose evolution is
    /// fully determined by `seed`.
    ///
    /// # Errors
    /// Returns an error if either configuration fails
    /// validation.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Population, PopulationConfig};
    ///
    /// let make = || {
    ///     Population::with_seed(
    ///         PopulationConfig::new(20).unwrap(),
    ///         GeneticConfig::new(2, 1).unwrap(),
    ///         7,
    ///     )
    ///     .unwrap()
    /// };
    ///
    /// assert_eq!(make().genomes(), make().genomes());
    /// ```
    pub fn with_seed(
        population_config: PopulationConfig,
        genetic_config: GeneticConfig,
        seed: u64,
    ) -> Result<Population, ConfigurationError> {
        Population::with_rng(population_config, genetic_config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        population_config: PopulationConfig,
        genetic_config: GeneticConfig,
        mut rng: StdRng,
    ) -> Result<Population, ConfigurationError> {
        population_config.validate()?;
        genetic_config.validate()?;
        Ok(Population {
            genomes: (0..population_config.size.get())
                .map(|_| Genome::new(&genetic_config, &mut rng))
                .collect(),
            species: vec![],
            history: InnovationHistory::new(&genetic_config),
            generation: 0,
            best_genome: None,
            best_fitness: 0.0,
            stagnation: 0,
            population_config,
            genetic_config,
            rng,
        })
    }

    /// Evaluates the fitness of each genome in the
    /// population using the passed evaluator, adding
    /// the result to the genome's fitness.
    ///
    /// Negative totals are floored at zero.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Population, PopulationConfig};
    ///
    /// let mut population = Population::with_seed(
    ///     PopulationConfig::new(10).unwrap(),
    ///     GeneticConfig::new(1, 1).unwrap(),
    ///     0,
    /// )
    /// .unwrap();
    ///
    /// population.evaluate_fitness(|g| {
    ///     // Networks with outputs closer to 0 are given higher scores.
    ///     let output = g.feed_forward(&[1.0]).unwrap()[0];
    ///     1.0 - output
    /// });
    ///
    /// assert!(population.genomes().iter().all(|g| g.fitness() > 0.0));
    /// ```
    pub fn evaluate_fitness<E>(&mut self, mut evaluator: E)
    where
        E: FnMut(&Genome) -> f32,
    {
        for genome in &mut self.genomes {
            let fitness = evaluator(genome);
            genome.add_fitness(fitness);
        }
    }

    /// Evolves the population by one generation, and
    /// returns the new genomes.
    ///
    /// Genomes are ranked by fitness and speciated.
    /// Stagnated species are removed, and the rest are
    /// allotted offspring in proportion to their average
    /// shared fitness. Species with more than 3 members
    /// keep a mutated copy of their champion. Any
    /// remaining slots are filled with mutated copies of
    /// the best genome found so far.
    ///
    /// If [`generations_to_extinction`] is set and the
    /// best fitness ever seen has not improved for longer
    /// than that, the population is instead replaced by
    /// freshly generated genomes (see [`reset`]), without
    /// resetting the generation count.
    ///
    /// The returned slice always holds exactly
    /// [`size`] genomes, all with zero fitness.
    ///
    /// [`generations_to_extinction`]: PopulationConfig::generations_to_extinction
    /// [`reset`]: Population::reset
    /// [`size`]: PopulationConfig::size
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Population, PopulationConfig};
    ///
    /// let mut population = Population::with_seed(
    ///     PopulationConfig::new(30).unwrap(),
    ///     GeneticConfig::new(2, 1).unwrap(),
    ///     1,
    /// )
    /// .unwrap();
    ///
    /// for _ in 0..5 {
    ///     population.evaluate_fitness(|g| g.nodes().len() as f32);
    ///     let genomes = population.next_generation();
    ///     assert_eq!(genomes.len(), 30);
    /// }
    /// assert_eq!(population.generation(), 5);
    /// assert_eq!(population.best_fitness(), population.best_genome().unwrap().fitness());
    /// ```
    pub fn next_generation(&mut self) -> &[Genome] {
        self.genomes
            .sort_by(|a, b| b.fitness().partial_cmp(&a.fitness()).unwrap_or(Ordering::Equal));
        self.record_champion();

        if let Some(limit) = self.population_config.generations_to_extinction {
            if self.stagnation > limit {
                info!(
                    generation = self.generation,
                    stagnation = self.stagnation,
                    "population stagnated, restarting"
                );
                self.renaissance();
                self.generation += 1;
                return &self.genomes;
            }
        }

        let fallback = self.genomes.first().map(Genome::offspring);
        self.speciate();
        self.prune_species();
        self.allot_offspring();
        let mut progeny = self.generate_offspring();
        self.pad(&mut progeny, fallback);

        progeny.truncate(self.population_config.size.get());
        self.genomes = progeny;
        self.generation += 1;
        &self.genomes
    }

    /// Updates the best genome on record, and the
    /// population-wide stagnation counter. Genomes
    /// must be sorted by decreasing fitness.
    fn record_champion(&mut self) {
        match self.genomes.first() {
            Some(champion) if champion.fitness() > self.best_fitness => {
                info!(
                    generation = self.generation,
                    fitness = champion.fitness(),
                    "new best fitness"
                );
                self.best_fitness = champion.fitness();
                self.best_genome = Some(champion.clone());
                self.stagnation = 0;
            }
            _ => self.stagnation = self.stagnation.saturating_add(1),
        }
    }

    /// Assigns every genome to the first species whose
    /// representative it is compatible with, in order
    /// of species creation. Genomes compatible with no
    /// species found a new one.
    fn speciate(&mut self) {
        for species in &mut self.species {
            species.genomes.clear();
        }
        let mut born = 0;
        'genomes: for genome in self.genomes.drain(..) {
            let mut genome = genome;
            for species in &mut self.species {
                match species.maybe_accommodate(genome, &self.genetic_config, &self.population_config) {
                    Ok(()) => continue 'genomes,
                    Err(rejected) => genome = rejected,
                }
            }
            let id = SpeciesId(self.generation, born);
            born += 1;
            debug!(species = ?id, "new species");
            self.species.push(Species::new(id, genome));
        }
    }

    /// Updates species stagnation, shares fitness among
    /// species members, culls the worst members, and
    /// removes empty or stagnated species.
    fn prune_species(&mut self) {
        for species in &mut self.species {
            species.update_stagnancy();
            species.calculate_average_fitness();
            species.cull_lower_half();
        }
        let allowed_stagnancy = self.population_config.allowed_stagnancy;
        self.species.retain(|s| {
            let survives = s.genomes().next().is_some() && s.time_stagnated() < allowed_stagnancy;
            if !survives {
                debug!(species = ?s.id(), stagnation = s.time_stagnated(), "species extinct");
            }
            survives
        });
    }

    /// Allots offspring proportionally to each species'
    /// average fitness, removing species allotted none.
    /// If no species has any fitness, all are allotted
    /// an equal share.
    fn allot_offspring(&mut self) {
        let size = self.population_config.size.get();
        let species_count = self.species.len();
        let total: f64 = self.species.iter().map(|s| s.average_fitness() as f64).sum();
        for species in &mut self.species {
            species.allotted_offspring = if total > 0.0 {
                (species.average_fitness() as f64 / total * size as f64).floor() as usize
            } else {
                size / species_count
            };
        }
        self.species.retain(|s| {
            if s.allotted_offspring == 0 {
                debug!(species = ?s.id(), "species allotted no offspring");
            }
            s.allotted_offspring > 0
        });
    }

    /// Generates each species' allotted offspring.
    fn generate_offspring(&mut self) -> Vec<Genome> {
        let mut progeny = Vec::with_capacity(self.population_config.size.get());
        for species in &self.species {
            let mut count = species.allotted_offspring;
            if species.genomes.len() > 3 {
                if let Some(champion) = species.champion() {
                    let mut elite = champion.offspring();
                    elite.mutate(&mut self.history, &self.genetic_config, &mut self.rng);
                    progeny.push(elite);
                    count -= 1;
                }
            }
            progeny.extend(species.reproduce(
                &mut self.history,
                &self.genetic_config,
                &self.population_config,
                count,
                &mut self.rng,
            ));
        }
        progeny
    }

    /// Fills the population up to its configured size
    /// with mutated copies of the best genome on record,
    /// or of `fallback` if there is none yet.
    fn pad(&mut self, progeny: &mut Vec<Genome>, fallback: Option<Genome>) {
        let missing = self.population_config.size.get().saturating_sub(progeny.len());
        if missing == 0 {
            return;
        }
        debug!(generation = self.generation, missing, "padding population");
        let parent = self.best_genome.as_ref().or(fallback.as_ref());
        for _ in 0..missing {
            let child = match parent {
                Some(parent) => {
                    let mut child = parent.offspring();
                    child.mutate(&mut self.history, &self.genetic_config, &mut self.rng);
                    child
                }
                None => Genome::new(&self.genetic_config, &mut self.rng),
            };
            progeny.push(child);
        }
    }

    /// Replaces every genome and the innovation history,
    /// and forgets all species and fitness records.
    fn renaissance(&mut self) {
        let size = self.population_config.size.get();
        self.history = InnovationHistory::new(&self.genetic_config);
        self.genomes = (0..size)
            .map(|_| Genome::new(&self.genetic_config, &mut self.rng))
            .collect();
        self.species.clear();
        self.best_genome = None;
        self.best_fitness = 0.0;
        self.stagnation = 0;
    }

    /// Resets the population to an initial randomized state,
    /// including the generation count. The random number
    /// generator is not reseeded.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Population, PopulationConfig};
    ///
    /// let mut population = Population::with_seed(
    ///     PopulationConfig::new(10).unwrap(),
    ///     GeneticConfig::new(2, 2).unwrap(),
    ///     3,
    /// )
    /// .unwrap();
    ///
    /// population.evaluate_fitness(|_| 1.0);
    /// population.next_generation();
    /// population.reset();
    ///
    /// assert_eq!(population.generation(), 0);
    /// assert_eq!(population.species().count(), 0);
    /// assert!(population.best_genome().is_none());
    /// ```
    pub fn reset(&mut self) {
        self.renaissance();
        self.generation = 0;
    }

    /// Returns the current generation's genomes.
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// Returns the current generation's genomes mutably,
    /// e.g. to assign fitness from a parallel iterator.
    pub fn genomes_mut(&mut self) -> &mut [Genome] {
        &mut self.genomes
    }

    /// Returns an iterator over the species formed in the
    /// last generation step. Their members are the parents
    /// of the current genomes, with shared fitness.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Population, PopulationConfig};
    ///
    /// let mut population = Population::with_seed(
    ///     PopulationConfig::new(40).unwrap(),
    ///     GeneticConfig::new(2, 1).unwrap(),
    ///     5,
    /// )
    /// .unwrap();
    /// population.evaluate_fitness(|_| 1.0);
    /// population.next_generation();
    ///
    /// for species in population.species() {
    ///     println!(
    ///         "Species {:?} has {} members and was allotted {} offspring",
    ///         species.id(),
    ///         species.genomes().count(),
    ///         species.allotted_offspring(),
    ///     );
    /// }
    /// ```
    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    /// Returns the best genome found so far, with the
    /// fitness it was evaluated at, or `None` if no genome
    /// has had positive fitness.
    pub fn best_genome(&self) -> Option<&Genome> {
        self.best_genome.as_ref()
    }

    /// Returns the best fitness found so far.
    pub fn best_fitness(&self) -> f32 {
        self.best_fitness
    }

    /// Returns the currently best-performing genome.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Population, PopulationConfig};
    ///
    /// let mut population = Population::with_seed(
    ///     PopulationConfig::new(20).unwrap(),
    ///     GeneticConfig::new(2, 1).unwrap(),
    ///     0,
    /// )
    /// .unwrap();
    ///
    /// let mut fitness = 0.0;
    /// population.evaluate_fitness(move |_| {
    ///     fitness += 10.0;
    ///     fitness
    /// });
    ///
    /// assert_eq!(population.champion().unwrap().fitness(), 20.0 * 10.0);
    /// ```
    pub fn champion(&self) -> Option<&Genome> {
        self.genomes
            .iter()
            .max_by(|a, b| a.fitness().partial_cmp(&b.fitness()).unwrap_or(Ordering::Equal))
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the population's innovation history.
    pub fn history(&self) -> &InnovationHistory {
        &self.history
    }

    /// Returns the population's configuration.
    pub fn population_config(&self) -> &PopulationConfig {
        &self.population_config
    }

    /// Returns the configuration the population's
    /// genomes are generated with.
    pub fn genetic_config(&self) -> &GeneticConfig {
        &self.genetic_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(size: usize, seed: u64) -> Population {
        Population::with_seed(
            PopulationConfig::new(size).unwrap(),
            GeneticConfig::new(2, 1).unwrap(),
            seed,
        )
        .unwrap()
    }

    #[test]
    fn construction_validates_configs() {
        let invalid = GeneticConfig {
            weight_mutation_chance: -0.1,
            ..GeneticConfig::new(2, 1).unwrap()
        };
        assert!(Population::with_seed(PopulationConfig::new(5).unwrap(), invalid, 0).is_err());

        let invalid = PopulationConfig {
            speciation_threshold: -1.0,
            ..PopulationConfig::new(5).unwrap()
        };
        assert!(Population::new(invalid, GeneticConfig::new(2, 1).unwrap()).is_err());
    }

    #[test]
    fn initial_genomes_share_innovations() {
        let population = population(10, 0);
        assert_eq!(population.history().max_connection_innovation(), 3);
        for genome in population.genomes() {
            let ids: Vec<_> = genome.connections().iter().map(|c| c.innovation()).collect();
            assert_eq!(ids, vec![1, 2, 3]);
        }
    }

    #[test]
    fn zero_fitness_generation_keeps_size() {
        let mut population = population(25, 1);
        for _ in 0..10 {
            assert_eq!(population.next_generation().len(), 25);
        }
        assert!(population.best_genome().is_none());
        assert_eq!(population.best_fitness(), 0.0);
    }

    #[test]
    fn best_genome_keeps_unshared_fitness() {
        let mut population = population(15, 2);
        let mut rank = 0.0;
        population.evaluate_fitness(|_| {
            rank += 1.0;
            rank
        });
        population.next_generation();
        assert_eq!(population.best_fitness(), 15.0);
        assert_eq!(population.best_genome().map(Genome::fitness), Some(15.0));
        assert!(population.genomes().iter().all(|g| g.fitness() == 0.0));
    }

    #[test]
    fn speciation_groups_compatible_genomes() {
        let mut population = Population::with_seed(
            PopulationConfig {
                speciation_threshold: f32::MAX,
                ..PopulationConfig::new(12).unwrap()
            },
            GeneticConfig::new(2, 1).unwrap(),
            3,
        )
        .unwrap();
        population.evaluate_fitness(|_| 1.0);
        population.next_generation();

        let species: Vec<_> = population.species().collect();
        assert_eq!(species.len(), 1);
        assert_eq!(species[0].id(), SpeciesId(0, 0));
        assert_eq!(species[0].allotted_offspring(), 12);
        // 12 members culled to 6, each sharing 1 / 12.
        assert_eq!(species[0].genomes().count(), 6);
        assert!((species[0].average_fitness() - 1.0 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn incompatible_genomes_found_new_species() {
        let mut population = Population::with_seed(
            PopulationConfig {
                speciation_threshold: 0.0,
                ..PopulationConfig::new(6).unwrap()
            },
            GeneticConfig::new(2, 1).unwrap(),
            4,
        )
        .unwrap();
        population.evaluate_fitness(|_| 1.0);
        population.next_generation();

        let ids: Vec<_> = population.species().map(Species::id).collect();
        assert_eq!(ids, (0..6).map(|i| SpeciesId(0, i)).collect::<Vec<_>>());
        assert!(population.species().all(|s| s.allotted_offspring() == 1));
        // Small species have no elite, so allotments fill the population.
        let allotted: usize = population.species().map(Species::allotted_offspring).sum();
        assert_eq!(allotted, 6);
        assert_eq!(population.genomes().len(), 6);
    }

    fn without_mutation() -> GeneticConfig {
        GeneticConfig {
            connection_mutation_chance: 0.0,
            node_mutation_chance: 0.0,
            weight_mutation_chance: 0.0,
            ..GeneticConfig::new(2, 1).unwrap()
        }
    }

    #[test]
    fn large_species_keep_one_elite_within_allotment() {
        let mut population = Population::with_seed(
            PopulationConfig {
                progeny_mutation_ratio: 1.0,
                ..PopulationConfig::new(10).unwrap()
            },
            without_mutation(),
            8,
        )
        .unwrap();
        let members: Vec<Genome> = population.genomes.drain(..4).collect();
        let lone = population.genomes[0].clone();

        let mut large = Species::new(SpeciesId(0, 0), members[0].clone());
        large.genomes.extend(members[1..].iter().cloned());
        large.allotted_offspring = 5;
        let mut small = Species::new(SpeciesId(0, 1), lone.clone());
        small.allotted_offspring = 2;
        population.species = vec![large, small];

        let progeny = population.generate_offspring();
        assert_eq!(progeny.len(), 7);
        // With equal fitness the first member is the champion.
        assert_eq!(progeny[0], members[0].offspring());
        assert!(progeny[1..5]
            .iter()
            .all(|child| members.iter().any(|m| m.offspring() == *child)));
        assert!(progeny[5..].iter().all(|child| *child == lone.offspring()));
    }

    #[test]
    fn padding_prefers_best_genome_then_fallback() {
        let mut population =
            Population::with_seed(PopulationConfig::new(6).unwrap(), without_mutation(), 9).unwrap();
        let mut best = population.genomes[3].clone();
        best.mutate_node(&mut population.history, &mut population.rng);
        best.add_fitness(5.0);
        population.best_genome = Some(best.clone());
        let fallback = population.genomes[0].offspring();

        let mut progeny = vec![population.genomes[1].offspring()];
        population.pad(&mut progeny, Some(fallback.clone()));
        assert_eq!(progeny.len(), 6);
        assert!(progeny[1..].iter().all(|g| *g == best.offspring()));

        population.best_genome = None;
        let mut progeny = vec![];
        population.pad(&mut progeny, Some(fallback.clone()));
        assert_eq!(progeny.len(), 6);
        assert!(progeny.iter().all(|g| *g == fallback));

        let mut progeny = vec![];
        population.pad(&mut progeny, None);
        assert_eq!(progeny.len(), 6);
        assert!(progeny.iter().all(|g| g.connections().len() == 3));
    }

    #[test]
    fn extinct_population_is_refilled_from_best_genome() {
        let mut population = Population::with_seed(
            PopulationConfig {
                allowed_stagnancy: 0,
                ..PopulationConfig::new(8).unwrap()
            },
            without_mutation(),
            10,
        )
        .unwrap();
        let mut rank = 0.0;
        population.evaluate_fitness(|_| {
            rank += 1.0;
            rank
        });
        population.next_generation();

        assert_eq!(population.best_fitness(), 8.0);
        let best = population.best_genome().unwrap().offspring();
        assert!(population.genomes().iter().all(|g| *g == best));
    }

    #[test]
    fn infinite_fitness_still_allots_offspring() {
        let mut population = population(10, 11);
        population.evaluate_fitness(|_| f32::INFINITY);
        population.next_generation();
        assert_eq!(population.best_fitness(), f32::MAX);
        assert!(population.species().count() > 0);
        assert!(population.species().all(|s| s.allotted_offspring() > 0));
        assert_eq!(population.genomes().len(), 10);
    }

    #[test]
    fn zero_allowed_stagnancy_removes_every_species() {
        let mut population = Population::with_seed(
            PopulationConfig {
                allowed_stagnancy: 0,
                ..PopulationConfig::new(8).unwrap()
            },
            GeneticConfig::new(2, 1).unwrap(),
            5,
        )
        .unwrap();
        population.evaluate_fitness(|_| 2.0);
        assert_eq!(population.next_generation().len(), 8);
        assert_eq!(population.species().count(), 0);
    }

    #[test]
    fn renaissance_after_prolonged_stagnation() {
        let mut population = Population::with_seed(
            PopulationConfig {
                generations_to_extinction: Some(2),
                ..PopulationConfig::new(10).unwrap()
            },
            GeneticConfig {
                connection_mutation_chance: 1.0,
                node_mutation_chance: 1.0,
                ..GeneticConfig::new(2, 1).unwrap()
            },
            6,
        )
        .unwrap();

        population.evaluate_fitness(|_| 1.0);
        population.next_generation();
        population.next_generation();
        population.next_generation();
        assert!(population.history().max_node_innovation() > 4);
        assert!(population.best_genome().is_some());

        // Stagnation now exceeds the limit.
        population.next_generation();
        assert_eq!(population.generation(), 4);
        assert_eq!(population.history().max_node_innovation(), 4);
        assert_eq!(population.history().max_connection_innovation(), 3);
        assert!(population.best_genome().is_none());
        assert_eq!(population.species().count(), 0);
        assert_eq!(population.genomes().len(), 10);
    }

    #[test]
    fn champion_is_current_best() {
        let mut population = population(5, 7);
        let mut i = 0.0;
        population.evaluate_fitness(|_| {
            i += 1.0;
            if i == 3.0 {
                100.0
            } else {
                i
            }
        });
        assert_eq!(population.champion().map(Genome::fitness), Some(100.0));
    }
}
