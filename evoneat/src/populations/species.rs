use crate::genomics::{GeneticConfig, Genome, InnovationHistory};
use crate::populations::PopulationConfig;
use crate::rng::Chance;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Species identifier. Specifies
/// the generation in which the species
/// was born, and the count of other species
/// generated in the _same generation_ before
/// the one identified (i.e, if it was the
/// third species born in generation 5, it
/// will be species [5, 2]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub usize, pub usize);

/// Species are collections of reproductively
/// compatible genomes. Membership is determined
/// by calculating the compatibility distance to a
/// _representative_, the genome that founded the
/// species.
///
/// Species whose best fitness hasn't improved for
/// [`allowed_stagnancy`] generations are removed
/// from the population.
///
/// [`allowed_stagnancy`]: PopulationConfig::allowed_stagnancy
#[derive(Debug, Clone)]
pub struct Species {
    id: SpeciesId,
    pub(super) genomes: Vec<Genome>,
    representative: Genome,
    stagnation: usize,
    max_fitness: f32,
    average_fitness: f32,
    pub(super) allotted_offspring: usize,
}

impl Species {
    /// Creates a new species with the specified ID and
    /// representative. The representative is also added
    /// to the species' genome pool.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome};
    /// use evoneat::populations::{Species, SpeciesId};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(2, 1).unwrap();
    /// let species = Species::new(
    ///     SpeciesId(1, 0),
    ///     Genome::new(&config, &mut StdRng::seed_from_u64(0)),
    /// );
    ///
    /// assert_eq!(species.id(), SpeciesId(1, 0));
    /// assert_eq!(species.genomes().count(), 1);
    /// ```
    pub fn new(id: SpeciesId, representative: Genome) -> Species {
        Species {
            id,
            max_fitness: representative.fitness(),
            average_fitness: representative.fitness(),
            genomes: vec![representative.clone()],
            representative,
            stagnation: 0,
            allotted_offspring: 0,
        }
    }

    /// Returns the species' ID.
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    /// Returns the species' representative.
    pub fn representative(&self) -> &Genome {
        &self.representative
    }

    /// Returns the compatibility distance between the
    /// species' representative and `genome`, or `None`
    /// if they share no connections.
    pub fn compatibility(&self, genome: &Genome, config: &GeneticConfig) -> Option<f32> {
        Genome::compatibility(&self.representative, genome, config)
    }

    /// Returns whether `genome` is close enough to the
    /// representative to join the species: it must share
    /// at least one connection with it, and be strictly
    /// within the [`speciation_threshold`].
    ///
    /// [`speciation_threshold`]: PopulationConfig::speciation_threshold
    pub fn is_compatible(
        &self,
        genome: &Genome,
        genetic_config: &GeneticConfig,
        population_config: &PopulationConfig,
    ) -> bool {
        self.compatibility(genome, genetic_config)
            .map_or(false, |distance| distance < population_config.speciation_threshold)
    }

    /// Adds `genome` to the species if [compatible],
    /// and otherwise hands it back.
    ///
    /// [compatible]: Species::is_compatible
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome, PopulationConfig};
    /// use evoneat::populations::{Species, SpeciesId};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let genetic_config = GeneticConfig::new(2, 1).unwrap();
    /// let population_config = PopulationConfig::new(10).unwrap();
    /// let mut rng = StdRng::seed_from_u64(0);
    ///
    /// let genome = Genome::new(&genetic_config, &mut rng);
    /// let mut species = Species::new(SpeciesId(0, 0), genome.clone());
    ///
    /// assert!(species.maybe_accommodate(genome, &genetic_config, &population_config).is_ok());
    /// assert_eq!(species.genomes().count(), 2);
    /// ```
    pub fn maybe_accommodate(
        &mut self,
        genome: Genome,
        genetic_config: &GeneticConfig,
        population_config: &PopulationConfig,
    ) -> Result<(), Genome> {
        if self.is_compatible(&genome, genetic_config, population_config) {
            self.genomes.push(genome);
            Ok(())
        } else {
            Err(genome)
        }
    }

    /// Updates the species' record of maximum
    /// fitness, to keep track of stagnation.
    /// Empty species are maximally stagnated.
    pub fn update_stagnancy(&mut self) {
        let best = match self.genomes.iter().map(Genome::fitness).reduce(f32::max) {
            Some(best) => best,
            None => {
                self.stagnation = usize::MAX;
                return;
            }
        };
        if best >= self.max_fitness {
            self.stagnation = 0;
            self.max_fitness = best;
        } else {
            self.stagnation = self.stagnation.saturating_add(1);
        }
    }

    /// Applies fitness sharing: divides each member's
    /// fitness by the size of the species, and returns
    /// the average of the shared fitnesses.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome};
    /// use evoneat::populations::{Species, SpeciesId};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(1, 1).unwrap();
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut founder = Genome::new(&config, &mut rng);
    /// founder.add_fitness(6.0);
    /// let mut species = Species::new(SpeciesId(0, 0), founder.clone());
    /// let mut member = founder.clone();
    /// member.add_fitness(-4.0);
    /// # use evoneat::PopulationConfig;
    /// # let population_config = PopulationConfig::new(2).unwrap();
    /// species.maybe_accommodate(member, &config, &population_config).unwrap();
    ///
    /// // Shared fitnesses are 6 / 2 and 2 / 2.
    /// assert_eq!(species.calculate_average_fitness(), 2.0);
    /// assert_eq!(species.genomes().map(|g| g.fitness()).collect::<Vec<_>>(), vec![3.0, 1.0]);
    /// ```
    pub fn calculate_average_fitness(&mut self) -> f32 {
        if self.genomes.is_empty() {
            self.average_fitness = 0.0;
            return 0.0;
        }
        let size = self.genomes.len() as f32;
        let mut total = 0.0;
        for genome in &mut self.genomes {
            genome.share_fitness(size);
            total += genome.fitness();
        }
        self.average_fitness = total / size;
        self.average_fitness
    }

    /// Removes the worst half of the species (rounding
    /// the survivors up) if it has more than 2 members.
    /// Members must be ordered by decreasing fitness.
    pub fn cull_lower_half(&mut self) {
        let len = self.genomes.len();
        if len > 2 {
            self.genomes.truncate((len + 1) / 2);
        }
    }

    /// Produces `count` mutated offspring from the
    /// species' members.
    ///
    /// A lone member is cloned for every offspring.
    /// Otherwise, each offspring is a mutated clone of a
    /// single parent with probability [`progeny_mutation_ratio`],
    /// or else the mutated child of two distinct parents.
    /// Parents are selected with probability proportional
    /// to their fitness. An empty species produces nothing.
    ///
    /// [`progeny_mutation_ratio`]: PopulationConfig::progeny_mutation_ratio
    pub fn reproduce<R: Rng + ?Sized>(
        &self,
        history: &mut InnovationHistory,
        genetic_config: &GeneticConfig,
        population_config: &PopulationConfig,
        count: usize,
        rng: &mut R,
    ) -> Vec<Genome> {
        if self.genomes.is_empty() {
            return vec![];
        }
        let fitnesses: Vec<f32> = self.genomes.iter().map(Genome::fitness).collect();
        (0..count)
            .map(|_| {
                let mut child = if self.genomes.len() == 1
                    || rng.chance(population_config.progeny_mutation_ratio)
                {
                    self.genomes[select_proportionately(&fitnesses, rng)].offspring()
                } else {
                    let first = select_proportionately(&fitnesses, rng);
                    let others: Vec<usize> = (0..fitnesses.len()).filter(|&i| i != first).collect();
                    let other_fitnesses: Vec<f32> = others.iter().map(|&i| fitnesses[i]).collect();
                    let second = others[select_proportionately(&other_fitnesses, rng)];
                    Genome::crossover(&self.genomes[first], &self.genomes[second], genetic_config, rng)
                };
                child.mutate(history, genetic_config, rng);
                child
            })
            .collect()
    }

    /// Returns the number of generations the species
    /// has been stagnated.
    pub fn time_stagnated(&self) -> usize {
        self.stagnation
    }

    /// Returns the best fitness the species has reached.
    pub fn max_fitness(&self) -> f32 {
        self.max_fitness
    }

    /// Returns the species' average shared fitness,
    /// as of the last call to [`calculate_average_fitness`].
    ///
    /// [`calculate_average_fitness`]: Species::calculate_average_fitness
    pub fn average_fitness(&self) -> f32 {
        self.average_fitness
    }

    /// Returns the number of offspring the species
    /// was allotted in the last generation.
    pub fn allotted_offspring(&self) -> usize {
        self.allotted_offspring
    }

    /// Returns an iterator over the species' members.
    pub fn genomes(&self) -> impl Iterator<Item = &Genome> {
        self.genomes.iter()
    }

    /// Returns the currently best-performing genome,
    /// or `None` if the species is empty.
    pub fn champion(&self) -> Option<&Genome> {
        self.genomes
            .iter()
            .reduce(|best, g| if g.fitness() > best.fitness() { g } else { best })
    }
}

/// Returns the index of a randomly chosen element of `fitnesses`,
/// with probability proportional to its value. Falls back on a
/// uniform choice if every fitness is zero.
///
/// # Panics
/// Panics if `fitnesses` is empty.
pub(crate) fn select_proportionately<R: Rng + ?Sized>(fitnesses: &[f32], rng: &mut R) -> usize {
    // f64 keeps the sum finite for fitnesses near f32::MAX.
    let total: f64 = fitnesses.iter().map(|&f| f as f64).sum();
    if !(total > 0.0) {
        return rng.gen_range(0..fitnesses.len());
    }
    let threshold = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, &fitness) in fitnesses.iter().enumerate() {
        cumulative += fitness as f64;
        if cumulative >= threshold {
            return i;
        }
    }
    fitnesses.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn genome_with_fitness(config: &GeneticConfig, rng: &mut StdRng, fitness: f32) -> Genome {
        let mut genome = Genome::new(config, rng);
        genome.add_fitness(fitness);
        genome
    }

    fn species_of(fitnesses: &[f32]) -> Species {
        let config = GeneticConfig::new(2, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut genomes = fitnesses
            .iter()
            .map(|&f| genome_with_fitness(&config, &mut rng, f));
        let mut species = Species::new(SpeciesId(0, 0), genomes.next().unwrap());
        species.genomes.extend(genomes);
        species
    }

    #[test]
    fn rejects_genomes_without_common_connections() {
        let genetic_config = GeneticConfig {
            disjoint_gene_factor: 0.0,
            excess_gene_factor: 0.0,
            common_weight_factor: 0.0,
            ..GeneticConfig::new(1, 1).unwrap()
        };
        let population_config = PopulationConfig::new(10).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let representative = Genome::new(&genetic_config, &mut rng);
        let mut species = Species::new(SpeciesId(0, 0), representative);

        // Splitting a connection and dropping the initial ones
        // leaves only innovations the representative lacks.
        let mut history = InnovationHistory::new(&genetic_config);
        let mut stranger = Genome::new(&genetic_config, &mut rng);
        stranger.mutate_node(&mut history, &mut rng);
        let stranger = strip_initial(stranger);
        assert_eq!(stranger.connections().len(), 2);
        assert_eq!(species.compatibility(&stranger, &genetic_config), None);
        assert!(species
            .maybe_accommodate(stranger, &genetic_config, &population_config)
            .is_err());
        assert_eq!(species.genomes().count(), 1);
    }

    fn strip_initial(genome: Genome) -> Genome {
        let mut json = serde_json::to_value(&genome).unwrap();
        let connections = json["connections"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|c| c["id"].as_u64().unwrap() > 2)
            .cloned()
            .collect::<Vec<_>>();
        json["connections"] = serde_json::Value::Array(connections);
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn threshold_is_strict() {
        let genetic_config = GeneticConfig::new(1, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let representative = Genome::new(&genetic_config, &mut rng);
        let distance = |g: &Genome| Genome::compatibility(&representative, g, &genetic_config);
        let other = Genome::new(&genetic_config, &mut rng);
        let d = distance(&other).unwrap();
        assert!(d > 0.0);

        let mut species = Species::new(SpeciesId(0, 0), representative.clone());
        let at = PopulationConfig {
            speciation_threshold: d,
            ..PopulationConfig::new(10).unwrap()
        };
        assert!(!species.is_compatible(&other, &genetic_config, &at));
        let above = PopulationConfig {
            speciation_threshold: d * 1.01,
            ..at
        };
        assert!(species
            .maybe_accommodate(other, &genetic_config, &above)
            .is_ok());
    }

    #[test]
    fn stagnancy_tracking() {
        let mut species = species_of(&[4.0, 2.0]);
        species.update_stagnancy();
        assert_eq!(species.time_stagnated(), 0);
        assert_eq!(species.max_fitness(), 4.0);

        species.genomes.iter_mut().for_each(|g| g.add_fitness(-3.0));
        species.update_stagnancy();
        species.update_stagnancy();
        assert_eq!(species.time_stagnated(), 2);
        assert_eq!(species.max_fitness(), 4.0);

        // Matching the record counts as improvement.
        species.genomes[0].add_fitness(3.0);
        species.update_stagnancy();
        assert_eq!(species.time_stagnated(), 0);

        species.genomes.clear();
        species.update_stagnancy();
        assert_eq!(species.time_stagnated(), usize::MAX);
    }

    #[test]
    fn fitness_sharing_is_applied_in_place() {
        let mut species = species_of(&[9.0, 6.0, 3.0]);
        assert_eq!(species.calculate_average_fitness(), 2.0);
        let shared: Vec<_> = species.genomes().map(Genome::fitness).collect();
        assert_eq!(shared, vec![3.0, 2.0, 1.0]);
        assert_eq!(species.average_fitness(), 2.0);

        species.genomes.clear();
        assert_eq!(species.calculate_average_fitness(), 0.0);
    }

    #[test]
    fn culling_keeps_better_half_rounded_up() {
        for (len, survivors) in [(1, 1), (2, 2), (3, 2), (4, 2), (5, 3), (10, 5)] {
            let fitnesses: Vec<f32> = (0..len).rev().map(|f| f as f32).collect();
            let mut species = species_of(&fitnesses);
            species.cull_lower_half();
            assert_eq!(species.genomes().count(), survivors, "species of {}", len);
            assert_eq!(species.genomes[0].fitness(), (len - 1) as f32);
        }
    }

    #[test]
    fn proportional_selection() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut counts = [0usize; 3];
        for _ in 0..3000 {
            counts[select_proportionately(&[0.0, 1.0, 3.0], &mut rng)] += 1;
        }
        assert_eq!(counts[0], 0);
        assert!(counts[2] > counts[1] * 2);
    }

    #[test]
    fn selection_handles_huge_fitnesses() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut counts = [0usize; 2];
        for _ in 0..1000 {
            counts[select_proportionately(&[f32::MAX, f32::MAX], &mut rng)] += 1;
        }
        assert!(counts.iter().all(|&c| c > 300), "{:?}", counts);
    }

    #[test]
    fn zero_fitness_selection_is_uniform() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            counts[select_proportionately(&[0.0; 4], &mut rng)] += 1;
        }
        assert!(counts.iter().all(|&c| c > 800), "{:?}", counts);
    }

    #[test]
    fn reproduction_produces_requested_count() {
        let genetic_config = GeneticConfig::new(2, 1).unwrap();
        let population_config = PopulationConfig::new(10).unwrap();
        let mut history = InnovationHistory::new(&genetic_config);
        let mut rng = StdRng::seed_from_u64(10);

        let species = species_of(&[3.0, 2.0, 1.0]);
        let offspring = species.reproduce(&mut history, &genetic_config, &population_config, 7, &mut rng);
        assert_eq!(offspring.len(), 7);
        assert!(offspring.iter().all(|g| g.fitness() == 0.0));

        let lone = species_of(&[0.0]);
        let offspring = lone.reproduce(&mut history, &genetic_config, &population_config, 4, &mut rng);
        assert_eq!(offspring.len(), 4);

        let mut empty = species_of(&[1.0]);
        empty.genomes.clear();
        assert!(empty
            .reproduce(&mut history, &genetic_config, &population_config, 3, &mut rng)
            .is_empty());
    }

    fn without_structural_mutation(weight_mutation_chance: f32) -> GeneticConfig {
        GeneticConfig {
            connection_mutation_chance: 0.0,
            node_mutation_chance: 0.0,
            weight_mutation_chance,
            ..GeneticConfig::new(2, 1).unwrap()
        }
    }

    #[test]
    fn crossover_children_mix_two_distinct_parents() {
        let genetic_config = without_structural_mutation(0.0);
        let population_config = PopulationConfig {
            progeny_mutation_ratio: 0.0,
            ..PopulationConfig::new(10).unwrap()
        };
        let mut history = InnovationHistory::new(&genetic_config);
        let mut rng = StdRng::seed_from_u64(14);

        // The fitter genome is always picked first, so every
        // child must take its second parent from the others.
        let fitter = genome_with_fitness(&genetic_config, &mut rng, 1.0);
        let other = genome_with_fitness(&genetic_config, &mut rng, 0.0);
        let mut species = Species::new(SpeciesId(0, 0), fitter.clone());
        species.genomes.push(other.clone());

        let offspring = species.reproduce(&mut history, &genetic_config, &population_config, 30, &mut rng);
        let mut inherited_from_other = 0;
        for child in &offspring {
            assert_eq!(child.nodes(), fitter.nodes());
            for ((gene, f), o) in child
                .connections()
                .iter()
                .zip(fitter.connections())
                .zip(other.connections())
            {
                assert!(gene.weight() == f.weight() || gene.weight() == o.weight());
                if gene.weight() == o.weight() && gene.weight() != f.weight() {
                    inherited_from_other += 1;
                }
            }
        }
        assert!(inherited_from_other > 0);
    }

    #[test]
    fn lone_member_offspring_are_mutated_clones() {
        let genetic_config = without_structural_mutation(1.0);
        // Crossover is impossible with a single member.
        let population_config = PopulationConfig {
            progeny_mutation_ratio: 0.0,
            ..PopulationConfig::new(10).unwrap()
        };
        let mut history = InnovationHistory::new(&genetic_config);
        let mut rng = StdRng::seed_from_u64(15);
        let mut member = genome_with_fitness(&genetic_config, &mut rng, 2.0);
        member.mutate_node(&mut history, &mut rng);
        let species = Species::new(SpeciesId(0, 0), member.clone());

        let structure = |g: &Genome| -> Vec<_> {
            g.connections()
                .iter()
                .map(|c| (c.innovation(), c.endpoints(), c.enabled()))
                .collect()
        };
        let offspring = species.reproduce(&mut history, &genetic_config, &population_config, 5, &mut rng);
        assert_eq!(offspring.len(), 5);
        for child in &offspring {
            assert_eq!(child.nodes(), member.nodes());
            assert_eq!(structure(child), structure(&member));
            assert_ne!(child.connections(), member.connections());
            assert_eq!(child.fitness(), 0.0);
        }
    }

    #[test]
    fn champion_is_fittest_member() {
        let species = species_of(&[1.0, 5.0, 2.0]);
        assert_eq!(species.champion().map(Genome::fitness), Some(5.0));
    }
}
