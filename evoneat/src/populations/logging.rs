use super::{Population, SpeciesId};
use crate::Genome;

use std::fmt;

/// Defines different possible reporting levels for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportingLevel {
    /// Clones every species and its members.
    AllGenomes,
    /// Clones species and their champions.
    SpeciesChampions,
    /// Clones only the population champion.
    PopulationChampion,
    /// Clones no genomes.
    NoGenomes,
}

/// A snapshot of a population.
#[derive(Clone, Debug)]
pub struct Log {
    pub generation_number: usize,
    pub generation_sample: GenerationMemberRecord,
    pub species_count: usize,
    pub best_fitness: f32,
    pub genome_stats: Vec<(String, Stats)>,
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Log {{\n\
            \tgeneration_number: {:?}\n\
            \tspecies_count: {:?}\n\
            \tbest_fitness: {:?}\n\
            {}\
            }}",
            &self.generation_number,
            &self.species_count,
            &self.best_fitness,
            self.genome_stats
                .iter()
                .map(|(name, stats)| format!("\t{}: {:?}\n", name, stats))
                .collect::<Vec<_>>()
                .join("")
        )
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub maximum: f32,
    pub minimum: f32,
    pub mean: f32,
    pub median: f32,
}

impl Stats {
    /// Returns statistics about numbers in a sequence,
    /// or `None` if the sequence is empty.
    ///
    /// # Examples
    /// ```
    /// use evoneat::logging::Stats;
    ///
    /// let stats = Stats::from_data([-2.0, -1.0, 0.5, 1.0, 1.5]).unwrap();
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    ///
    /// assert_eq!(Stats::from_data([4.0, 1.0, 3.0, 2.0]).unwrap().median, 2.5);
    /// assert!(Stats::from_data(std::iter::empty()).is_none());
    /// ```
    pub fn from_data(data: impl IntoIterator<Item = f32>) -> Option<Stats> {
        let mut data: Vec<f32> = data.into_iter().collect();
        if data.is_empty() {
            return None;
        }
        data.sort_unstable_by(f32::total_cmp);
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Some(Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f32>() / data.len() as f32,
            median,
        })
    }
}

/// A reporting-level dependant store
/// of genomes from a population.
///
/// Species membership is that of the most recent
/// speciation, i.e. the parents of the current genomes.
#[derive(Clone, Debug)]
pub enum GenerationMemberRecord {
    /// Species IDs, genomes and stagnation level.
    Species(Vec<(SpeciesId, Vec<Genome>, usize)>),
    /// Only species IDs, species champions, and stagnation level.
    SpeciesChampions(Vec<(SpeciesId, Genome, usize)>),
    /// Only the population's current champion.
    PopulationChampion(Genome),
    /// Empty.
    None,
}

/// A log of the evolution of a population over time.
#[derive(Clone, Debug)]
pub struct EvolutionLogger {
    reporting_level: ReportingLevel,
    logs: Vec<Log>,
}

impl EvolutionLogger {
    /// Returns a logger with the appropiate reporting level.
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger {
        EvolutionLogger {
            reporting_level,
            logs: vec![],
        }
    }

    /// Store a snapshot of a population.
    ///
    /// The `genome_stat_extractor` provides a way of
    /// obtaining arbitrary statistics on the population,
    /// where each statistic is named by `stat_names`.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Population, PopulationConfig};
    /// use evoneat::logging::{EvolutionLogger, ReportingLevel};
    ///
    /// let mut logger = EvolutionLogger::new(ReportingLevel::NoGenomes);
    /// let mut population = Population::with_seed(
    ///     PopulationConfig::new(10).unwrap(),
    ///     GeneticConfig::new(2, 1).unwrap(),
    ///     42,
    /// )
    /// .unwrap();
    ///
    /// // Evaluate the population...
    /// population.evaluate_fitness(|g| g.connections().len() as f32);
    /// // Then log a snapshot.
    /// logger.log(&population, &|g| [g.fitness(), g.nodes().len() as f32], ["fitness", "nodes"]);
    ///
    /// let log = logger.iter().next().unwrap();
    /// assert_eq!(log.genome_stats[0].1.maximum, 3.0);
    /// assert_eq!(log.genome_stats[1].0, "nodes");
    /// ```
    pub fn log<GSE, const N: usize>(
        &mut self,
        population: &Population,
        genome_stat_extractor: &GSE,
        stat_names: [&str; N],
    ) where
        GSE: Fn(&Genome) -> [f32; N],
    {
        let stats: Vec<[f32; N]> = population.genomes().iter().map(genome_stat_extractor).collect();
        let genome_stats = stat_names
            .iter()
            .map(|name| name.to_string())
            .zip(unzip_n_vecs(stats))
            .filter_map(|(name, data)| Stats::from_data(data).map(|stats| (name, stats)))
            .collect();
        self.logs.push(Log {
            generation_number: population.generation(),
            generation_sample: match self.reporting_level {
                ReportingLevel::AllGenomes => GenerationMemberRecord::Species(
                    population
                        .species()
                        .map(|s| (s.id(), s.genomes().cloned().collect(), s.time_stagnated()))
                        .collect(),
                ),
                ReportingLevel::SpeciesChampions => GenerationMemberRecord::SpeciesChampions(
                    population
                        .species()
                        .filter_map(|s| s.champion().map(|c| (s.id(), c.clone(), s.time_stagnated())))
                        .collect(),
                ),
                ReportingLevel::PopulationChampion => population
                    .champion()
                    .cloned()
                    .map_or(GenerationMemberRecord::None, GenerationMemberRecord::PopulationChampion),
                ReportingLevel::NoGenomes => GenerationMemberRecord::None,
            },
            species_count: population.species().count(),
            best_fitness: population.best_fitness(),
            genome_stats,
        })
    }

    /// Iterate over all logged snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Log> {
        self.logs.iter()
    }

    /// Returns the most recent snapshot.
    pub fn last(&self) -> Option<&Log> {
        self.logs.last()
    }
}

fn unzip_n_vecs<T: Clone, const N: usize>(rows: Vec<[T; N]>) -> Vec<Vec<T>> {
    let mut vecs = vec![Vec::with_capacity(rows.len()); N];
    for row in rows {
        for (vec, item) in vecs.iter_mut().zip(row) {
            vec.push(item);
        }
    }
    vecs
}
