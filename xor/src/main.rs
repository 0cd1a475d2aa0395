use evoneat::logging::{EvolutionLogger, ReportingLevel, Stats};
use evoneat::{GeneticConfig, Genome, Population, PopulationConfig};

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::error::Error;
use std::fs;

const ERROR_MARGIN: f32 = 0.3;
const MAX_FITNESS: f32 = 16.0;
const MAX_GENERATIONS: usize = 100;

/// Settings file layout, e.g. `xor/xor.ron`.
#[derive(Deserialize)]
struct Settings {
    genetic: GeneticConfig,
    population: PopulationConfig,
}

fn evaluate_xor(genome: &Genome) -> f32 {
    let values = [
        ([0.0, 0.0], 0.0),
        ([0.0, 1.0], 1.0),
        ([1.0, 0.0], 1.0),
        ([1.0, 1.0], 0.0),
    ];

    let mut errors = [0.0; 4];
    for (i, (input, output)) in values.iter().enumerate() {
        errors[i] = match genome.feed_forward(input) {
            Ok(outputs) => (outputs[0] - output).abs(),
            Err(_) => 1.0,
        };
        if errors[i] < ERROR_MARGIN {
            errors[i] = 0.0;
        }
    }

    (4.0 - errors.iter().sum::<f32>()).powf(2.0)
}

fn solved(population: &Population) -> bool {
    population
        .champion()
        .map_or(false, |c| (c.fitness() - MAX_FITNESS).abs() < f32::EPSILON)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => ron::from_str::<Settings>(&fs::read_to_string(path)?)?,
        None => Settings {
            genetic: GeneticConfig {
                weight_bound: 5.0,
                weight_shift_power: 0.5,
                ..GeneticConfig::new(2, 1)?
            },
            population: PopulationConfig {
                generations_to_extinction: Some(40),
                ..PopulationConfig::new(150)?
            },
        },
    };

    evolve_once(&settings)?;
    stress_test(&settings, 200);
    Ok(())
}

/// Evolves a single population, logging every generation,
/// and prints the champion in RON format.
fn evolve_once(settings: &Settings) -> Result<(), Box<dyn Error>> {
    let mut population = Population::new(settings.population.clone(), settings.genetic.clone())?;
    let mut logger = EvolutionLogger::new(ReportingLevel::SpeciesChampions);

    for _ in 0..MAX_GENERATIONS {
        population
            .genomes_mut()
            .par_iter_mut()
            .for_each(|genome| {
                let fitness = evaluate_xor(genome);
                genome.add_fitness(fitness);
            });
        logger.log(
            &population,
            &|g| [g.fitness(), g.nodes().len() as f32, g.connections().len() as f32],
            ["fitness", "nodes", "connections"],
        );
        if solved(&population) {
            break;
        }
        population.next_generation();
    }

    if let Some(log) = logger.last() {
        info!("{}", log);
    }
    match population.champion() {
        Some(champion) if solved(&population) => {
            info!(generation = population.generation(), "solution found");
            println!("{}", ron::ser::to_string_pretty(champion, Default::default())?);
        }
        _ => warn!(
            best_fitness = population.best_fitness(),
            "no solution within {} generations", MAX_GENERATIONS
        ),
    }
    Ok(())
}

/// Evolves independent populations in parallel, and reports
/// statistics on how many generations a solution took.
fn stress_test(settings: &Settings, iterations: u64) {
    let generations: Vec<Option<usize>> = (0..iterations)
        .into_par_iter()
        .map(|seed| {
            let mut population =
                Population::with_seed(settings.population.clone(), settings.genetic.clone(), seed)
                    .ok()?;
            for _ in 0..MAX_GENERATIONS {
                population.evaluate_fitness(evaluate_xor);
                if solved(&population) {
                    return Some(population.generation());
                }
                population.next_generation();
            }
            None
        })
        .collect();

    let failures = generations.iter().filter(|g| g.is_none()).count();
    info!(
        "Successful run generation count {:?}, {}% failure rate over {} iterations",
        Stats::from_data(generations.iter().flatten().map(|&g| g as f32)),
        failures as f32 * 100.0 / iterations as f32,
        iterations
    );
}
