use evoneat::logging::{EvolutionLogger, GenerationMemberRecord, ReportingLevel};
use evoneat::{GeneticConfig, Genome, Population, PopulationConfig};

use std::collections::HashMap;

fn evaluate_xor(genome: &Genome) -> f32 {
    let values = [
        ([0.0, 0.0], 0.0),
        ([0.0, 1.0], 1.0),
        ([1.0, 0.0], 1.0),
        ([1.0, 1.0], 0.0),
    ];
    let error: f32 = values
        .iter()
        .map(|(input, output)| (genome.feed_forward(input).unwrap()[0] - output).abs())
        .sum();
    (4.0 - error).powf(2.0)
}

fn xor_population(size: usize, seed: u64) -> Population {
    Population::with_seed(
        PopulationConfig::new(size).unwrap(),
        GeneticConfig {
            weight_bound: 5.0,
            weight_shift_power: 0.5,
            ..GeneticConfig::new(2, 1).unwrap()
        },
        seed,
    )
    .unwrap()
}

#[test]
fn population_size_is_preserved() {
    let mut population = xor_population(50, 0);
    for _ in 0..30 {
        population.evaluate_fitness(evaluate_xor);
        assert_eq!(population.next_generation().len(), 50);
        assert_eq!(population.genomes().len(), 50);
    }
    assert_eq!(population.generation(), 30);
}

#[test]
fn total_extinction_does_not_stall_evolution() {
    let mut population = Population::with_seed(
        PopulationConfig {
            allowed_stagnancy: 0,
            ..PopulationConfig::new(20).unwrap()
        },
        GeneticConfig::new(2, 1).unwrap(),
        1,
    )
    .unwrap();
    for _ in 0..50 {
        population.evaluate_fitness(evaluate_xor);
        assert_eq!(population.next_generation().len(), 20);
    }
    assert_eq!(population.generation(), 50);
}

#[test]
fn evolution_is_deterministic_under_a_seed() {
    let run = || {
        let mut population = xor_population(60, 42);
        for _ in 0..20 {
            population.evaluate_fitness(evaluate_xor);
            population.next_generation();
        }
        (
            population.genomes().to_vec(),
            population.best_fitness(),
            population.history().max_connection_innovation(),
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn best_fitness_never_decreases() {
    let mut population = xor_population(80, 3);
    let mut previous = 0.0;
    for _ in 0..40 {
        population.evaluate_fitness(evaluate_xor);
        population.next_generation();
        let best = population.best_fitness();
        assert!(best >= previous);
        assert_eq!(population.best_genome().map(Genome::fitness), Some(best));
        previous = best;
    }
    assert!(previous > 0.0);
}

#[test]
fn innovation_numbers_are_shared_across_genomes() {
    let mut population = Population::with_seed(
        PopulationConfig::new(100).unwrap(),
        GeneticConfig {
            connection_mutation_chance: 0.3,
            node_mutation_chance: 0.3,
            ..GeneticConfig::new(2, 1).unwrap()
        },
        4,
    )
    .unwrap();
    for _ in 0..15 {
        population.evaluate_fitness(evaluate_xor);
        population.next_generation();
    }

    // Every connection innovation denotes the same
    // endpoints in every genome carrying it.
    let mut endpoints = HashMap::new();
    for genome in population.genomes() {
        for connection in genome.connections() {
            let known = endpoints
                .entry(connection.innovation())
                .or_insert_with(|| connection.endpoints());
            assert_eq!(*known, connection.endpoints());
        }
    }
    let recorded: HashMap<_, _> = population
        .history()
        .connection_history()
        .map(|(&pair, &id)| (id, pair))
        .collect();
    for (id, pair) in endpoints {
        assert_eq!(recorded.get(&id), Some(&pair));
    }
}

#[test]
fn genomes_stay_acyclic_and_evaluable() {
    let mut population = Population::with_seed(
        PopulationConfig::new(40).unwrap(),
        GeneticConfig {
            connection_mutation_chance: 0.5,
            node_mutation_chance: 0.2,
            ..GeneticConfig::new(3, 2).unwrap()
        },
        5,
    )
    .unwrap();
    for _ in 0..25 {
        population.evaluate_fitness(|g| g.connections().iter().filter(|c| c.enabled()).count() as f32);
        population.next_generation();
    }
    for genome in population.genomes() {
        let x = |id| genome.nodes().iter().find(|n| n.id() == id).unwrap().x();
        for connection in genome.connections() {
            let (source, destination) = connection.endpoints();
            assert!(x(source) < x(destination), "{}", genome);
        }
        let outputs = genome.feed_forward(&[0.5, -0.5, 1.0]).unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(outputs.iter().all(|o| (0.0..=1.0).contains(o)));
    }
}

#[test]
fn renaissance_restarts_a_stagnated_population() {
    let mut population = Population::with_seed(
        PopulationConfig {
            generations_to_extinction: Some(3),
            ..PopulationConfig::new(30).unwrap()
        },
        GeneticConfig::new(2, 1).unwrap(),
        6,
    )
    .unwrap();

    // A constant fitness never improves on the first generation.
    let mut reset_at = None;
    for generation in 0..10 {
        population.evaluate_fitness(|_| 1.0);
        population.next_generation();
        if population.best_genome().is_none() {
            reset_at = Some(generation);
            break;
        }
    }
    assert_eq!(reset_at, Some(4));
    assert_eq!(population.generation(), 5);
    assert_eq!(population.genomes().len(), 30);
    assert_eq!(population.history().max_connection_innovation(), 3);
}

#[test]
fn logger_records_species_champions() {
    let mut population = xor_population(40, 7);
    let mut logger = EvolutionLogger::new(ReportingLevel::SpeciesChampions);
    for _ in 0..5 {
        population.evaluate_fitness(evaluate_xor);
        population.next_generation();
        logger.log(&population, &|g| [g.connections().len() as f32], ["connections"]);
    }

    assert_eq!(logger.iter().count(), 5);
    for (i, log) in logger.iter().enumerate() {
        assert_eq!(log.generation_number, i + 1);
        match &log.generation_sample {
            GenerationMemberRecord::SpeciesChampions(champions) => {
                assert_eq!(champions.len(), log.species_count);
            }
            other => panic!("unexpected record {:?}", other),
        }
        assert!(log.genome_stats[0].1.minimum >= 3.0);
    }
}
