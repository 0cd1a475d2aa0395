//! Genomes are the focus of evolution in NEAT.
//! They are a collection of connection genes and nodes
//! that are evaluated as a feed-forward neural network.
//! Genomes can be progressively mutated, thus adding
//! complexity and functionality.

mod config;
mod errors;
mod genes;
mod history;
mod nodes;

pub use config::GeneticConfig;
pub use errors::InvalidInputError;
pub use genes::ConnectionGene;
pub use history::{InnovationHistory, NodeSplit};
pub use nodes::{NodeGene, NodeType};

use crate::rng::Chance;
use crate::Innovation;

use ahash::RandomState;
use rand::prelude::{Rng, SliceRandom};
use serde::{Deserialize, Serialize};
use tracing::trace;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Below this many connections in both genomes, compatibility
/// distance does not normalize by genome size.
const SMALL_GENOME_SIZE: usize = 20;

/// A mutable collection of connection genes and nodes.
///
/// Nodes are kept ordered by position (and then innovation
/// number), which is a valid evaluation order since every
/// connection points towards greater `x`. Connections are
/// kept ordered by innovation number.
///
/// Suports Serde for convenient genome saving and loading.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Genome {
    input_count: usize,
    output_count: usize,
    nodes: Vec<NodeGene>,
    connections: Vec<ConnectionGene>,
    fitness: f32,
}

impl Genome {
    /// Create a new genome with the specified configuration.
    ///
    /// The genome has `input_count` inputs plus a bias, and
    /// `output_count` outputs. Every input (and the bias) is
    /// connected to every output with a uniformly random weight.
    /// Nodes and connections are numbered as described in
    /// [`InnovationHistory::new`].
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome};
    /// use evoneat::genomics::NodeType;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(3, 2).unwrap();
    /// let genome = Genome::new(&config, &mut StdRng::seed_from_u64(0));
    ///
    /// // As configured, the genome should have 3 inputs + 1 bias + 2 outputs.
    /// assert_eq!(genome.nodes().len(), 3 + 1 + 2);
    /// assert_eq!(genome.nodes().iter().filter(|n| n.node_type() == NodeType::Sensor).count(), 4);
    /// assert_eq!(genome.nodes().iter().filter(|n| n.node_type() == NodeType::Actuator).count(), 2);
    ///
    /// // There is a connection for every sensor-actuator pair.
    /// assert_eq!(genome.connections().len(), 4 * 2);
    ///
    /// // All connections should have weights within the established bound.
    /// assert!(genome.connections().iter().all(|c| c.weight().abs() <= config.weight_bound));
    /// ```
    pub fn new<R: Rng + ?Sized>(config: &GeneticConfig, rng: &mut R) -> Genome {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();

        let mut nodes = Vec::with_capacity(input_count + output_count + 1);
        let dy = 1.0 / (input_count + 2) as f32;
        nodes.extend((1..=input_count + 1).map(|id| NodeGene::new(id, 0.0, id as f32 * dy)));
        let dy = 1.0 / (output_count + 1) as f32;
        nodes.extend(
            (1..=output_count).map(|o| NodeGene::new(input_count + 1 + o, 1.0, o as f32 * dy)),
        );

        let connections = history::initial_connections(input_count, output_count)
            .map(|(id, source, destination)| {
                ConnectionGene::new(id, source, destination, ConnectionGene::random_weight(rng, config))
            })
            .collect();

        Genome {
            input_count,
            output_count,
            nodes,
            connections,
            fitness: 0.0,
        }
    }

    /// Evaluates the genome's network on the passed input values,
    /// returning the activation of each output node.
    ///
    /// The bias node always has a value of 1.
    ///
    /// # Errors
    /// Returns an error if the number of values differs from
    /// the genome's input count, or if any value is not finite.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(2, 1).unwrap();
    /// let genome = Genome::new(&config, &mut StdRng::seed_from_u64(0));
    ///
    /// let outputs = genome.feed_forward(&[1.0, 0.0]).unwrap();
    /// assert_eq!(outputs.len(), 1);
    /// assert!(0.0 < outputs[0] && outputs[0] < 1.0);
    ///
    /// assert!(genome.feed_forward(&[1.0]).is_err());
    /// ```
    pub fn feed_forward(&self, values: &[f32]) -> Result<Vec<f32>, InvalidInputError> {
        self.check_inputs(values)?;

        let mut outgoing: HashMap<Innovation, Vec<&ConnectionGene>, RandomState> =
            HashMap::with_capacity_and_hasher(self.nodes.len(), RandomState::new());
        for connection in self.connections.iter().filter(|c| c.enabled()) {
            outgoing.entry(connection.source()).or_default().push(connection);
        }

        let mut table: HashMap<Innovation, f32, RandomState> =
            HashMap::with_capacity_and_hasher(self.nodes.len(), RandomState::new());
        table.extend(values.iter().enumerate().map(|(i, v)| (i + 1, *v)));
        table.insert(self.bias_id(), 1.0);

        for node in &self.nodes {
            let activation = node.activate(table.get(&node.id()).copied().unwrap_or(0.0));
            // Every connection into this node has already been
            // propagated, so the sum can be replaced.
            table.insert(node.id(), activation);
            for connection in outgoing.get(&node.id()).into_iter().flatten() {
                *table.entry(connection.destination()).or_insert(0.0) +=
                    activation * connection.weight();
            }
        }

        Ok(self
            .output_ids()
            .map(|id| table.get(&id).copied().unwrap_or(0.0))
            .collect())
    }

    /// Evaluates the genome and returns the index of the
    /// output with the highest activation (the first, on ties).
    ///
    /// # Errors
    /// Fails under the same conditions as [`Genome::feed_forward`].
    pub fn argmax(&self, values: &[f32]) -> Result<usize, InvalidInputError> {
        let outputs = self.feed_forward(values)?;
        Ok(first_extremum(&outputs, |candidate, best| candidate > best))
    }

    /// Evaluates the genome and returns the index of the
    /// output with the lowest activation (the first, on ties).
    ///
    /// # Errors
    /// Fails under the same conditions as [`Genome::feed_forward`].
    pub fn argmin(&self, values: &[f32]) -> Result<usize, InvalidInputError> {
        let outputs = self.feed_forward(values)?;
        Ok(first_extremum(&outputs, |candidate, best| candidate < best))
    }

    fn check_inputs(&self, values: &[f32]) -> Result<(), InvalidInputError> {
        if values.len() != self.input_count {
            return Err(InvalidInputError::InputCountMismatch {
                expected: self.input_count,
                found: values.len(),
            });
        }
        match values.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(InvalidInputError::NonFiniteInput {
                index,
                value: values[index],
            }),
            None => Ok(()),
        }
    }

    /// Randomly mutates the genome's connection weights.
    /// Each connection is independently mutated with
    /// probability [`weight_mutation_chance`]; see
    /// [`ConnectionGene::mutate_weight`].
    ///
    /// [`weight_mutation_chance`]: GeneticConfig::weight_mutation_chance
    pub fn mutate_weights<R: Rng + ?Sized>(&mut self, config: &GeneticConfig, rng: &mut R) {
        for connection in &mut self.connections {
            if rng.chance(config.weight_mutation_chance) {
                connection.mutate_weight(rng, config);
            }
        }
    }

    /// Induces a _connection mutation_ in the genome.
    /// A random node is connected to a random node with
    /// greater `x` that it isn't already connected to.
    ///
    /// Returns the newly added connection, or `None` if
    /// the genome is fully connected.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome, InnovationHistory};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(2, 1).unwrap();
    /// let mut history = InnovationHistory::new(&config);
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut genome = Genome::new(&config, &mut rng);
    ///
    /// // A fresh genome is fully connected.
    /// assert!(genome.mutate_connection(&mut history, &config, &mut rng).is_none());
    ///
    /// // Splitting a connection opens up new pairs.
    /// genome.mutate_node(&mut history, &mut rng);
    /// assert!(genome.mutate_connection(&mut history, &config, &mut rng).is_some());
    /// ```
    pub fn mutate_connection<R: Rng + ?Sized>(
        &mut self,
        history: &mut InnovationHistory,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Option<&ConnectionGene> {
        let (source, destination) = {
            let existing: HashSet<(Innovation, Innovation), RandomState> =
                self.connections.iter().map(ConnectionGene::endpoints).collect();
            let free_destinations = |source: &NodeGene| -> Vec<Innovation> {
                self.nodes
                    .iter()
                    .filter(|n| n.x() > source.x() && !existing.contains(&(source.id(), n.id())))
                    .map(NodeGene::id)
                    .collect()
            };
            let sources: Vec<&NodeGene> = self
                .nodes
                .iter()
                .filter(|n| n.node_type() != NodeType::Actuator)
                .filter(|n| !free_destinations(*n).is_empty())
                .collect();
            let source: &NodeGene = *sources.choose(rng)?;
            let destination = *free_destinations(source).choose(rng)?;
            (source.id(), destination)
        };

        let id = history.add_connection(source, destination);
        let weight = ConnectionGene::random_weight(rng, config);
        trace!(id, source, destination, "connection mutation");
        let index = self.insert_connection(ConnectionGene::new(id, source, destination, weight));
        Some(&self.connections[index])
    }

    /// Induces a _node mutation_ in the genome.
    /// A random connection is disabled and replaced by a
    /// new node and two connections: one into the node with
    /// a weight of 1, and one out of it with the weight of
    /// the original connection.
    ///
    /// The new node sits at the midpoint of the connection's
    /// endpoints, so only connections whose endpoints have a
    /// representable position strictly between them are
    /// candidates.
    ///
    /// Returns the innovation numbers of the split, or `None`
    /// if there is no candidate connection.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome, InnovationHistory};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(2, 1).unwrap();
    /// let mut history = InnovationHistory::new(&config);
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut genome = Genome::new(&config, &mut rng);
    ///
    /// let split = genome.mutate_node(&mut history, &mut rng).unwrap();
    ///
    /// assert_eq!(genome.nodes().len(), 5);
    /// assert_eq!(genome.connections().len(), 5);
    /// assert_eq!(genome.connections().iter().filter(|c| !c.enabled()).count(), 1);
    /// assert!(genome.nodes().iter().any(|n| n.id() == split.node));
    /// ```
    pub fn mutate_node<R: Rng + ?Sized>(
        &mut self,
        history: &mut InnovationHistory,
        rng: &mut R,
    ) -> Option<NodeSplit> {
        let splittable: Vec<usize> = (0..self.connections.len())
            .filter(|&i| {
                let (source, destination) = self.connections[i].endpoints();
                match (self.node(source), self.node(destination)) {
                    (Some(left), Some(right)) => NodeGene::can_split(left, right),
                    _ => false,
                }
            })
            .collect();
        let index = *splittable.choose(rng)?;
        let (source, destination) = self.connections[index].endpoints();
        let left = *self.node(source)?;
        let right = *self.node(destination)?;

        let split = history.add_node_for(&self.connections[index], self);
        let node = NodeGene::between(split.node, &left, &right)?;
        trace!(source, destination, node = split.node, "node mutation");

        let weight = self.connections[index].weight();
        self.connections[index].set_enabled(false);
        self.insert_node(node);
        self.insert_connection(ConnectionGene::new(split.left, source, split.node, 1.0));
        self.insert_connection(ConnectionGene::new(split.right, split.node, destination, weight));
        Some(split)
    }

    /// Mutates the genome: first its weights, then with probability
    /// [`connection_mutation_chance`] a single connection mutation,
    /// then with probability [`node_mutation_chance`] a single node
    /// mutation.
    ///
    /// [`connection_mutation_chance`]: GeneticConfig::connection_mutation_chance
    /// [`node_mutation_chance`]: GeneticConfig::node_mutation_chance
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        history: &mut InnovationHistory,
        config: &GeneticConfig,
        rng: &mut R,
    ) {
        self.mutate_weights(config, rng);
        if rng.chance(config.connection_mutation_chance) {
            self.mutate_connection(history, config, rng);
        }
        if rng.chance(config.node_mutation_chance) {
            self.mutate_node(history, rng);
        }
    }

    /// Combines two genomes and returns an offspring.
    ///
    /// The fitter parent (`parent1` on ties) passes on all of
    /// its nodes and its disjoint and excess connections. Each
    /// connection common to both parents is copied from a random
    /// parent; if it is enabled in only one of them, it is
    /// enabled with probability [`cross_gene_active_chance`].
    ///
    /// The offspring has zero fitness and is not mutated.
    ///
    /// [`cross_gene_active_chance`]: GeneticConfig::cross_gene_active_chance
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(2, 1).unwrap();
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut mother = Genome::new(&config, &mut rng);
    /// let father = Genome::new(&config, &mut rng);
    /// mother.add_fitness(3.0);
    ///
    /// let child = Genome::crossover(&mother, &father, &config, &mut rng);
    /// assert_eq!(child.nodes(), mother.nodes());
    /// assert_eq!(child.fitness(), 0.0);
    /// ```
    pub fn crossover<R: Rng + ?Sized>(
        parent1: &Genome,
        parent2: &Genome,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Genome {
        let (male, female) = if parent2.fitness > parent1.fitness {
            (parent2, parent1)
        } else {
            (parent1, parent2)
        };

        let mut female_genes = female.connections.iter().peekable();
        let connections = male
            .connections
            .iter()
            .map(|gene| {
                while female_genes
                    .peek()
                    .map_or(false, |f| f.innovation() < gene.innovation())
                {
                    female_genes.next();
                }
                match female_genes.peek() {
                    Some(f) if f.innovation() == gene.innovation() => {
                        let mut inherited = if rng.gen_bool(0.5) {
                            gene.clone()
                        } else {
                            (*f).clone()
                        };
                        if gene.enabled() != f.enabled() {
                            inherited.set_enabled(rng.chance(config.cross_gene_active_chance));
                        }
                        inherited
                    }
                    _ => gene.clone(),
                }
            })
            .collect();

        Genome {
            input_count: male.input_count,
            output_count: male.output_count,
            nodes: male.nodes.clone(),
            connections,
            fitness: 0.0,
        }
    }

    /// Returns the compatibility distance between two genomes,
    /// or `None` if they have no connection in common.
    ///
    /// Connections present in only one genome are _excess_ if
    /// their innovation number is beyond the other genome's
    /// highest, and _disjoint_ otherwise. The distance is
    ///
    /// `disjoint_gene_factor * D / N + excess_gene_factor * E / N + common_weight_factor * W`
    ///
    /// where `W` is the average weight difference of common
    /// connections, and `N` is the size of the larger genome
    /// (or 1 if both have fewer than 20 connections).
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(2, 1).unwrap();
    /// let genome = Genome::new(&config, &mut StdRng::seed_from_u64(0));
    ///
    /// assert_eq!(Genome::compatibility(&genome, &genome, &config), Some(0.0));
    /// ```
    pub fn compatibility(first: &Genome, second: &Genome, config: &GeneticConfig) -> Option<f32> {
        let (a, b) = (&first.connections, &second.connections);
        let (mut i, mut j) = (0, 0);
        let (mut matching, mut disjoint) = (0usize, 0usize);
        let mut weight_difference = 0.0;

        while i < a.len() && j < b.len() {
            match a[i].innovation().cmp(&b[j].innovation()) {
                Ordering::Equal => {
                    matching += 1;
                    weight_difference += (a[i].weight() - b[j].weight()).abs();
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    disjoint += 1;
                    i += 1;
                }
                Ordering::Greater => {
                    disjoint += 1;
                    j += 1;
                }
            }
        }
        let excess = (a.len() - i) + (b.len() - j);

        if matching == 0 {
            return None;
        }

        let n = if a.len() < SMALL_GENOME_SIZE && b.len() < SMALL_GENOME_SIZE {
            1.0
        } else {
            a.len().max(b.len()) as f32
        };

        Some(
            config.disjoint_gene_factor * disjoint as f32 / n
                + config.excess_gene_factor * excess as f32 / n
                + config.common_weight_factor * weight_difference / matching as f32,
        )
    }

    /// Adds `delta` to the genome's fitness.
    /// Fitness never drops below zero, and saturates
    /// at `f32::MAX`. A NaN `delta` is ignored.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(1, 1).unwrap();
    /// let mut genome = Genome::new(&config, &mut StdRng::seed_from_u64(0));
    ///
    /// genome.add_fitness(2.0);
    /// genome.add_fitness(1.5);
    /// assert_eq!(genome.fitness(), 3.5);
    ///
    /// genome.add_fitness(-10.0);
    /// assert_eq!(genome.fitness(), 0.0);
    /// ```
    pub fn add_fitness(&mut self, delta: f32) {
        let fitness = self.fitness + delta;
        if !fitness.is_nan() {
            self.fitness = fitness.clamp(0.0, f32::MAX);
        }
    }

    /// Returns the genome's fitness value.
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    /// Divides the genome's fitness by `divisor`,
    /// as done during fitness sharing.
    pub(crate) fn share_fitness(&mut self, divisor: f32) {
        self.fitness /= divisor;
    }

    /// Returns a copy of the genome with zero fitness.
    pub(crate) fn offspring(&self) -> Genome {
        Genome {
            fitness: 0.0,
            ..self.clone()
        }
    }

    /// Returns the genome's nodes, ordered by position.
    pub fn nodes(&self) -> &[NodeGene] {
        &self.nodes
    }

    /// Returns the genome's connections, ordered by innovation number.
    pub fn connections(&self) -> &[ConnectionGene] {
        &self.connections
    }

    /// Returns the number of inputs, excluding the bias.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Returns the number of outputs.
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    fn bias_id(&self) -> Innovation {
        self.input_count + 1
    }

    fn output_ids(&self) -> impl Iterator<Item = Innovation> {
        let first = self.input_count + 2;
        first..first + self.output_count
    }

    fn node(&self, id: Innovation) -> Option<&NodeGene> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    fn insert_node(&mut self, node: NodeGene) -> usize {
        let index = self
            .nodes
            .partition_point(|n| evaluation_order(n, &node) == Ordering::Less);
        self.nodes.insert(index, node);
        index
    }

    fn insert_connection(&mut self, connection: ConnectionGene) -> usize {
        let index = self
            .connections
            .partition_point(|c| c.innovation() < connection.innovation());
        self.connections.insert(index, connection);
        index
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self.nodes.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        let connections = self
            .connections
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>();
        f.debug_struct("Genome")
            .field("Nodes", &nodes)
            .field("Connections", &connections)
            .field("Fitness", &self.fitness)
            .finish()
    }
}

fn evaluation_order(a: &NodeGene, b: &NodeGene) -> Ordering {
    a.x().total_cmp(&b.x()).then(a.id().cmp(&b.id()))
}

fn first_extremum(values: &[f32], better: impl Fn(f32, f32) -> bool) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if better(v, values[best]) {
            best = i;
        }
    }
    best
}
