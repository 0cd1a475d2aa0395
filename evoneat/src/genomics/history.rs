use crate::genomics::{ConnectionGene, GeneticConfig, Genome};
use crate::Innovation;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::hash_map::{Entry, HashMap};

/// The innovation numbers assigned to a node addition
/// mutation: the connection into the new node, the
/// new node itself, and the connection out of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSplit {
    /// Connection from the split connection's source to the new node.
    pub left: Innovation,
    /// The new node.
    pub node: Innovation,
    /// Connection from the new node to the split connection's destination.
    pub right: Innovation,
}

/// An `InnovationHistory` keeps track of connection and node
/// innovations in a population, in order to make sure identical
/// mutations are assigned the same innovation numbers.
///
/// For connection innovations the source and destination nodes are
/// used to identify identical mutations, and the corresponding
/// innovation number is recorded.
///
/// For node innovations the endpoints of the split connection identify
/// identical mutations, and the [`NodeSplit`] numbers are recorded.
/// The two connections created by a split are also recorded as regular
/// connection innovations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnovationHistory {
    next_connection_innovation: Innovation,
    next_node_innovation: Innovation,
    connection_innovations: HashMap<(Innovation, Innovation), Innovation, RandomState>,
    node_innovations: HashMap<(Innovation, Innovation), Vec<NodeSplit>, RandomState>,
}

impl InnovationHistory {
    /// Creates a new history for genomes with the configured
    /// number of inputs and outputs.
    ///
    /// Nodes are numbered starting at 1: inputs first, then
    /// the bias, then outputs. The initial, fully-connected
    /// genes are numbered starting at 1 in source-major order,
    /// and are recorded as already discovered.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, InnovationHistory};
    ///
    /// let history = InnovationHistory::new(&GeneticConfig::new(2, 1).unwrap());
    ///
    /// // Inputs 1 and 2, bias 3, output 4.
    /// assert_eq!(history.max_node_innovation(), 4);
    /// // One connection from each input and the bias.
    /// assert_eq!(history.max_connection_innovation(), 3);
    /// ```
    pub fn new(config: &GeneticConfig) -> InnovationHistory {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();
        let connection_innovations = initial_connections(input_count, output_count)
            .map(|(id, source, destination)| ((source, destination), id))
            .collect();
        InnovationHistory {
            next_connection_innovation: (input_count + 1) * output_count + 1,
            next_node_innovation: input_count + output_count + 2,
            connection_innovations,
            node_innovations: HashMap::default(),
        }
    }

    /// Returns the innovation number of the connection
    /// between `source` and `destination`. A new number is
    /// generated and recorded if the connection is new.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, InnovationHistory};
    ///
    /// let mut history = InnovationHistory::new(&GeneticConfig::new(2, 1).unwrap());
    ///
    /// let id = history.add_connection(1, 7);
    /// assert_eq!(id, 4);
    /// assert_eq!(history.add_connection(1, 7), id);
    /// // Initial connections are already known.
    /// assert_eq!(history.add_connection(2, 4), 2);
    /// ```
    pub fn add_connection(&mut self, source: Innovation, destination: Innovation) -> Innovation {
        match self.connection_innovations.entry((source, destination)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.next_connection_innovation;
                entry.insert(id);
                self.next_connection_innovation += 1;
                id
            }
        }
    }

    /// Returns the innovation numbers for splitting `connection`
    /// with a new node. If the same connection has been split
    /// before (by any genome), the first recorded split is returned.
    ///
    /// The returned node may therefore already be part of a genome
    /// that split the same connection before. Use [`add_node_for`]
    /// when building a genome by hand, so that a second split of
    /// the same connection receives fresh numbers.
    ///
    /// [`add_node_for`]: InnovationHistory::add_node_for
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, InnovationHistory};
    /// use evoneat::genomics::ConnectionGene;
    ///
    /// let mut history = InnovationHistory::new(&GeneticConfig::new(2, 1).unwrap());
    /// let connection = ConnectionGene::new(1, 1, 4, 0.5);
    ///
    /// let split = history.add_node(&connection);
    /// assert_eq!((split.left, split.node, split.right), (4, 5, 5));
    /// assert_eq!(history.add_node(&connection), split);
    ///
    /// // The new connections are known to the history.
    /// assert_eq!(history.add_connection(1, 5), split.left);
    /// ```
    pub fn add_node(&mut self, connection: &ConnectionGene) -> NodeSplit {
        self.split_connection(connection.source(), connection.destination(), |_| false)
    }

    /// Returns the innovation numbers for `genome` splitting
    /// `connection`: the first recorded split whose node is not
    /// already in `genome`, or a newly generated one.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, Genome, InnovationHistory};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GeneticConfig::new(1, 1).unwrap();
    /// let mut history = InnovationHistory::new(&config);
    /// let genome = Genome::new(&config, &mut StdRng::seed_from_u64(0));
    /// let connection = genome.connections()[0].clone();
    ///
    /// let split = history.add_node_for(&connection, &genome);
    /// assert_eq!(split, history.add_node(&connection));
    /// ```
    pub fn add_node_for(&mut self, connection: &ConnectionGene, genome: &Genome) -> NodeSplit {
        self.split_connection(connection.source(), connection.destination(), |node| {
            genome.nodes().iter().any(|n| n.id() == node)
        })
    }

    /// Returns the first recorded split of `source -> destination`
    /// whose node is not `owned`, generating and recording a new
    /// split if there is none.
    ///
    /// A genome that splits the same connection twice thus receives
    /// the second split on record, which any other genome splitting
    /// that connection twice will also receive.
    pub(crate) fn split_connection<F>(
        &mut self,
        source: Innovation,
        destination: Innovation,
        owned: F,
    ) -> NodeSplit
    where
        F: Fn(Innovation) -> bool,
    {
        if let Some(split) = self
            .node_innovations
            .get(&(source, destination))
            .and_then(|splits| splits.iter().find(|s| !owned(s.node)))
        {
            return *split;
        }

        let node = self.next_node_innovation;
        self.next_node_innovation += 1;
        let left = self.add_connection(source, node);
        let right = self.add_connection(node, destination);
        let split = NodeSplit { left, node, right };
        self.node_innovations
            .entry((source, destination))
            .or_default()
            .push(split);
        split
    }

    /// Returns the highest connection innovation number generated.
    pub fn max_connection_innovation(&self) -> Innovation {
        self.next_connection_innovation - 1
    }

    /// Returns the hightest node innovation number generated.
    pub fn max_node_innovation(&self) -> Innovation {
        self.next_node_innovation - 1
    }

    /// Returns an iterator over the complete record of
    /// connection innovations, in the format
    /// `((source node, destination node), connection innovation)`.
    /// No ordering is guaranteed.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{GeneticConfig, InnovationHistory};
    ///
    /// let history = InnovationHistory::new(&GeneticConfig::new(3, 2).unwrap());
    ///
    /// for ((source, destination), id) in history.connection_history() {
    ///     println!("connection {} from node {} to node {}", id, source, destination);
    /// }
    /// # assert_eq!(history.connection_history().count(), 4 * 2);
    /// ```
    pub fn connection_history(
        &self,
    ) -> impl Iterator<Item = (&(Innovation, Innovation), &Innovation)> {
        self.connection_innovations.iter()
    }

    /// Returns an iterator over the complete record of
    /// node innovations, in the format
    /// `((source node, destination node), splits)`,
    /// with splits in the order they were generated.
    /// No ordering is guaranteed between connections.
    pub fn node_history(&self) -> impl Iterator<Item = (&(Innovation, Innovation), &[NodeSplit])> {
        self.node_innovations
            .iter()
            .map(|(endpoints, splits)| (endpoints, splits.as_slice()))
    }
}

/// Returns the `(innovation, source, destination)` triplets
/// of a freshly generated genome's connections: every input
/// and the bias connected to every output, source-major.
pub(crate) fn initial_connections(
    input_count: usize,
    output_count: usize,
) -> impl Iterator<Item = (Innovation, Innovation, Innovation)> {
    let first_output = input_count + 2;
    (1..=input_count + 1)
        .flat_map(move |source| {
            (first_output..first_output + output_count).map(move |destination| (source, destination))
        })
        .enumerate()
        .map(|(i, (source, destination))| (i + 1, source, destination))
}
