use crate::Innovation;

use serde::{Deserialize, Serialize};

use std::fmt;

/// A NodeType indicates the function of a node
/// in the genome's network, as derived from its
/// horizontal position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Input and bias nodes (x = 0).
    Sensor,
    /// Hidden nodes (0 < x < 1).
    Neuron,
    /// Output nodes (x = 1).
    Actuator,
}

/// Nodes are the structural elements of genomes
/// between which connections are created.
///
/// The `x` coordinate places the node between the
/// inputs (0) and the outputs (1); connections always
/// run towards greater `x`. The `y` coordinate is a
/// layout hint only.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct NodeGene {
    id: Innovation,
    x: f32,
    y: f32,
}

impl NodeGene {
    /// Generate a new node with the passed parameters.
    ///
    /// # Examples
    /// ```
    /// use evoneat::genomics::{NodeGene, NodeType};
    ///
    /// let node = NodeGene::new(5, 0.5, 0.25);
    /// assert_eq!(node.node_type(), NodeType::Neuron);
    /// ```
    pub fn new(id: Innovation, x: f32, y: f32) -> NodeGene {
        NodeGene { id, x, y }
    }

    /// Returns a node placed halfway between `left` and `right`,
    /// or `None` if their positions are too close for the
    /// midpoint to lie strictly between them.
    pub(crate) fn between(id: Innovation, left: &NodeGene, right: &NodeGene) -> Option<NodeGene> {
        let x = midpoint(left.x, right.x)?;
        Some(NodeGene {
            id,
            x,
            y: (left.y + right.y) / 2.0,
        })
    }

    /// Returns whether a node fits strictly between
    /// `left` and `right`.
    pub(crate) fn can_split(left: &NodeGene, right: &NodeGene) -> bool {
        midpoint(left.x, right.x).is_some()
    }

    /// Applies the node's activation function:
    /// the identity for sensors, and a steepened
    /// sigmoid, `1 / (1 + e^(-4.9v))`, for every other node.
    ///
    /// # Examples
    /// ```
    /// use evoneat::genomics::NodeGene;
    ///
    /// assert_eq!(NodeGene::new(1, 0.0, 0.5).activate(3.0), 3.0);
    /// assert_eq!(NodeGene::new(4, 1.0, 0.5).activate(0.0), 0.5);
    /// ```
    pub fn activate(&self, value: f32) -> f32 {
        match self.node_type() {
            NodeType::Sensor => value,
            NodeType::Neuron | NodeType::Actuator => steepened_sigmoid(value),
        }
    }

    /// Returns the node's innovation number.
    pub fn id(&self) -> Innovation {
        self.id
    }

    /// Returns the node's horizontal position.
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Returns the node's vertical (layout) position.
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Returns the node's type.
    pub fn node_type(&self) -> NodeType {
        if self.x <= 0.0 {
            NodeType::Sensor
        } else if self.x >= 1.0 {
            NodeType::Actuator
        } else {
            NodeType::Neuron
        }
    }
}

impl fmt::Display for NodeGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@({:.3}, {:.3})", self.id, self.x, self.y)
    }
}

fn midpoint(left: f32, right: f32) -> Option<f32> {
    let mid = (left + right) / 2.0;
    (left < mid && mid < right).then(|| mid)
}

fn steepened_sigmoid(value: f32) -> f32 {
    1.0 / (1.0 + (-4.9 * value).exp())
}
