//! Read model over a diagram graph
//!
//! The traffic calculation and the exchange format only need to look at the
//! graph, never mutate it. This trait is the read-only view they depend on;
//! the diagram store implements it and is the only owner of live data.

use super::types::{Edge, ElementId, Node};

/// Read-only access to a diagram's nodes and edges
///
/// Iteration order is insertion order, which keeps traversals and exports
/// deterministic.
pub trait Database {
    /// Get a node by ID
    fn get_node(&self, id: ElementId) -> Option<&Node>;

    /// Get an edge by ID
    fn get_edge(&self, id: ElementId) -> Option<&Edge>;

    /// Iterate over all nodes
    fn nodes(&self) -> impl Iterator<Item = &Node>;

    /// Iterate over all edges
    fn edges(&self) -> impl Iterator<Item = &Edge>;

    /// Check if a node exists
    fn has_node(&self, id: ElementId) -> bool {
        self.get_node(id).is_some()
    }

    /// Edges arriving at `node_id`
    fn incoming(&self, node_id: ElementId) -> impl Iterator<Item = &Edge> {
        self.edges().filter(move |edge| edge.to == node_id)
    }

    /// Edges leaving `node_id`
    fn outgoing(&self, node_id: ElementId) -> impl Iterator<Item = &Edge> {
        self.edges().filter(move |edge| edge.from == node_id)
    }

    /// Get the number of nodes
    fn node_count(&self) -> usize {
        self.nodes().count()
    }

    /// Get the number of edges
    fn edge_count(&self) -> usize {
        self.edges().count()
    }
}
