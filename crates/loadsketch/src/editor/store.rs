//! Diagram store
//!
//! Owns the node/edge graph and the shared id counter. Every operation is
//! total: references to ids that no longer exist are skipped rather than
//! reported, and no operation can leave an edge pointing at a missing node.

use std::collections::HashSet;
use tracing::{debug, trace};

use crate::core::{
    CanvasBounds, Database, Edge, EdgeMetrics, EditorConfig, ElementId, Node, NodeKind, Point,
    Rect, Size,
};

use super::traffic::TrafficReport;

/// Spacing of the default placement cascade
const CASCADE_STEP: f64 = 30.0;

/// Number of cascade positions before placement wraps around
const CASCADE_SLOTS: usize = 10;

/// Immutable copy of the graph state held by history entries
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub next_id: ElementId,
}

/// What a delete removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Removed {
    pub nodes: usize,
    pub edges: usize,
}

impl Removed {
    pub fn is_empty(&self) -> bool {
        self.nodes == 0 && self.edges == 0
    }
}

/// The authoritative diagram graph
///
/// Nodes and edges are kept in insertion order for deterministic traversal
/// and export.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    next_id: ElementId,
    name: Option<String>,
    canvas: CanvasBounds,
    node_size: Size,
}

impl Default for DiagramStore {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl DiagramStore {
    /// Create an empty store; ids start at 1
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_id: 1,
            name: None,
            canvas: config.canvas,
            node_size: config.node_size,
        }
    }

    /// Build a store from already validated parts
    ///
    /// The counter is raised above every existing id if it lags behind.
    pub(crate) fn from_parts(
        config: &EditorConfig,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        next_id: ElementId,
        name: Option<String>,
    ) -> Self {
        let max_id = nodes
            .iter()
            .map(|n| n.id)
            .chain(edges.iter().map(|e| e.id))
            .max()
            .unwrap_or(0);
        Self {
            nodes,
            edges,
            next_id: next_id.max(max_id.saturating_add(1)),
            name,
            canvas: config.canvas,
            node_size: config.node_size,
        }
    }

    /// The id the next created element will receive
    pub fn next_id(&self) -> ElementId {
        self.next_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn canvas(&self) -> CanvasBounds {
        self.canvas
    }

    fn allocate_id(&mut self) -> ElementId {
        let id = self.next_id;
        // imported counters are at most MAX_ELEMENT_ID + 1
        self.next_id = id.checked_add(1).unwrap_or(ElementId::MAX);
        id
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Add a node of `kind` at the next cascade position
    pub fn add_node(&mut self, kind: NodeKind) -> &Node {
        let slot = (self.nodes.len() % CASCADE_SLOTS) as f64;
        let origin = Point::new(100.0 + slot * CASCADE_STEP, 100.0 + slot * CASCADE_STEP);
        self.add_node_at(kind, origin)
    }

    /// Add a node of `kind` with its origin at `origin` (clamped to the canvas)
    pub fn add_node_at(&mut self, kind: NodeKind, origin: Point) -> &Node {
        let id = self.allocate_id();
        let origin = self.canvas.clamp_origin(origin, self.node_size);
        trace!(node_id = id, kind = %kind, x = origin.x, y = origin.y, "Adding node");
        self.nodes.push(Node::new(id, kind, origin, self.node_size));
        debug!(node_count = self.nodes.len(), "Node added");
        &self.nodes[self.nodes.len() - 1]
    }

    /// Connect `from` to `to`
    ///
    /// Ignored when both ends are the same node or either end is missing.
    /// `metrics` replaces the default connection metrics when given.
    pub fn add_edge(
        &mut self,
        from: ElementId,
        to: ElementId,
        metrics: Option<EdgeMetrics>,
    ) -> Option<&Edge> {
        if from == to || !self.has_node(from) || !self.has_node(to) {
            trace!(edge_from = from, edge_to = to, "Ignoring invalid connection");
            return None;
        }
        let id = self.allocate_id();
        trace!(edge_id = id, edge_from = from, edge_to = to, "Adding edge");
        self.edges
            .push(Edge::new(id, from, to, metrics.unwrap_or_default()));
        debug!(edge_count = self.edges.len(), "Edge added");
        self.edges.last()
    }

    /// Set `key` to `value` on every listed node that exists
    ///
    /// Returns the number of nodes updated.
    pub fn update_node_metric<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a ElementId>,
        key: &str,
        value: &str,
    ) -> usize {
        let ids: HashSet<ElementId> = ids.into_iter().copied().collect();
        let mut updated = 0;
        for node in self.nodes.iter_mut().filter(|n| ids.contains(&n.id)) {
            node.metrics.set(key, value);
            updated += 1;
        }
        trace!(key, value, requested = ids.len(), updated, "Updated node metric");
        updated
    }

    /// Set `key` to `value` on one edge; false if the edge or key is unknown
    pub fn update_edge_metric(&mut self, id: ElementId, key: &str, value: &str) -> bool {
        let updated = self
            .edges
            .iter_mut()
            .find(|e| e.id == id)
            .is_some_and(|edge| edge.metrics.set(key, value));
        trace!(edge_id = id, key, value, updated, "Updated edge metric");
        updated
    }

    /// Change a node's label; false if the node is unknown
    pub fn rename_node(&mut self, id: ElementId, label: &str) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                trace!(node_id = id, label, "Renamed node");
                node.label = label.to_string();
                true
            }
            None => false,
        }
    }

    /// Translate the listed nodes, keeping each box inside the canvas
    pub fn move_nodes<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a ElementId>,
        dx: f64,
        dy: f64,
    ) {
        let ids: HashSet<ElementId> = ids.into_iter().copied().collect();
        let canvas = self.canvas;
        for node in self.nodes.iter_mut().filter(|n| ids.contains(&n.id)) {
            let target = Point::new(node.x + dx, node.y + dy);
            let clamped = canvas.clamp_origin(target, node.size());
            node.x = clamped.x;
            node.y = clamped.y;
        }
        trace!(count = ids.len(), dx, dy, "Moved nodes");
    }

    /// Remove nodes (cascading to their edges), then the given edge
    pub fn delete_by_ids<'a>(
        &mut self,
        node_ids: impl IntoIterator<Item = &'a ElementId>,
        edge_id: Option<ElementId>,
    ) -> Removed {
        let node_ids: HashSet<ElementId> = node_ids.into_iter().copied().collect();
        let (nodes_before, edges_before) = (self.nodes.len(), self.edges.len());

        self.nodes.retain(|n| !node_ids.contains(&n.id));
        self.edges
            .retain(|e| !node_ids.contains(&e.from) && !node_ids.contains(&e.to));
        if let Some(edge_id) = edge_id {
            self.edges.retain(|e| e.id != edge_id);
        }

        let removed = Removed {
            nodes: nodes_before - self.nodes.len(),
            edges: edges_before - self.edges.len(),
        };
        debug!(
            removed_nodes = removed.nodes,
            removed_edges = removed.edges,
            node_count = self.nodes.len(),
            edge_count = self.edges.len(),
            "Deleted elements"
        );
        removed
    }

    /// Topmost node whose box contains `point` (later nodes draw on top)
    pub fn node_at(&self, point: Point) -> Option<ElementId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.bounds().contains(point))
            .map(|n| n.id)
    }

    /// Ids of nodes whose boxes strictly overlap `rect`
    pub fn nodes_in_rect(&self, rect: &Rect) -> Vec<ElementId> {
        self.nodes
            .iter()
            .filter(|n| n.bounds().overlaps(rect))
            .map(|n| n.id)
            .collect()
    }

    /// "From → To" summary for a connection list
    pub fn connection_label(&self, edge: &Edge) -> String {
        let label = |id| {
            self.get_node(id)
                .map(|n| n.label.as_str())
                .unwrap_or("Unknown")
        };
        format!("{} → {}", label(edge.from), label(edge.to))
    }

    /// Replace every node and edge rate with the values in `report`
    pub fn apply_traffic(&mut self, report: &TrafficReport) {
        for node in &mut self.nodes {
            let rps = report.node(node.id).map_or(0.0, |load| load.rps);
            node.metrics.set_rps(rps);
        }
        for edge in &mut self.edges {
            let rps = report.edge(edge.id).map_or(0.0, |load| load.rps);
            edge.metrics.set_rps(rps);
        }
        debug!(
            node_count = self.nodes.len(),
            edge_count = self.edges.len(),
            "Applied traffic rates"
        );
    }

    /// Capture the graph state for history
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            next_id: self.next_id,
        }
    }

    /// Replace the graph state with a snapshot
    pub fn restore(&mut self, snapshot: GraphSnapshot) {
        trace!(
            node_count = snapshot.nodes.len(),
            edge_count = snapshot.edges.len(),
            next_id = snapshot.next_id,
            "Restoring snapshot"
        );
        self.nodes = snapshot.nodes;
        self.edges = snapshot.edges;
        self.next_id = snapshot.next_id;
    }
}

impl Database for DiagramStore {
    fn get_node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn get_edge(&self, id: ElementId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keys;

    fn store() -> DiagramStore {
        DiagramStore::new(&EditorConfig::default())
    }

    #[test]
    fn test_ids_shared_between_nodes_and_edges() {
        let mut db = store();
        let a = db.add_node(NodeKind::Users).id;
        let b = db.add_node(NodeKind::WebServer).id;
        let e = db.add_edge(a, b, None).unwrap().id;
        let c = db.add_node(NodeKind::Database).id;

        assert_eq!((a, b, e, c), (1, 2, 3, 4));
        assert_eq!(db.next_id(), 5);
    }

    #[test]
    fn test_add_edge_rejects_self_and_missing() {
        let mut db = store();
        let a = db.add_node(NodeKind::Cache).id;

        assert!(db.add_edge(a, a, None).is_none());
        assert!(db.add_edge(a, 99, None).is_none());
        assert!(db.add_edge(99, a, None).is_none());
        assert_eq!(db.edge_count(), 0);
        // rejected connections do not consume ids
        assert_eq!(db.next_id(), 2);
    }

    #[test]
    fn test_add_edge_custom_metrics() {
        let mut db = store();
        let a = db.add_node(NodeKind::Users).id;
        let b = db.add_node(NodeKind::Cdn).id;
        let metrics = EdgeMetrics {
            multiplier: "4".to_string(),
            ..Default::default()
        };
        let edge = db.add_edge(a, b, Some(metrics)).unwrap();
        assert_eq!(edge.metrics.multiplier(), 4.0);
        assert_eq!(edge.metrics.latency, "50ms");
    }

    #[test]
    fn test_default_placement_cascades() {
        let mut db = store();
        let first = db.add_node(NodeKind::Users).origin();
        let second = db.add_node(NodeKind::Users).origin();
        assert_eq!(first, Point::new(100.0, 100.0));
        assert_eq!(second, Point::new(130.0, 130.0));
    }

    #[test]
    fn test_add_node_at_clamps() {
        let mut db = store();
        let node = db.add_node_at(NodeKind::Lambda, Point::new(5000.0, -10.0));
        assert_eq!(node.origin(), Point::new(1480.0, 0.0));
    }

    #[test]
    fn test_update_node_metric_skips_unknown_ids() {
        let mut db = store();
        let a = db.add_node(NodeKind::AppServer).id;
        let b = db.add_node(NodeKind::AppServer).id;

        let updated = db.update_node_metric(&[a, b, 42], keys::PEAK_RPS, "900");
        assert_eq!(updated, 2);
        assert_eq!(db.get_node(a).unwrap().metrics.peak_rps(), Some(900.0));
        assert_eq!(db.get_node(b).unwrap().metrics.peak_rps(), Some(900.0));
    }

    #[test]
    fn test_update_edge_metric() {
        let mut db = store();
        let a = db.add_node(NodeKind::Users).id;
        let b = db.add_node(NodeKind::Kafka).id;
        let e = db.add_edge(a, b, None).unwrap().id;

        assert!(db.update_edge_metric(e, keys::MULTIPLIER, "3"));
        assert!(!db.update_edge_metric(e, "colour", "red"));
        assert!(!db.update_edge_metric(77, keys::MULTIPLIER, "3"));
        assert_eq!(db.get_edge(e).unwrap().metrics.multiplier(), 3.0);
    }

    #[test]
    fn test_move_nodes_clamps_each_node() {
        let config = EditorConfig::default().with_canvas(CanvasBounds::new(400.0, 300.0));
        let mut db = DiagramStore::new(&config);
        let a = db.add_node_at(NodeKind::Cache, Point::new(0.0, 0.0)).id;
        let b = db.add_node_at(NodeKind::Cache, Point::new(200.0, 200.0)).id;

        db.move_nodes(&[a, b], 150.0, 50.0);

        assert_eq!(db.get_node(a).unwrap().origin(), Point::new(150.0, 50.0));
        // 400 - 120 and 300 - 80
        assert_eq!(db.get_node(b).unwrap().origin(), Point::new(280.0, 220.0));
    }

    #[test]
    fn test_delete_cascades_incident_edges() {
        let mut db = store();
        let a = db.add_node(NodeKind::Users).id;
        let b = db.add_node(NodeKind::LoadBalancer).id;
        let c = db.add_node(NodeKind::AppServer).id;
        db.add_edge(a, b, None);
        db.add_edge(b, c, None);
        let keep = db.add_edge(a, c, None).unwrap().id;

        let removed = db.delete_by_ids(&[b], None);

        assert_eq!(removed, Removed { nodes: 1, edges: 2 });
        assert!(!db.has_node(b));
        let edge_ids: Vec<_> = db.edges().map(|e| e.id).collect();
        assert_eq!(edge_ids, vec![keep]);
    }

    #[test]
    fn test_delete_nodes_then_selected_edge() {
        let mut db = store();
        let a = db.add_node(NodeKind::Users).id;
        let b = db.add_node(NodeKind::Cache).id;
        let c = db.add_node(NodeKind::Database).id;
        let ab = db.add_edge(a, b, None).unwrap().id;
        let bc = db.add_edge(b, c, None).unwrap().id;

        let removed = db.delete_by_ids(&[a], Some(bc));
        assert_eq!(removed, Removed { nodes: 1, edges: 2 });
        assert!(db.get_edge(ab).is_none());
        assert!(db.get_edge(bc).is_none());

        // deleting again is a quiet no-op
        assert!(db.delete_by_ids(&[a], Some(bc)).is_empty());
    }

    #[test]
    fn test_node_at_prefers_topmost() {
        let mut db = store();
        let below = db.add_node_at(NodeKind::Cache, Point::new(0.0, 0.0)).id;
        let above = db.add_node_at(NodeKind::Cache, Point::new(50.0, 50.0)).id;

        assert_eq!(db.node_at(Point::new(60.0, 60.0)), Some(above));
        assert_eq!(db.node_at(Point::new(10.0, 10.0)), Some(below));
        assert_eq!(db.node_at(Point::new(900.0, 900.0)), None);
    }

    #[test]
    fn test_nodes_in_rect_uses_strict_overlap() {
        let mut db = store();
        let a = db.add_node_at(NodeKind::Cache, Point::new(0.0, 0.0)).id;
        db.add_node_at(NodeKind::Cache, Point::new(300.0, 0.0));

        let touching = Rect::from_corners(Point::new(120.0, 0.0), Point::new(200.0, 50.0));
        assert!(db.nodes_in_rect(&touching).is_empty());

        let crossing = Rect::from_corners(Point::new(200.0, 50.0), Point::new(119.0, 10.0));
        assert_eq!(db.nodes_in_rect(&crossing), vec![a]);
    }

    #[test]
    fn test_connection_label() {
        let mut db = store();
        let a = db.add_node(NodeKind::Users).id;
        let b = db.add_node(NodeKind::ApiGateway).id;
        let edge = db.add_edge(a, b, None).unwrap().clone();
        assert_eq!(db.connection_label(&edge), "Users → API Gateway");

        let orphan = Edge::new(50, a, 51, EdgeMetrics::default());
        assert_eq!(db.connection_label(&orphan), "Users → Unknown");
    }

    #[test]
    fn test_snapshot_restore() {
        let mut db = store();
        db.add_node(NodeKind::Users);
        let snapshot = db.snapshot();

        db.add_node(NodeKind::Cache);
        assert_eq!(db.node_count(), 2);

        db.restore(snapshot.clone());
        assert_eq!(db.snapshot(), snapshot);
        assert_eq!(db.next_id(), 2);
    }

    #[test]
    fn test_from_parts_raises_counter() {
        let node = Node::new(9, NodeKind::Users, Point::default(), Size::default());
        let db = DiagramStore::from_parts(&EditorConfig::default(), vec![node], vec![], 3, None);
        assert_eq!(db.next_id(), 10);
    }
}
