//! Traffic propagation
//!
//! Derives request rates for every node and edge by pulling demand from the
//! `users` nodes through the directed graph. The computation is a full,
//! synchronous recomputation: it reads the graph through [`Database`] and
//! returns a [`TrafficReport`] that the store applies as a whole.
//!
//! Rules:
//! - a `users` node offers `concurrentUsers × requestsPerUser`
//! - any other node receives the sum of its inbound edges
//! - an edge normally carries `source × multiplier`
//! - a load balancer splits its total evenly over its outgoing edges, and
//!   those edges carry the split instead of a multiplied value
//! - a node already on the current descent contributes zero, which cuts
//!   cycles (see [`VisitPolicy`] for how that set is shared)

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, span, trace, warn, Level};

use crate::core::{Database, DiagramError, Edge, ElementId, Node, NodeKind, VisitPolicy};

/// Computed load for one node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLoad {
    pub id: ElementId,
    pub kind: NodeKind,
    pub label: String,
    /// Rate written back into the node's `rps` metric
    pub rps: f64,
    /// Sum of inbound edge rates (a users node's own rate)
    pub inbound: f64,
    pub peak: Option<f64>,
    pub overloaded: bool,
}

/// Computed rate for one edge
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLoad {
    pub id: ElementId,
    pub from: ElementId,
    pub to: ElementId,
    pub rps: f64,
}

/// Result of a traffic calculation, in graph insertion order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficReport {
    pub nodes: Vec<NodeLoad>,
    pub edges: Vec<EdgeLoad>,
    /// Total demand offered by every users node
    pub offered_load: f64,
}

impl TrafficReport {
    pub fn node(&self, id: ElementId) -> Option<&NodeLoad> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: ElementId) -> Option<&EdgeLoad> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Nodes whose inbound load exceeds their configured peak
    pub fn overloaded(&self) -> impl Iterator<Item = &NodeLoad> {
        self.nodes.iter().filter(|n| n.overloaded)
    }
}

/// Recursion state for one calculation
struct Propagation<'a> {
    nodes: HashMap<ElementId, &'a Node>,
    incoming: HashMap<ElementId, Vec<&'a Edge>>,
    outgoing: HashMap<ElementId, Vec<ElementId>>,
    node_rps: HashMap<ElementId, f64>,
    edge_rps: HashMap<ElementId, f64>,
    policy: VisitPolicy,
}

impl<'a> Propagation<'a> {
    fn new<D: Database>(graph: &'a D, policy: VisitPolicy) -> Self {
        let mut incoming: HashMap<ElementId, Vec<&'a Edge>> = HashMap::new();
        let mut outgoing: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
        for edge in graph.edges() {
            incoming.entry(edge.to).or_default().push(edge);
            outgoing.entry(edge.from).or_default().push(edge.id);
        }
        Self {
            nodes: graph.nodes().map(|n| (n.id, n)).collect(),
            incoming,
            outgoing,
            node_rps: HashMap::new(),
            edge_rps: HashMap::new(),
            policy,
        }
    }

    fn out_degree(&self, id: ElementId) -> usize {
        self.outgoing.get(&id).map_or(0, Vec::len)
    }

    fn is_load_balancer(&self, id: ElementId) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|n| n.kind.is_load_balancer())
    }

    fn visit(&mut self, id: ElementId, visited: &mut HashSet<ElementId>) -> f64 {
        if !visited.insert(id) {
            trace!(node_id = id, "Already on path, contributes nothing");
            return 0.0;
        }
        let Some(node) = self.nodes.get(&id).copied() else {
            return 0.0;
        };

        if node.kind.is_users() {
            let rps = node.metrics.offered_rps();
            self.node_rps.insert(id, rps);
            trace!(node_id = id, rps, "Users demand");
            return rps;
        }

        let inbound = self.incoming.get(&id).cloned().unwrap_or_default();
        let mut total = 0.0;
        for edge in inbound {
            let source_rps = match self.policy {
                VisitPolicy::SharedPath => self.visit(edge.from, visited),
                VisitPolicy::PerBranch => {
                    let mut branch = visited.clone();
                    self.visit(edge.from, &mut branch)
                }
            };
            let carried = if self.is_load_balancer(edge.from) {
                source_rps / self.out_degree(edge.from).max(1) as f64
            } else {
                source_rps * edge.metrics.multiplier()
            };
            self.edge_rps.insert(edge.id, carried);
            total += carried;
        }
        self.node_rps.insert(id, total);

        if node.kind.is_load_balancer() {
            let fan_out = self.out_degree(id);
            if fan_out > 0 {
                let share = total / fan_out as f64;
                if let Some(edges) = self.outgoing.get(&id) {
                    for edge_id in edges {
                        self.edge_rps.insert(*edge_id, share);
                    }
                }
                trace!(node_id = id, fan_out, share, "Load balancer split");
            }
        }

        trace!(node_id = id, kind = %node.kind, rps = total, "Node rate");
        total
    }
}

/// Compute request rates for every node and edge of `graph`
///
/// Fails with [`DiagramError::NoTrafficSource`] when the graph has no `users`
/// node; the caller must then leave the diagram untouched.
pub fn calculate_traffic<D: Database>(
    graph: &D,
    policy: VisitPolicy,
) -> Result<TrafficReport, DiagramError> {
    let span = span!(
        Level::INFO,
        "calculate_traffic",
        node_count = graph.node_count(),
        edge_count = graph.edge_count(),
        policy = %policy
    );
    let _enter = span.enter();

    if !graph.nodes().any(|n| n.kind.is_users()) {
        warn!("No users component found, skipping traffic calculation");
        return Err(DiagramError::NoTrafficSource);
    }

    let mut propagation = Propagation::new(graph, policy);
    let roots: Vec<ElementId> = graph.nodes().map(|n| n.id).collect();
    for root in roots {
        let mut visited = HashSet::new();
        propagation.visit(root, &mut visited);
    }

    let edges: Vec<EdgeLoad> = graph
        .edges()
        .map(|edge| EdgeLoad {
            id: edge.id,
            from: edge.from,
            to: edge.to,
            rps: propagation.edge_rps.get(&edge.id).copied().unwrap_or(0.0),
        })
        .collect();

    let mut offered_load = 0.0;
    let mut nodes = Vec::with_capacity(graph.node_count());
    for node in graph.nodes() {
        let rps = propagation.node_rps.get(&node.id).copied().unwrap_or(0.0);
        let inbound = if node.kind.is_users() {
            offered_load += rps;
            rps
        } else {
            edges.iter().filter(|e| e.to == node.id).map(|e| e.rps).sum()
        };
        let peak = node.metrics.peak_rps();
        let overloaded = peak.is_some_and(|peak| inbound > peak);
        if overloaded {
            debug!(node_id = node.id, label = %node.label, inbound, peak, "Node overloaded");
        }
        nodes.push(NodeLoad {
            id: node.id,
            kind: node.kind,
            label: node.label.clone(),
            rps,
            inbound,
            peak,
            overloaded,
        });
    }

    debug!(
        offered_load,
        overloaded = nodes.iter().filter(|n| n.overloaded).count(),
        "Traffic calculated"
    );
    Ok(TrafficReport {
        nodes,
        edges,
        offered_load,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{keys, EditorConfig};
    use crate::editor::DiagramStore;

    fn users(store: &mut DiagramStore, concurrent: &str, per_user: &str) -> ElementId {
        let id = store.add_node(NodeKind::Users).id;
        store.update_node_metric(&[id], keys::CONCURRENT_USERS, concurrent);
        store.update_node_metric(&[id], keys::REQUESTS_PER_USER, per_user);
        id
    }

    #[test]
    fn test_requires_users_node() {
        let mut store = DiagramStore::new(&EditorConfig::default());
        store.add_node(NodeKind::WebServer);
        let result = calculate_traffic(&store, VisitPolicy::SharedPath);
        assert!(matches!(result, Err(DiagramError::NoTrafficSource)));
    }

    #[test]
    fn test_direct_connection_and_overload() {
        let mut store = DiagramStore::new(&EditorConfig::default());
        let u = users(&mut store, "1000000", "0.1");
        let web = store.add_node(NodeKind::WebServer).id;
        store.update_node_metric(&[web], keys::PEAK_RPS, "50000");
        let edge = store.add_edge(u, web, None).unwrap().id;

        let report = calculate_traffic(&store, VisitPolicy::SharedPath).unwrap();
        assert_eq!(report.edge(edge).unwrap().rps, 100000.0);
        let web_load = report.node(web).unwrap();
        assert_eq!(web_load.rps, 100000.0);
        assert!(web_load.overloaded);
        assert_eq!(report.offered_load, 100000.0);
    }

    #[test]
    fn test_multiplier_scales_edge() {
        let mut store = DiagramStore::new(&EditorConfig::default());
        let u = users(&mut store, "10", "1");
        let db = store.add_node(NodeKind::Database).id;
        let edge = store.add_edge(u, db, None).unwrap().id;
        store.update_edge_metric(edge, keys::MULTIPLIER, "3");

        let report = calculate_traffic(&store, VisitPolicy::SharedPath).unwrap();
        assert_eq!(report.node(db).unwrap().rps, 30.0);
    }

    #[test]
    fn test_zero_multiplier_passes_through() {
        let mut store = DiagramStore::new(&EditorConfig::default());
        let u = users(&mut store, "10", "1");
        let db = store.add_node(NodeKind::Database).id;
        let edge = store.add_edge(u, db, None).unwrap().id;
        store.update_edge_metric(edge, keys::MULTIPLIER, "0");

        let report = calculate_traffic(&store, VisitPolicy::SharedPath).unwrap();
        assert_eq!(report.edge(edge).unwrap().rps, 10.0);
        assert_eq!(report.node(db).unwrap().rps, 10.0);
    }

    #[test]
    fn test_load_balancer_splits_evenly() {
        let mut store = DiagramStore::new(&EditorConfig::default());
        let u = users(&mut store, "100", "1");
        let lb = store.add_node(NodeKind::LoadBalancer).id;
        let a = store.add_node(NodeKind::AppServer).id;
        let b = store.add_node(NodeKind::AppServer).id;
        store.add_edge(u, lb, None);
        let to_a = store.add_edge(lb, a, None).unwrap().id;
        let to_b = store.add_edge(lb, b, None).unwrap().id;
        // multipliers on split edges are ignored
        store.update_edge_metric(to_b, keys::MULTIPLIER, "10");

        let report = calculate_traffic(&store, VisitPolicy::SharedPath).unwrap();
        assert_eq!(report.node(lb).unwrap().rps, 100.0);
        assert_eq!(report.edge(to_a).unwrap().rps, 50.0);
        assert_eq!(report.edge(to_b).unwrap().rps, 50.0);
        assert_eq!(report.node(a).unwrap().rps, 50.0);
        assert_eq!(report.node(b).unwrap().rps, 50.0);
    }

    #[test]
    fn test_missing_peak_never_overloads() {
        let mut store = DiagramStore::new(&EditorConfig::default());
        let u = users(&mut store, "1000000", "1");
        let cache = store.add_node(NodeKind::Cache).id;
        store.update_node_metric(&[cache], keys::PEAK_RPS, "");
        store.add_edge(u, cache, None);

        let report = calculate_traffic(&store, VisitPolicy::SharedPath).unwrap();
        assert!(!report.node(cache).unwrap().overloaded);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut store = DiagramStore::new(&EditorConfig::default());
        let u = users(&mut store, "10", "1");
        let a = store.add_node(NodeKind::Microservice).id;
        let b = store.add_node(NodeKind::Microservice).id;
        store.add_edge(u, a, None);
        store.add_edge(a, b, None);
        store.add_edge(b, a, None);

        let report = calculate_traffic(&store, VisitPolicy::PerBranch).unwrap();
        assert!(report.node(a).unwrap().rps.is_finite());
        assert!(report.node(b).unwrap().rps.is_finite());
    }
}
