//! Loadsketch - sketch system architectures and estimate their load
//!
//! A library for editing diagrams of typed service nodes and propagating
//! request rates from user populations through them.
//!
//! # Quick Start
//!
//! ```rust
//! use loadsketch::prelude::*;
//!
//! let mut session = EditorSession::new(EditorConfig::default());
//! let users = session.add_node(NodeKind::Users);
//! let web = session.add_node(NodeKind::WebServer);
//! session.connect(users, web);
//! session.update_node_metric(&[web], keys::PEAK_RPS, "50000");
//!
//! let report = session.calculate_traffic().unwrap();
//! let web_load = report.node(web).unwrap();
//! assert_eq!(web_load.rps, 100000.0);
//! assert!(web_load.overloaded);
//! ```
//!
//! # Documents
//!
//! Diagrams are exchanged as JSON documents:
//!
//! ```rust
//! use loadsketch::calculate;
//!
//! let input = r#"{
//!     "components": [
//!         {"id": 1, "type": "users", "x": 0, "y": 0,
//!          "metrics": {"concurrentUsers": "200", "requestsPerUser": "1"}},
//!         {"id": 2, "type": "cache", "x": 200, "y": 0}
//!     ],
//!     "connections": [{"id": 3, "from": 1, "to": 2}],
//!     "nextId": 4
//! }"#;
//!
//! let (document, report) = calculate(input).unwrap();
//! assert_eq!(document.connections[0].metrics.rps, "200");
//! assert_eq!(report.offered_load, 200.0);
//! ```

pub mod core;
pub mod editor;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use core::*;
pub use editor::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        keys, Database, DiagramError, Edge, EdgeMetrics, EditorConfig, ElementId, Node,
        NodeKind, NodeMetrics, Point, VisitPolicy, Viewport,
    };
    pub use crate::editor::{
        DiagramDocument, DiagramStore, EditorEvent, EditorSession, Selection, TrafficReport,
    };
}

/// Open a session from a JSON document with the default configuration
///
/// # Example
/// ```rust
/// use loadsketch::load;
///
/// let session = load(r#"{"components": [], "connections": [], "nextId": 1}"#).unwrap();
/// assert!(!session.can_undo());
/// ```
pub fn load(input: &str) -> anyhow::Result<EditorSession> {
    Ok(EditorSession::from_json(input, EditorConfig::default())?)
}

/// Import a document, run the traffic calculation, and return the updated
/// document together with the report
pub fn calculate(input: &str) -> anyhow::Result<(DiagramDocument, TrafficReport)> {
    calculate_with_policy(input, VisitPolicy::default())
}

/// Like [`calculate`], with an explicit cycle-guard policy
///
/// # Example
/// ```rust
/// use loadsketch::{calculate_with_policy, VisitPolicy};
///
/// let err = calculate_with_policy(
///     r#"{"components": [], "connections": [], "nextId": 1}"#,
///     VisitPolicy::PerBranch,
/// )
/// .unwrap_err();
/// assert!(err.to_string().contains("No users component"));
/// ```
pub fn calculate_with_policy(
    input: &str,
    policy: VisitPolicy,
) -> anyhow::Result<(DiagramDocument, TrafficReport)> {
    let config = EditorConfig::default().with_visit_policy(policy);
    let mut session = EditorSession::from_json(input, config)?;
    let report = session.calculate_traffic()?;
    Ok((session.export(), report))
}
