//! Editor configuration
//!
//! Canvas extent, default node geometry, history depth, and the traversal
//! policy used by the traffic calculation.

use std::fmt;
use std::str::FromStr;

use super::types::{CanvasBounds, Size};

/// Maximum number of retained history snapshots
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// How the traffic calculation guards against cycles
///
/// Each descent from a root node tracks the nodes already on its path; a node
/// met again contributes zero. The two policies differ in how that set is
/// shared between the inbound branches of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum VisitPolicy {
    /// One set shared by every branch of a root's descent
    ///
    /// A node reachable along two independent paths that converge downstream
    /// contributes only along the first path explored (diamonds undercount).
    #[default]
    SharedPath,
    /// A fresh copy of the set for each inbound branch
    ///
    /// Only true cycles are cut; diamond-shaped graphs add up fully.
    PerBranch,
}

impl VisitPolicy {
    /// Get all valid policy names
    pub fn variants() -> &'static [&'static str] {
        &["shared-path", "per-branch"]
    }
}

impl fmt::Display for VisitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitPolicy::SharedPath => write!(f, "shared-path"),
            VisitPolicy::PerBranch => write!(f, "per-branch"),
        }
    }
}

impl FromStr for VisitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared-path" | "shared" => Ok(VisitPolicy::SharedPath),
            "per-branch" | "branch" => Ok(VisitPolicy::PerBranch),
            _ => Err(format!("Unknown visit policy: {}", s)),
        }
    }
}

/// Configuration for an editor session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    /// Extent nodes are clamped into
    pub canvas: CanvasBounds,
    /// Size given to newly added nodes
    pub node_size: Size,
    /// Snapshots kept for undo; oldest dropped first
    pub history_limit: usize,
    pub visit_policy: VisitPolicy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasBounds::default(),
            node_size: Size::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            visit_policy: VisitPolicy::default(),
        }
    }
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canvas(mut self, canvas: CanvasBounds) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn with_node_size(mut self, node_size: Size) -> Self {
        self.node_size = node_size;
        self
    }

    /// Set the history depth; at least one snapshot is always kept
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn with_visit_policy(mut self, policy: VisitPolicy) -> Self {
        self.visit_policy = policy;
        self
    }
}
