//! Core type definitions for architecture diagrams
//!
//! This module contains the fundamental types used throughout loadsketch:
//! element ids, service node kinds, canvas geometry, and the node and edge
//! records owned by the diagram store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::metrics::{EdgeMetrics, NodeMetrics};

/// Identifier shared by nodes and edges
///
/// Both are drawn from one monotonically increasing counter, so an id is
/// unique across the union of live nodes and edges.
pub type ElementId = u64;

/// Largest id a diagram may use
///
/// Documents are read by browsers as well, where integers above 2^53 - 1
/// lose precision.
pub const MAX_ELEMENT_ID: ElementId = (1 << 53) - 1;

/// Default node width on the canvas
pub const DEFAULT_NODE_WIDTH: f64 = 120.0;

/// Default node height on the canvas
pub const DEFAULT_NODE_HEIGHT: f64 = 80.0;

/// Kinds of service nodes that can be placed on a diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Traffic source: concurrent users issuing requests
    Users,
    /// Spreads its inbound load evenly over its outgoing connections
    LoadBalancer,
    WebServer,
    AppServer,
    Database,
    Cache,
    Cdn,
    ApiGateway,
    Kafka,
    MessageQueue,
    Microservice,
    Lambda,
    Container,
    Analytics,
    Storage,
}

impl NodeKind {
    /// Every known kind, in palette order
    pub const ALL: [NodeKind; 15] = [
        NodeKind::LoadBalancer,
        NodeKind::WebServer,
        NodeKind::AppServer,
        NodeKind::Database,
        NodeKind::Cache,
        NodeKind::Cdn,
        NodeKind::Users,
        NodeKind::ApiGateway,
        NodeKind::Kafka,
        NodeKind::MessageQueue,
        NodeKind::Microservice,
        NodeKind::Lambda,
        NodeKind::Container,
        NodeKind::Analytics,
        NodeKind::Storage,
    ];

    /// Wire name used in the exchange document (`load-balancer`, `users`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Users => "users",
            NodeKind::LoadBalancer => "load-balancer",
            NodeKind::WebServer => "web-server",
            NodeKind::AppServer => "app-server",
            NodeKind::Database => "database",
            NodeKind::Cache => "cache",
            NodeKind::Cdn => "cdn",
            NodeKind::ApiGateway => "api-gateway",
            NodeKind::Kafka => "kafka",
            NodeKind::MessageQueue => "message-queue",
            NodeKind::Microservice => "microservice",
            NodeKind::Lambda => "lambda",
            NodeKind::Container => "container",
            NodeKind::Analytics => "analytics",
            NodeKind::Storage => "storage",
        }
    }

    /// Human-readable label, used as the default node label
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Users => "Users",
            NodeKind::LoadBalancer => "Load Balancer",
            NodeKind::WebServer => "Web Server",
            NodeKind::AppServer => "App Server",
            NodeKind::Database => "Database",
            NodeKind::Cache => "Cache",
            NodeKind::Cdn => "CDN",
            NodeKind::ApiGateway => "API Gateway",
            NodeKind::Kafka => "Kafka",
            NodeKind::MessageQueue => "Message Queue",
            NodeKind::Microservice => "Microservice",
            NodeKind::Lambda => "Lambda Function",
            NodeKind::Container => "Container",
            NodeKind::Analytics => "Analytics Service",
            NodeKind::Storage => "Storage Service",
        }
    }

    /// Returns true for traffic sources
    pub fn is_users(&self) -> bool {
        matches!(self, NodeKind::Users)
    }

    /// Returns true for nodes that fan their load out evenly
    pub fn is_load_balancer(&self) -> bool {
        matches!(self, NodeKind::LoadBalancer)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown node kind: {}", s))
    }
}

/// A point in canvas-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`
    pub fn offset_from(&self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Width and height of a node's bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT)
    }
}

/// Axis-aligned rectangle stored as normalized min/max corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Build a rectangle from two arbitrary corners (drag start and end)
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Build a rectangle from an origin and a size
    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self {
            min: origin,
            max: Point::new(origin.x + size.width, origin.y + size.height),
        }
    }

    /// Strict overlap test: shared edges alone do not count
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Returns true if the point lies inside or on the border
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Extent of the drawing surface; nodes are kept fully inside it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasBounds {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 1000.0,
        }
    }
}

impl CanvasBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp a node origin so that a box of `size` stays within the canvas
    ///
    /// A node larger than the canvas is pinned to the top-left corner.
    pub fn clamp_origin(&self, origin: Point, size: Size) -> Point {
        let max_x = (self.width - size.width).max(0.0);
        let max_y = (self.height - size.height).max(0.0);
        Point::new(origin.x.min(max_x).max(0.0), origin.y.min(max_y).max(0.0))
    }
}

/// Maps client pointer coordinates into canvas-local, zoom-normalized ones
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Client position of the canvas' top-left corner
    pub offset: Point,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Point::default(),
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(offset: Point, zoom: f64) -> Self {
        Self { offset, zoom }
    }

    pub fn to_canvas(&self, client: Point) -> Point {
        // zero or negative zoom would collapse the canvas; treat as identity scale
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        Point::new(
            (client.x - self.offset.x) / zoom,
            (client.y - self.offset.y) / zoom,
        )
    }
}

fn default_width() -> f64 {
    DEFAULT_NODE_WIDTH
}

fn default_height() -> f64 {
    DEFAULT_NODE_HEIGHT
}

/// A typed service node on the diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub metrics: NodeMetrics,
}

impl Node {
    /// Create a node of the given kind with its default label and metrics
    pub fn new(id: ElementId, kind: NodeKind, origin: Point, size: Size) -> Self {
        Self {
            id,
            kind,
            x: origin.x,
            y: origin.y,
            width: size.width,
            height: size.height,
            label: kind.label().to_string(),
            metrics: NodeMetrics::for_kind(kind),
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin(self.origin(), self.size())
    }
}

/// A directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: ElementId,
    pub from: ElementId,
    pub to: ElementId,
    #[serde(default)]
    pub metrics: EdgeMetrics,
}

impl Edge {
    pub fn new(id: ElementId, from: ElementId, to: ElementId, metrics: EdgeMetrics) -> Self {
        Self {
            id,
            from,
            to,
            metrics,
        }
    }

    /// Returns true if the edge starts or ends at `node_id`
    pub fn touches(&self, node_id: ElementId) -> bool {
        self.from == node_id || self.to == node_id
    }
}
