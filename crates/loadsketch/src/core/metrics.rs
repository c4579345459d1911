//! Capacity metrics attached to nodes and edges
//!
//! Metric values are free-form text as typed by the user ("1TB", "50ms",
//! "0.1"). Numeric readings are taken leniently: the longest numeric prefix
//! is used and anything unparseable reads as zero. A metric edit never fails.
//!
//! On the wire node metrics are a flat string map; in memory they are a typed
//! record so that the users-only demand fields live in their own optional
//! [`UserDemand`] block.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::NodeKind;

/// Metric key names as they appear in the exchange document
pub mod keys {
    pub const RPS: &str = "rps";
    pub const PEAK_RPS: &str = "peakRps";
    pub const LATENCY: &str = "latency";
    pub const INSTANCES: &str = "instances";
    pub const STORAGE: &str = "storage";
    pub const BANDWIDTH: &str = "bandwidth";
    pub const THROUGHPUT: &str = "throughput";
    pub const COMPUTE_UNITS: &str = "computeUnits";
    pub const STORAGE_CAPACITY: &str = "storageCapacity";
    pub const QUERY_RATE: &str = "queryRate";
    pub const CONCURRENT_USERS: &str = "concurrentUsers";
    pub const REQUESTS_PER_USER: &str = "requestsPerUser";
    pub const MULTIPLIER: &str = "multiplier";
}

/// Parse the numeric prefix of a metric value
///
/// Mirrors the leniency users expect from a capacity sheet: `"50ms"` reads as
/// 50 and `"1.5e3 rps"` as 1500. Returns `None` when no digits lead the text.
pub fn parse_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lenient numeric reading: missing or unparseable values are zero
pub fn lenient_number(raw: Option<&str>) -> f64 {
    raw.and_then(parse_number).unwrap_or(0.0)
}

/// Render a computed rate the way it is stored back into a metric
pub fn format_rate(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }
    format!("{}", value)
}

fn metric_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(metric_text(value).unwrap_or_default())
}

/// Demand inputs carried only by `users` nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDemand {
    pub concurrent_users: Option<String>,
    pub requests_per_user: Option<String>,
}

impl UserDemand {
    /// Requests per second offered by this population
    pub fn offered_rps(&self) -> f64 {
        lenient_number(self.concurrent_users.as_deref())
            * lenient_number(self.requests_per_user.as_deref())
    }

    fn is_empty(&self) -> bool {
        self.concurrent_users.is_none() && self.requests_per_user.is_none()
    }
}

/// Wire form of node metrics before typing
#[derive(Deserialize)]
#[serde(transparent)]
struct RawMetrics(BTreeMap<String, Value>);

/// Metrics attached to a service node
///
/// Unset metrics are `None` and are omitted on export. Keys outside the
/// recognized set are preserved verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMetrics", into = "BTreeMap<String, String>")]
pub struct NodeMetrics {
    pub rps: Option<String>,
    pub peak_rps: Option<String>,
    pub latency: Option<String>,
    pub instances: Option<String>,
    pub storage: Option<String>,
    pub bandwidth: Option<String>,
    pub throughput: Option<String>,
    pub compute_units: Option<String>,
    pub storage_capacity: Option<String>,
    pub query_rate: Option<String>,
    /// Present by default only on `users` nodes
    pub demand: Option<UserDemand>,
    pub extra: BTreeMap<String, String>,
}

impl NodeMetrics {
    /// Default metrics a freshly added node of `kind` starts with
    pub fn for_kind(kind: NodeKind) -> Self {
        let text = |value: &str| Some(value.to_string());
        let mut metrics = NodeMetrics {
            peak_rps: text("5000"),
            ..Default::default()
        };

        match kind {
            NodeKind::Users => {
                metrics.rps = text("1000");
                metrics.demand = Some(UserDemand {
                    concurrent_users: text("1000000"),
                    requests_per_user: text("0.1"),
                });
            }
            NodeKind::Database => metrics.storage = text("1TB"),
            NodeKind::Storage => {
                metrics.storage = text("1TB");
                metrics.storage_capacity = text("100GB");
            }
            NodeKind::Microservice | NodeKind::Container => metrics.instances = text("3"),
            NodeKind::Cdn => metrics.bandwidth = text("10Gbps"),
            NodeKind::Kafka | NodeKind::MessageQueue => metrics.throughput = text("1000"),
            NodeKind::Lambda => metrics.compute_units = text("128"),
            NodeKind::Analytics => metrics.query_rate = text("100"),
            _ => {}
        }
        metrics
    }

    fn slot(&self, key: &str) -> Option<&Option<String>> {
        match key {
            keys::RPS => Some(&self.rps),
            keys::PEAK_RPS => Some(&self.peak_rps),
            keys::LATENCY => Some(&self.latency),
            keys::INSTANCES => Some(&self.instances),
            keys::STORAGE => Some(&self.storage),
            keys::BANDWIDTH => Some(&self.bandwidth),
            keys::THROUGHPUT => Some(&self.throughput),
            keys::COMPUTE_UNITS => Some(&self.compute_units),
            keys::STORAGE_CAPACITY => Some(&self.storage_capacity),
            keys::QUERY_RATE => Some(&self.query_rate),
            _ => None,
        }
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            keys::RPS => Some(&mut self.rps),
            keys::PEAK_RPS => Some(&mut self.peak_rps),
            keys::LATENCY => Some(&mut self.latency),
            keys::INSTANCES => Some(&mut self.instances),
            keys::STORAGE => Some(&mut self.storage),
            keys::BANDWIDTH => Some(&mut self.bandwidth),
            keys::THROUGHPUT => Some(&mut self.throughput),
            keys::COMPUTE_UNITS => Some(&mut self.compute_units),
            keys::STORAGE_CAPACITY => Some(&mut self.storage_capacity),
            keys::QUERY_RATE => Some(&mut self.query_rate),
            _ => None,
        }
    }

    /// Read a metric by its wire key
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(slot) = self.slot(key) {
            return slot.as_deref();
        }
        match key {
            keys::CONCURRENT_USERS => self
                .demand
                .as_ref()
                .and_then(|d| d.concurrent_users.as_deref()),
            keys::REQUESTS_PER_USER => self
                .demand
                .as_ref()
                .and_then(|d| d.requests_per_user.as_deref()),
            _ => self.extra.get(key).map(String::as_str),
        }
    }

    /// Write a metric by its wire key; an empty value unsets it
    pub fn set(&mut self, key: &str, value: &str) {
        let value = (!value.is_empty()).then(|| value.to_string());

        if let Some(slot) = self.slot_mut(key) {
            *slot = value;
            return;
        }
        match key {
            keys::CONCURRENT_USERS | keys::REQUESTS_PER_USER => {
                let demand = self.demand.get_or_insert_with(UserDemand::default);
                if key == keys::CONCURRENT_USERS {
                    demand.concurrent_users = value;
                } else {
                    demand.requests_per_user = value;
                }
                if demand.is_empty() {
                    self.demand = None;
                }
            }
            _ => match value {
                Some(value) => {
                    self.extra.insert(key.to_string(), value);
                }
                None => {
                    self.extra.remove(key);
                }
            },
        }
    }

    /// Current computed rate, zero when unset
    pub fn rps(&self) -> f64 {
        lenient_number(self.rps.as_deref())
    }

    pub fn set_rps(&mut self, value: f64) {
        self.rps = Some(format_rate(value));
    }

    /// Configured peak capacity; `None` when missing or not numeric
    pub fn peak_rps(&self) -> Option<f64> {
        self.peak_rps.as_deref().and_then(parse_number)
    }

    /// Offered demand of a users population, zero without demand inputs
    pub fn offered_rps(&self) -> f64 {
        self.demand.as_ref().map_or(0.0, UserDemand::offered_rps)
    }
}

impl From<RawMetrics> for NodeMetrics {
    fn from(raw: RawMetrics) -> Self {
        let mut metrics = NodeMetrics::default();
        for (key, value) in raw.0 {
            if let Some(text) = metric_text(value) {
                metrics.set(&key, &text);
            }
        }
        metrics
    }
}

impl From<NodeMetrics> for BTreeMap<String, String> {
    fn from(metrics: NodeMetrics) -> Self {
        let mut map = metrics.extra;
        let named = [
            (keys::RPS, metrics.rps),
            (keys::PEAK_RPS, metrics.peak_rps),
            (keys::LATENCY, metrics.latency),
            (keys::INSTANCES, metrics.instances),
            (keys::STORAGE, metrics.storage),
            (keys::BANDWIDTH, metrics.bandwidth),
            (keys::THROUGHPUT, metrics.throughput),
            (keys::COMPUTE_UNITS, metrics.compute_units),
            (keys::STORAGE_CAPACITY, metrics.storage_capacity),
            (keys::QUERY_RATE, metrics.query_rate),
        ];
        for (key, value) in named {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        }
        if let Some(demand) = metrics.demand {
            if let Some(value) = demand.concurrent_users {
                map.insert(keys::CONCURRENT_USERS.to_string(), value);
            }
            if let Some(value) = demand.requests_per_user {
                map.insert(keys::REQUESTS_PER_USER.to_string(), value);
            }
        }
        map
    }
}

/// Metrics attached to a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeMetrics {
    #[serde(deserialize_with = "lenient_string")]
    pub rps: String,
    #[serde(deserialize_with = "lenient_string")]
    pub latency: String,
    #[serde(deserialize_with = "lenient_string")]
    pub bandwidth: String,
    #[serde(deserialize_with = "lenient_string")]
    pub multiplier: String,
}

impl Default for EdgeMetrics {
    fn default() -> Self {
        Self {
            rps: String::new(),
            latency: "50ms".to_string(),
            bandwidth: "100MB/s".to_string(),
            multiplier: "1".to_string(),
        }
    }
}

impl EdgeMetrics {
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            keys::RPS => Some(&self.rps),
            keys::LATENCY => Some(&self.latency),
            keys::BANDWIDTH => Some(&self.bandwidth),
            keys::MULTIPLIER => Some(&self.multiplier),
            _ => None,
        }
    }

    /// Write a metric by key; returns false for keys edges do not carry
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            keys::RPS => &mut self.rps,
            keys::LATENCY => &mut self.latency,
            keys::BANDWIDTH => &mut self.bandwidth,
            keys::MULTIPLIER => &mut self.multiplier,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }

    /// Fan-in factor applied to the source's rate
    ///
    /// Unset, unparseable, and zero all read as 1, so a connection always
    /// passes its source's traffic through.
    pub fn multiplier(&self) -> f64 {
        parse_number(&self.multiplier)
            .filter(|m| *m != 0.0 && !m.is_nan())
            .unwrap_or(1.0)
    }

    pub fn rps(&self) -> f64 {
        lenient_number(Some(&self.rps))
    }

    pub fn set_rps(&mut self, value: f64) {
        self.rps = format_rate(value);
    }
}
