//! Exchange document
//!
//! The JSON form a diagram is saved in and handed between sessions:
//!
//! ```json
//! {
//!   "components": [{"id": 1, "type": "users", "x": 100, "y": 100, ...}],
//!   "connections": [{"id": 3, "from": 1, "to": 2, "metrics": {...}}],
//!   "nextId": 4,
//!   "name": "checkout"
//! }
//! ```
//!
//! Import is all-or-nothing: any structural problem rejects the whole
//! document before a store is built from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::core::{
    Database, DiagramError, Edge, EditorConfig, ElementId, Node, MAX_ELEMENT_ID,
};

use super::store::DiagramStore;

const REQUIRED_FIELDS: [&str; 3] = ["components", "connections", "nextId"];

/// A serialized diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDocument {
    pub components: Vec<Node>,
    pub connections: Vec<Edge>,
    pub next_id: ElementId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DiagramDocument {
    /// Parse and validate a document
    pub fn from_json(input: &str) -> Result<Self, DiagramError> {
        let value: Value = serde_json::from_str(input)?;
        let object = value
            .as_object()
            .ok_or_else(|| DiagramError::invalid_document("expected a JSON object"))?;
        for field in REQUIRED_FIELDS {
            if object.get(field).map_or(true, Value::is_null) {
                return Err(DiagramError::missing_field(field));
            }
        }

        let mut document: DiagramDocument = serde_json::from_value(value)?;
        document.validate()?;
        debug!(
            components = document.components.len(),
            connections = document.connections.len(),
            next_id = document.next_id,
            "Document imported"
        );
        Ok(document)
    }

    /// Check ids and edge endpoints; repair a lagging id counter
    ///
    /// Ids and the counter must not exceed [`MAX_ELEMENT_ID`], and a
    /// connection may not start and end at the same component.
    pub fn validate(&mut self) -> Result<(), DiagramError> {
        let mut seen = HashSet::new();
        let ids = self
            .components
            .iter()
            .map(|n| n.id)
            .chain(self.connections.iter().map(|e| e.id));
        for id in ids {
            if !seen.insert(id) {
                return Err(DiagramError::DuplicateId { id });
            }
        }

        let node_ids: HashSet<ElementId> = self.components.iter().map(|n| n.id).collect();
        for edge in &self.connections {
            if edge.from == edge.to {
                return Err(DiagramError::invalid_document(format!(
                    "connection {} connects component {} to itself",
                    edge.id, edge.from
                )));
            }
            for endpoint in [edge.from, edge.to] {
                if !node_ids.contains(&endpoint) {
                    return Err(DiagramError::DanglingConnection {
                        connection_id: edge.id,
                        node_id: endpoint,
                    });
                }
            }
        }

        let max_id = seen.into_iter().max().unwrap_or(0);
        if max_id > MAX_ELEMENT_ID {
            return Err(DiagramError::invalid_document(format!(
                "id {} exceeds the largest supported id {}",
                max_id, MAX_ELEMENT_ID
            )));
        }
        if self.next_id <= max_id {
            warn!(
                next_id = self.next_id,
                max_id, "Id counter behind existing ids, raising it"
            );
            self.next_id = max_id + 1;
        }
        if self.next_id > MAX_ELEMENT_ID + 1 {
            return Err(DiagramError::invalid_document(format!(
                "nextId {} exceeds the largest supported id {}",
                self.next_id, MAX_ELEMENT_ID
            )));
        }
        Ok(())
    }

    /// Snapshot the live state of a store
    pub fn from_store(store: &DiagramStore) -> Self {
        Self {
            components: store.nodes().cloned().collect(),
            connections: store.edges().cloned().collect(),
            next_id: store.next_id(),
            name: store.name().map(str::to_string),
        }
    }

    /// Build a store seeded with this document
    pub fn into_store(self, config: &EditorConfig) -> DiagramStore {
        DiagramStore::from_parts(
            config,
            self.components,
            self.connections,
            self.next_id,
            self.name,
        )
    }

    pub fn to_json_pretty(&self) -> Result<String, DiagramError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NodeKind;

    const MINIMAL: &str = r#"{
        "components": [
            {"id": 1, "type": "users", "x": 10, "y": 20, "width": 120, "height": 80,
             "label": "Users", "metrics": {"concurrentUsers": "500", "requestsPerUser": "2"}},
            {"id": 2, "type": "web-server", "x": 200, "y": 20, "width": 120, "height": 80,
             "label": "Web", "metrics": {"peakRps": "800"}}
        ],
        "connections": [
            {"id": 3, "from": 1, "to": 2, "metrics": {"rps": "", "latency": "50ms", "bandwidth": "100MB/s", "multiplier": "1"}}
        ],
        "nextId": 4
    }"#;

    #[test]
    fn test_import_minimal() {
        let document = DiagramDocument::from_json(MINIMAL).unwrap();
        assert_eq!(document.components.len(), 2);
        assert_eq!(document.components[1].kind, NodeKind::WebServer);
        assert_eq!(document.next_id, 4);
        assert_eq!(document.name, None);
    }

    #[test]
    fn test_missing_fields_rejected() {
        for field in REQUIRED_FIELDS {
            let mut value: Value = serde_json::from_str(MINIMAL).unwrap();
            value.as_object_mut().unwrap().remove(field);
            let err = DiagramDocument::from_json(&value.to_string()).unwrap_err();
            assert!(
                matches!(err, DiagramError::MissingField { field: f } if f == field),
                "{field}: {err}"
            );
        }
    }

    #[test]
    fn test_not_an_object() {
        let err = DiagramDocument::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, DiagramError::InvalidDocument { .. }));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = MINIMAL.replace("web-server", "mainframe");
        let err = DiagramDocument::from_json(&json).unwrap_err();
        assert!(matches!(err, DiagramError::InvalidDocument { .. }));
    }

    #[test]
    fn test_dangling_connection_rejected() {
        let json = MINIMAL.replace(r#""to": 2"#, r#""to": 9"#);
        let err = DiagramDocument::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            DiagramError::DanglingConnection {
                connection_id: 3,
                node_id: 9
            }
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let json = MINIMAL.replace(r#""id": 3"#, r#""id": 2"#);
        let err = DiagramDocument::from_json(&json).unwrap_err();
        assert!(matches!(err, DiagramError::DuplicateId { id: 2 }));
    }

    #[test]
    fn test_lagging_counter_raised() {
        let json = MINIMAL.replace(r#""nextId": 4"#, r#""nextId": 2"#);
        let document = DiagramDocument::from_json(&json).unwrap();
        assert_eq!(document.next_id, 4);
    }

    #[test]
    fn test_self_loop_rejected() {
        let json = MINIMAL.replace(r#""from": 1, "to": 2"#, r#""from": 2, "to": 2"#);
        let err = DiagramDocument::from_json(&json).unwrap_err();
        assert!(matches!(err, DiagramError::InvalidDocument { .. }));
        assert!(err.to_string().contains("to itself"));
    }

    #[test]
    fn test_id_beyond_limit_rejected() {
        let json = MINIMAL.replace(r#""id": 2,"#, r#""id": 18446744073709551615,"#);
        let json = json.replace(r#""to": 2"#, r#""to": 18446744073709551615"#);
        let err = DiagramDocument::from_json(&json).unwrap_err();
        assert!(matches!(err, DiagramError::InvalidDocument { .. }));
    }

    #[test]
    fn test_counter_beyond_limit_rejected() {
        let json = MINIMAL.replace(r#""nextId": 4"#, r#""nextId": 18446744073709551615"#);
        let err = DiagramDocument::from_json(&json).unwrap_err();
        assert!(matches!(err, DiagramError::InvalidDocument { .. }));
    }

    #[test]
    fn test_ids_up_to_limit_accepted() {
        let next_id = format!(r#""nextId": {}"#, MAX_ELEMENT_ID);
        let json = MINIMAL.replace(r#""nextId": 4"#, &next_id);
        let document = DiagramDocument::from_json(&json).unwrap();
        let mut store = document.into_store(&EditorConfig::default());

        assert_eq!(store.add_node(NodeKind::Cache).id, MAX_ELEMENT_ID);
        assert_eq!(store.next_id(), MAX_ELEMENT_ID + 1);
    }

    #[test]
    fn test_store_round_trip_keeps_name() {
        let mut document = DiagramDocument::from_json(MINIMAL).unwrap();
        document.name = Some("checkout".to_string());
        let store = document.clone().into_store(&EditorConfig::default());
        assert_eq!(store.name(), Some("checkout"));
        assert_eq!(DiagramDocument::from_store(&store), document);

        let json = document.to_json_pretty().unwrap();
        assert!(json.contains("\"nextId\": 4"));
        assert!(json.contains("\"name\": \"checkout\""));
    }
}
