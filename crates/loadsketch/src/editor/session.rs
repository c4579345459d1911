//! Editor session
//!
//! Composition root for one interactive editor: the store, its history, the
//! interaction state, and the viewport used to map client coordinates. A
//! session is seeded either empty or from an imported [`DiagramDocument`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::core::{
    Database, DiagramError, EditorConfig, ElementId, NodeKind, Point, Viewport,
};

use super::document::DiagramDocument;
use super::history::History;
use super::interaction::{
    Effect, InputEvent, Interaction, InteractionState, Key, Modifiers, PointerTarget, Selection,
};
use super::store::DiagramStore;
use super::traffic::{calculate_traffic, TrafficReport};

/// Scoped hold on global pointer tracking
///
/// Held for the duration of a rectangle selection or drag and released when
/// dropped, including when the pointer leaves the window mid-gesture.
#[derive(Debug)]
pub struct PointerCapture {
    gesture: &'static str,
}

impl PointerCapture {
    fn acquire(gesture: &'static str) -> Self {
        trace!(gesture, "Pointer captured");
        Self { gesture }
    }

    pub fn gesture(&self) -> &'static str {
        self.gesture
    }
}

impl Drop for PointerCapture {
    fn drop(&mut self) {
        trace!(gesture = self.gesture, "Pointer released");
    }
}

/// Events a host feeds into a session
///
/// Pointer coordinates are client coordinates; the session converts them
/// through its [`Viewport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    PointerDown {
        point: Point,
        target: PointerTarget,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        point: Point,
    },
    PointerUp,
    PointerLeave,
    KeyDown {
        key: Key,
    },
    ToggleConnectMode,
    AddNode {
        kind: NodeKind,
        #[serde(default)]
        at: Option<Point>,
    },
    UpdateNodeMetric {
        ids: Vec<ElementId>,
        key: String,
        value: String,
    },
    UpdateEdgeMetric {
        id: ElementId,
        key: String,
        value: String,
    },
    Rename {
        id: ElementId,
        label: String,
    },
    SelectEdge {
        id: ElementId,
    },
    DeleteSelected,
    CalculateTraffic,
    Undo,
    Redo,
}

/// One interactive editing session
#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,
    store: DiagramStore,
    history: History,
    interaction: Interaction,
    capture: Option<PointerCapture>,
    viewport: Viewport,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    /// Empty session; the empty graph is the first history entry
    pub fn new(config: EditorConfig) -> Self {
        let store = DiagramStore::new(&config);
        Self::with_store(config, store)
    }

    /// Session seeded from an imported document
    ///
    /// The document is validated first, so one built in code is held to the
    /// same rules as one parsed from JSON.
    pub fn from_document(
        mut document: DiagramDocument,
        config: EditorConfig,
    ) -> Result<Self, DiagramError> {
        document.validate()?;
        info!(
            components = document.components.len(),
            connections = document.connections.len(),
            "Opening diagram"
        );
        let store = document.into_store(&config);
        Ok(Self::with_store(config, store))
    }

    /// Parse a document and open it
    pub fn from_json(input: &str, config: EditorConfig) -> Result<Self, DiagramError> {
        let document = DiagramDocument::from_json(input)?;
        Self::from_document(document, config)
    }

    fn with_store(config: EditorConfig, store: DiagramStore) -> Self {
        let history = History::seeded(&store, config.history_limit);
        Self {
            config,
            store,
            history,
            interaction: Interaction::new(),
            capture: None,
            viewport: Viewport::default(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &DiagramStore {
        &self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.interaction.selection
    }

    pub fn state(&self) -> &InteractionState {
        &self.interaction.state
    }

    pub fn is_connect_mode(&self) -> bool {
        self.interaction.state.is_connecting()
    }

    pub fn is_pointer_captured(&self) -> bool {
        self.capture.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.store.set_name(name);
    }

    /// Dispatch one event
    ///
    /// Only traffic calculation can fail; every other event is total.
    pub fn handle(&mut self, event: EditorEvent) -> Result<(), DiagramError> {
        trace!(?event, "Handling event");
        match event {
            EditorEvent::PointerDown {
                point,
                target,
                modifiers,
            } => self.input(InputEvent::PointerDown {
                point: self.viewport.to_canvas(point),
                target,
                modifiers,
            }),
            EditorEvent::PointerMove { point } => self.input(InputEvent::PointerMove {
                point: self.viewport.to_canvas(point),
            }),
            EditorEvent::PointerUp => self.input(InputEvent::PointerUp),
            EditorEvent::PointerLeave => self.input(InputEvent::PointerLeave),
            EditorEvent::KeyDown { key } => self.input(InputEvent::KeyDown { key }),
            EditorEvent::ToggleConnectMode => self.toggle_connect_mode(),
            EditorEvent::AddNode { kind, at: None } => {
                self.add_node(kind);
            }
            EditorEvent::AddNode { kind, at: Some(at) } => {
                self.add_node_at(kind, self.viewport.to_canvas(at));
            }
            EditorEvent::UpdateNodeMetric { ids, key, value } => {
                self.update_node_metric(&ids, &key, &value);
            }
            EditorEvent::UpdateEdgeMetric { id, key, value } => {
                self.update_edge_metric(id, &key, &value);
            }
            EditorEvent::Rename { id, label } => {
                self.rename_node(id, &label);
            }
            EditorEvent::SelectEdge { id } => self.select_edge(id),
            EditorEvent::DeleteSelected => self.delete_selected(),
            EditorEvent::CalculateTraffic => {
                self.calculate_traffic()?;
            }
            EditorEvent::Undo => {
                self.undo();
            }
            EditorEvent::Redo => {
                self.redo();
            }
        }
        Ok(())
    }

    /// Feed an event already in canvas coordinates to the state machine
    pub fn input(&mut self, event: InputEvent) {
        let interaction = std::mem::take(&mut self.interaction);
        let step = interaction.step(&event, &mut self.store);
        self.interaction = step.interaction;
        if step.effect == Effect::Commit {
            self.history.commit(&self.store);
        }
        self.sync_capture();
    }

    fn sync_capture(&mut self) {
        let state = &self.interaction.state;
        if state.captures_pointer() {
            if self.capture.is_none() {
                self.capture = Some(PointerCapture::acquire(state.name()));
            }
        } else {
            // dropping the guard releases the capture
            self.capture = None;
        }
    }

    pub fn add_node(&mut self, kind: NodeKind) -> ElementId {
        let id = self.store.add_node(kind).id;
        self.history.commit(&self.store);
        id
    }

    pub fn add_node_at(&mut self, kind: NodeKind, origin: Point) -> ElementId {
        let id = self.store.add_node_at(kind, origin).id;
        self.history.commit(&self.store);
        id
    }

    /// Connect two nodes directly, bypassing connect mode
    pub fn connect(&mut self, from: ElementId, to: ElementId) -> Option<ElementId> {
        let id = self.store.add_edge(from, to, None).map(|edge| edge.id)?;
        self.history.commit(&self.store);
        Some(id)
    }

    pub fn update_node_metric(&mut self, ids: &[ElementId], key: &str, value: &str) -> usize {
        let updated = self.store.update_node_metric(ids, key, value);
        if updated > 0 {
            self.history.commit(&self.store);
        }
        updated
    }

    pub fn update_edge_metric(&mut self, id: ElementId, key: &str, value: &str) -> bool {
        let updated = self.store.update_edge_metric(id, key, value);
        if updated {
            self.history.commit(&self.store);
        }
        updated
    }

    pub fn rename_node(&mut self, id: ElementId, label: &str) -> bool {
        let renamed = self.store.rename_node(id, label);
        if renamed {
            self.history.commit(&self.store);
        }
        renamed
    }

    /// Select one edge, replacing any node selection
    pub fn select_edge(&mut self, id: ElementId) {
        if self.store.get_edge(id).is_some() {
            self.interaction.selection = Selection::Edge(id);
        }
    }

    pub fn toggle_connect_mode(&mut self) {
        self.input(InputEvent::ToggleConnectMode);
    }

    /// Delete the current selection as the delete key would
    pub fn delete_selected(&mut self) {
        self.input(InputEvent::KeyDown { key: Key::Delete });
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.store);
        if undone {
            self.after_restore();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.store);
        if redone {
            self.after_restore();
        }
        redone
    }

    fn after_restore(&mut self) {
        let interaction = std::mem::take(&mut self.interaction);
        self.interaction = interaction.reset_after_restore(&self.store);
        self.sync_capture();
    }

    /// Recompute every rate and write it into the diagram
    ///
    /// Without a users node the diagram is left untouched and
    /// [`DiagramError::NoTrafficSource`] is returned.
    pub fn calculate_traffic(&mut self) -> Result<TrafficReport, DiagramError> {
        let report = calculate_traffic(&self.store, self.config.visit_policy)?;
        self.store.apply_traffic(&report);
        self.history.commit(&self.store);
        debug!(
            overloaded = report.overloaded().count(),
            "Traffic applied to diagram"
        );
        Ok(report)
    }

    /// Serialize the live diagram
    pub fn export(&self) -> DiagramDocument {
        DiagramDocument::from_store(&self.store)
    }

    /// Replace the open diagram with `document`, keeping configuration
    ///
    /// A document that fails validation leaves the session untouched.
    pub fn load(&mut self, document: DiagramDocument) -> Result<(), DiagramError> {
        *self = Self::from_document(document, self.config)?;
        Ok(())
    }
}
