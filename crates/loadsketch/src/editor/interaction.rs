//! Selection and interaction state machine
//!
//! Pointer and keyboard input is interpreted by a single transition function,
//! [`Interaction::step`], which consumes the current interaction value and
//! one [`InputEvent`] and produces the next value plus an [`Effect`] telling
//! the caller whether a history entry should be committed.
//!
//! Connect mode is not a separate flag: it is on exactly while the state is
//! one of the `Connecting*` variants.
//!
//! All points carried by [`InputEvent`] are canvas-local and zoom-normalized;
//! see [`Viewport`](crate::core::Viewport) for the conversion.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

use crate::core::{Database, ElementId, Point, Rect};

use super::store::DiagramStore;

/// Modifier keys held during a pointer press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
    };

    /// Ctrl on most platforms, cmd on macOS
    pub fn additive(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What a pointer press landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerTarget {
    Canvas,
    Node(ElementId),
    Edge(ElementId),
}

/// Keyboard keys the editor reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    Delete,
    Backspace,
    Other(String),
}

impl Key {
    pub fn is_delete(&self) -> bool {
        matches!(self, Key::Delete | Key::Backspace)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Delete" => Key::Delete,
            "Backspace" => Key::Backspace,
            _ => Key::Other(name),
        }
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        match key {
            Key::Delete => "Delete".to_string(),
            Key::Backspace => "Backspace".to_string(),
            Key::Other(name) => name,
        }
    }
}

/// One input event in canvas coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        point: Point,
        target: PointerTarget,
        modifiers: Modifiers,
    },
    PointerMove {
        point: Point,
    },
    PointerUp,
    /// Pointer left the window mid-gesture; handled like a release
    PointerLeave,
    KeyDown {
        key: Key,
    },
    ToggleConnectMode,
}

/// The current selection: a set of nodes or a single edge, never both
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "ids", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    None,
    Nodes(BTreeSet<ElementId>),
    Edge(ElementId),
}

impl Selection {
    fn from_nodes(ids: BTreeSet<ElementId>) -> Self {
        if ids.is_empty() {
            Selection::None
        } else {
            Selection::Nodes(ids)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::None)
    }

    /// Selected node ids in ascending order (empty for an edge selection)
    pub fn node_ids(&self) -> Vec<ElementId> {
        match self {
            Selection::Nodes(ids) => ids.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub fn edge_id(&self) -> Option<ElementId> {
        match self {
            Selection::Edge(id) => Some(*id),
            _ => None,
        }
    }

    pub fn contains_node(&self, id: ElementId) -> bool {
        matches!(self, Selection::Nodes(ids) if ids.contains(&id))
    }

    fn nodes_or_empty(&self) -> BTreeSet<ElementId> {
        match self {
            Selection::Nodes(ids) => ids.clone(),
            _ => BTreeSet::new(),
        }
    }
}

/// Named states of the interaction
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    RectSelecting {
        start: Point,
        current: Point,
    },
    /// Grab offset (pointer minus node origin) per dragged node
    Dragging {
        offsets: BTreeMap<ElementId, Point>,
        moved: bool,
    },
    ConnectingAwaitingFirst,
    ConnectingAwaitingSecond {
        first: ElementId,
    },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::RectSelecting { .. } => "rect-selecting",
            InteractionState::Dragging { .. } => "dragging",
            InteractionState::ConnectingAwaitingFirst => "connecting-awaiting-first",
            InteractionState::ConnectingAwaitingSecond { .. } => "connecting-awaiting-second",
        }
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            InteractionState::ConnectingAwaitingFirst
                | InteractionState::ConnectingAwaitingSecond { .. }
        )
    }

    /// States during which global pointer tracking is held
    pub fn captures_pointer(&self) -> bool {
        matches!(
            self,
            InteractionState::RectSelecting { .. } | InteractionState::Dragging { .. }
        )
    }

    /// Rectangle being drawn, if any
    pub fn selection_rect(&self) -> Option<Rect> {
        match self {
            InteractionState::RectSelecting { start, current } => {
                Some(Rect::from_corners(*start, *current))
            }
            _ => None,
        }
    }
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    None,
    /// The store changed in a way that deserves its own history entry
    Commit,
}

impl Effect {
    fn or(self, other: Effect) -> Effect {
        if self == Effect::Commit || other == Effect::Commit {
            Effect::Commit
        } else {
            Effect::None
        }
    }
}

/// Result of one transition
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub interaction: Interaction,
    pub effect: Effect,
}

impl Step {
    fn new(interaction: Interaction, effect: Effect) -> Self {
        Self {
            interaction,
            effect,
        }
    }
}

/// Interaction state plus selection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interaction {
    pub state: InteractionState,
    pub selection: Selection,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one input event
    ///
    /// Store mutations (moves, new edges, deletes) happen here; committing
    /// history is left to the caller according to the returned effect.
    pub fn step(self, event: &InputEvent, store: &mut DiagramStore) -> Step {
        let previous = self.state.name();
        let step = match event {
            InputEvent::PointerDown {
                point,
                target,
                modifiers,
            } => self.pointer_down(*point, *target, *modifiers, store),
            InputEvent::PointerMove { point } => self.pointer_move(*point, store),
            InputEvent::PointerUp | InputEvent::PointerLeave => self.release(store),
            InputEvent::KeyDown { key } if key.is_delete() => self.delete_selection(store),
            InputEvent::KeyDown { .. } => Step::new(self, Effect::None),
            InputEvent::ToggleConnectMode => self.toggle_connect_mode(),
        };
        trace!(
            from = previous,
            to = step.interaction.state.name(),
            commit = step.effect == Effect::Commit,
            "Interaction transition"
        );
        step
    }

    /// Drop transient state after the store was replaced by a snapshot
    pub fn reset_after_restore(self, store: &DiagramStore) -> Self {
        let state = match self.state {
            InteractionState::ConnectingAwaitingSecond { first } if store.has_node(first) => {
                InteractionState::ConnectingAwaitingSecond { first }
            }
            state if state.is_connecting() => InteractionState::ConnectingAwaitingFirst,
            _ => InteractionState::Idle,
        };
        Self {
            state,
            selection: Selection::None,
        }
    }

    fn pointer_down(
        self,
        point: Point,
        target: PointerTarget,
        modifiers: Modifiers,
        store: &mut DiagramStore,
    ) -> Step {
        // a press without a matching release finishes the previous gesture first
        if self.state.captures_pointer() {
            let released = self.release(store);
            let next = released
                .interaction
                .pointer_down(point, target, modifiers, store);
            return Step::new(next.interaction, released.effect.or(next.effect));
        }

        match target {
            PointerTarget::Canvas => self.canvas_down(point),
            PointerTarget::Node(id) if !store.has_node(id) => Step::new(self, Effect::None),
            PointerTarget::Node(id) if self.state.is_connecting() => self.connect_pick(id, store),
            PointerTarget::Node(id) => self.node_down(id, point, modifiers, store),
            PointerTarget::Edge(id) if store.get_edge(id).is_some() => Step::new(
                Interaction {
                    state: self.state,
                    selection: Selection::Edge(id),
                },
                Effect::None,
            ),
            PointerTarget::Edge(_) => Step::new(self, Effect::None),
        }
    }

    fn canvas_down(self, point: Point) -> Step {
        let state = if self.state.is_connecting() {
            InteractionState::Idle
        } else {
            InteractionState::RectSelecting {
                start: point,
                current: point,
            }
        };
        Step::new(
            Interaction {
                state,
                selection: Selection::None,
            },
            Effect::None,
        )
    }

    fn connect_pick(self, id: ElementId, store: &mut DiagramStore) -> Step {
        match self.state {
            InteractionState::ConnectingAwaitingSecond { first } if first == id => {
                Step::new(self, Effect::None)
            }
            InteractionState::ConnectingAwaitingSecond { first } => {
                if store.add_edge(first, id, None).is_some() {
                    Step::new(
                        Interaction {
                            state: InteractionState::Idle,
                            selection: self.selection,
                        },
                        Effect::Commit,
                    )
                } else {
                    // the first pick disappeared; start over from this node
                    Step::new(
                        Interaction {
                            state: InteractionState::ConnectingAwaitingSecond { first: id },
                            selection: self.selection,
                        },
                        Effect::None,
                    )
                }
            }
            _ => Step::new(
                Interaction {
                    state: InteractionState::ConnectingAwaitingSecond { first: id },
                    selection: self.selection,
                },
                Effect::None,
            ),
        }
    }

    fn node_down(
        self,
        id: ElementId,
        point: Point,
        modifiers: Modifiers,
        store: &DiagramStore,
    ) -> Step {
        let mut ids = self.selection.nodes_or_empty();

        if modifiers.additive() {
            ids.insert(id);
            return Step::new(
                Interaction {
                    state: InteractionState::Idle,
                    selection: Selection::from_nodes(ids),
                },
                Effect::None,
            );
        }
        if modifiers.shift {
            if !ids.remove(&id) {
                ids.insert(id);
            }
            return Step::new(
                Interaction {
                    state: InteractionState::Idle,
                    selection: Selection::from_nodes(ids),
                },
                Effect::None,
            );
        }

        if !ids.contains(&id) {
            ids = BTreeSet::from([id]);
        }
        let offsets = ids
            .iter()
            .filter_map(|node_id| store.get_node(*node_id))
            .map(|node| (node.id, point.offset_from(node.origin())))
            .collect();
        Step::new(
            Interaction {
                state: InteractionState::Dragging {
                    offsets,
                    moved: false,
                },
                selection: Selection::from_nodes(ids),
            },
            Effect::None,
        )
    }

    fn pointer_move(self, point: Point, store: &mut DiagramStore) -> Step {
        match self.state {
            InteractionState::RectSelecting { start, .. } => Step::new(
                Interaction {
                    state: InteractionState::RectSelecting {
                        start,
                        current: point,
                    },
                    selection: self.selection,
                },
                Effect::None,
            ),
            InteractionState::Dragging { offsets, moved } => {
                let mut any_moved = moved;
                for (id, offset) in &offsets {
                    let Some(origin) = store.get_node(*id).map(|n| n.origin()) else {
                        continue;
                    };
                    let target = point.offset_from(*offset);
                    let (dx, dy) = (target.x - origin.x, target.y - origin.y);
                    if dx != 0.0 || dy != 0.0 {
                        store.move_nodes(&[*id], dx, dy);
                        any_moved |= store.get_node(*id).is_some_and(|n| n.origin() != origin);
                    }
                }
                Step::new(
                    Interaction {
                        state: InteractionState::Dragging {
                            offsets,
                            moved: any_moved,
                        },
                        selection: self.selection,
                    },
                    Effect::None,
                )
            }
            state => Step::new(
                Interaction {
                    state,
                    selection: self.selection,
                },
                Effect::None,
            ),
        }
    }

    fn release(self, store: &DiagramStore) -> Step {
        match self.state {
            InteractionState::RectSelecting { start, current } => {
                let rect = Rect::from_corners(start, current);
                let ids = store.nodes_in_rect(&rect).into_iter().collect();
                Step::new(
                    Interaction {
                        state: InteractionState::Idle,
                        selection: Selection::from_nodes(ids),
                    },
                    Effect::None,
                )
            }
            InteractionState::Dragging { moved, .. } => Step::new(
                Interaction {
                    state: InteractionState::Idle,
                    selection: self.selection,
                },
                if moved { Effect::Commit } else { Effect::None },
            ),
            state => Step::new(
                Interaction {
                    state,
                    selection: self.selection,
                },
                Effect::None,
            ),
        }
    }

    fn delete_selection(self, store: &mut DiagramStore) -> Step {
        if self.selection.is_empty() {
            return Step::new(self, Effect::None);
        }
        let node_ids = self.selection.node_ids();
        let removed = store.delete_by_ids(&node_ids, self.selection.edge_id());

        let state = match self.state {
            InteractionState::Dragging { mut offsets, moved } => {
                offsets.retain(|id, _| store.has_node(*id));
                InteractionState::Dragging { offsets, moved }
            }
            InteractionState::ConnectingAwaitingSecond { first } if !store.has_node(first) => {
                InteractionState::ConnectingAwaitingFirst
            }
            state => state,
        };
        let effect = if removed.is_empty() {
            Effect::None
        } else {
            Effect::Commit
        };
        Step::new(
            Interaction {
                state,
                selection: Selection::None,
            },
            effect,
        )
    }

    fn toggle_connect_mode(self) -> Step {
        match self.state {
            state if state.is_connecting() => Step::new(
                Interaction {
                    state: InteractionState::Idle,
                    selection: self.selection,
                },
                Effect::None,
            ),
            state => {
                let effect = match state {
                    InteractionState::Dragging { moved: true, .. } => Effect::Commit,
                    _ => Effect::None,
                };
                Step::new(
                    Interaction {
                        state: InteractionState::ConnectingAwaitingFirst,
                        selection: self.selection,
                    },
                    effect,
                )
            }
        }
    }
}
