//! WebAssembly bindings for Loadsketch
//!
//! Wraps an [`EditorSession`] behind a JSON-in/JSON-out API for browser
//! hosts. Events use the same tagged form as [`EditorEvent`].

use wasm_bindgen::prelude::*;

use crate::core::{EditorConfig, VisitPolicy};
use crate::editor::{DiagramDocument, EditorEvent, EditorSession};

/// Initialize WASM module
///
/// Sets up panic hooks and logging for better error messages in the browser.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    // logs go to the browser console
    use crate::core::logging::init_logging;
    let _ = init_logging(Some("info"), None);
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Browser handle on one editor session
#[wasm_bindgen]
pub struct WasmEditor {
    session: EditorSession,
}

#[wasm_bindgen]
impl WasmEditor {
    /// Create an empty editor
    ///
    /// `visit_policy` is `"shared-path"` (default) or `"per-branch"`.
    #[wasm_bindgen(constructor)]
    pub fn new(visit_policy: Option<String>) -> Result<WasmEditor, JsValue> {
        let policy = match visit_policy {
            Some(name) => name.parse::<VisitPolicy>().map_err(js_error)?,
            None => VisitPolicy::default(),
        };
        let config = EditorConfig::default().with_visit_policy(policy);
        Ok(WasmEditor {
            session: EditorSession::new(config),
        })
    }

    /// Replace the open diagram with an exchange document
    pub fn load(&mut self, document: &str) -> Result<(), JsValue> {
        let document = DiagramDocument::from_json(document).map_err(js_error)?;
        self.session.load(document).map_err(js_error)
    }

    /// Apply one JSON-encoded event
    pub fn handle_event(&mut self, event: &str) -> Result<(), JsValue> {
        let event: EditorEvent = serde_json::from_str(event).map_err(js_error)?;
        self.session.handle(event).map_err(js_error)
    }

    /// Run the traffic calculation and return the report as JSON
    pub fn calculate(&mut self) -> Result<String, JsValue> {
        let report = self.session.calculate_traffic().map_err(js_error)?;
        serde_json::to_string(&report).map_err(js_error)
    }

    /// Export the live diagram as a pretty-printed document
    pub fn export(&self) -> Result<String, JsValue> {
        self.session.export().to_json_pretty().map_err(js_error)
    }

    /// Current selection as JSON
    pub fn selection(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.selection()).map_err(js_error)
    }

    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.session.redo()
    }

    pub fn is_connect_mode(&self) -> bool {
        self.session.is_connect_mode()
    }
}
