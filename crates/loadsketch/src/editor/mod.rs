//! Editor components
//!
//! The diagram store and everything layered on it: snapshot history, the
//! interaction state machine, traffic propagation, the exchange document,
//! and the session that ties them together.

pub mod document;
pub mod history;
pub mod interaction;
pub mod session;
pub mod store;
pub mod traffic;

pub use document::*;
pub use history::*;
pub use interaction::*;
pub use session::*;
pub use store::*;
pub use traffic::*;
