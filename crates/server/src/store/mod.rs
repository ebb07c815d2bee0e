//! In-memory state shared across requests.
//!
//! Every entry sits behind its own async mutex: requests for one key are
//! serialized, requests for different keys run in parallel.

pub mod editor;
pub mod sessions;

pub use editor::{EditorStore, PuzzleDraft};
pub use sessions::SessionStore;
