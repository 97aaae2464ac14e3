//! SketchDeck Core Library
//!
//! Platform-agnostic canvas state for the SketchDeck editor: the scene graph,
//! undo/redo history, snapping, tool dispatch and debounced persistence.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod editor;
pub mod generation;
pub mod history;
pub mod input;
pub mod record;
pub mod selection;
pub mod shapes;
pub mod shortcuts;
pub mod snap;
pub mod storage;
pub mod thumbnail;
pub mod tools;

#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;

pub use camera::Camera;
pub use canvas::{SceneChange, SceneGraph};
pub use config::EditorConfig;
pub use editor::{Editor, Notification, NotificationLevel};
pub use generation::{GeneratedImage, GenerationError, GenerationKind};
pub use history::{History, HistoryError, RecordGate};
pub use input::{KeyEvent, Modifiers, PointerEvent, TouchEvent, WheelEvent};
pub use record::{LoadReport, SceneDocument, decode_scene_lenient, encode_scene};
pub use selection::{Selection, SelectionSummary};
pub use shapes::{ObjectId, ObjectKind, Rgba, SceneObject, StickyColor};
pub use snap::{SnapConfig, SnapGuide, SnapOutcome, snap_position};
pub use storage::{DocumentStore, MemoryDocumentStore, PersistenceBridge, SaveStatus, StorageError};
pub use thumbnail::{Thumbnail, render_thumbnail};
pub use tools::{ToolFactories, ToolKind, ToolManager};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileDocumentStore;
