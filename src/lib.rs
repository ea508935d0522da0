//! flyout - transient UI surfaces over a headless document
//!
//! Dialogs, overflow menus and popovers are created on demand, positioned
//! against a trigger node, tracked so they can be closed together, and torn
//! down with focus handed back to where it was.

pub mod cli;
pub mod config;
pub mod config_paths;
pub mod document;
pub mod error;
pub mod focus;
pub mod geometry;
pub mod lifecycle;
pub mod menu;
pub mod messages;
pub mod mount;
pub mod positioning;
pub mod registry;
pub mod scenario;
pub mod scheduler;
pub mod surface;
pub mod tracing;
pub mod update;

// Re-export commonly used types
pub use config::SurfaceDefaults;
pub use document::{Document, NodeId};
pub use error::SurfaceError;
pub use lifecycle::SurfaceManager;
pub use messages::Msg;
pub use positioning::{compute_placement, Placement, PlacementRequest, Side};
pub use surface::{CloseEvent, CloseReason, LifecycleState, SurfaceConfig, SurfaceHandle};
