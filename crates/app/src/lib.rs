#![forbid(unsafe_code)]

//! Application layer: the session that owns the list, its index and the derived
//! tree; the reconciler that folds in writes from other devices; and the pieces the
//! `linktree` binary is assembled from.

pub mod config;
mod error;
pub mod flags;
pub mod reconciler;
pub mod render;
mod session;
pub mod telemetry;

pub use error::SessionError;
pub use flags::{FooterMessage, PermissionProbe, PermissionState};
pub use reconciler::{Debouncer, PendingSync, SyncReconciler};
pub use session::{AppSession, RecordEdit};
