#![forbid(unsafe_code)]

//! Domain core for a curated, hierarchical list of named links.
//!
//! The flat list of [`record::FlatRecord`]s is the source of truth. Everything else
//! here (the name index, the derived tree, the fingerprint cache) is recomputed from
//! it and can be thrown away at any time.

pub mod favicon;
pub mod index;
pub mod observable;
pub mod record;
pub mod settings;
pub mod store;
pub mod tree;
pub mod validate;

pub use index::NameIndex;
pub use observable::{Observable, SubscriptionId};
pub use record::{FaviconProvider, FlatRecord, IconBorder};
pub use settings::{Settings, Theme};
pub use store::{Applied, MutationError, RecordStore};
pub use tree::{ROOT_NAME, TreeBuild, TreeCache, TreeDiagnostic, TreeNode, build_tree};
pub use validate::{ValidationError, is_valid_url, validate_new_item};
