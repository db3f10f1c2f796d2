pub mod backend;
pub mod error;
mod key;
mod merge;

pub use crate::backend::{LocalStore, RemoteStore, SetOptions};
pub use crate::key::validate as validate_key;
pub use crate::merge::merge_into;
use std::sync::Arc;

pub type RemoteHandle = Arc<dyn RemoteStore + Send + Sync>;
pub type LocalHandle = Arc<dyn LocalStore + Send + Sync>;
