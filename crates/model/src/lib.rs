//! Canonical watchlist model.
//!
//! Everything the sync engine reasons about lives here: item identifiers,
//! the three membership [`Category`]s, per-item metadata ([`ItemRecord`]) and
//! the [`Snapshot`] tying them together for one [`OwnerId`].
//!
//! Raw documents (remote or locally mirrored) have changed shape over time.
//! [`normalize()`] reads any of them; [`to_document()`] only ever writes the
//! current, canonical one.

pub mod document;
pub mod error;
pub mod models;
pub mod normalize;

pub use crate::document::to_document;
pub use crate::models::{Category, Counts, ItemId, ItemRecord, MediaKind, OwnerId, Snapshot};
pub use crate::normalize::{Shape, detect, normalize};

/// Key under which the canonical document nests its per-kind lists.
pub const WATCHLISTS_KEY: &str = "watchlists";
/// Server-assigned modification timestamp; never written by this crate.
pub const LAST_UPDATED_KEY: &str = "lastUpdated";
/// User settings living in the same document. Preserved, never touched.
pub const SETTINGS_KEY: &str = "settings";
