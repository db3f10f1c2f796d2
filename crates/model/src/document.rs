//! Canonical [`Snapshot`] → document.
//!
//! Only the canonical shape is ever written. Each identifier lands under the
//! media kind of its item record; identifiers without a record are written as
//! bare strings under `movies` (bare identifiers read back without a record,
//! so nothing is invented on the way round).

use crate::models::{Category, MediaKind, Snapshot};
use crate::WATCHLISTS_KEY;
use serde_json::{Map, Value};

/// Build the canonical document for `snapshot`.
///
/// The result holds only the `watchlists` key, ready to be merged into the
/// owner's remote document. `settings` and `lastUpdated` belong to other
/// writers and are left out.
///
/// # Examples
///
/// ```
/// use binge_model::{Category, ItemRecord, MediaKind, Snapshot, normalize, to_document};
///
/// let mut snapshot = Snapshot::default();
/// snapshot.insert("1399".into(), Category::Watching);
/// snapshot.upsert_record(ItemRecord::new("1399", MediaKind::Series).with_title("Game of Thrones"));
///
/// let document = to_document(&snapshot);
/// assert_eq!(document["watchlists"]["series"]["watching"][0]["title"], "Game of Thrones");
/// assert_eq!(normalize(&document), snapshot);
/// ```
pub fn to_document(snapshot: &Snapshot) -> Value {
    let mut watchlists = Map::new();
    for kind in MediaKind::ALL {
        let mut lists = Map::new();
        for category in Category::ALL {
            let entries = snapshot
                .ids(category)
                .iter()
                .filter_map(|id| match snapshot.record(id.as_str()) {
                    Some(record) if record.kind == kind => Some(record.to_entry()),
                    Some(_) => None,
                    None if kind == MediaKind::Movie => Some(Value::String(id.to_string())),
                    None => None,
                })
                .collect();
            lists.insert(category.as_str().to_string(), Value::Array(entries));
        }
        watchlists.insert(kind.document_key().to_string(), Value::Object(lists));
    }
    let mut document = Map::new();
    document.insert(WATCHLISTS_KEY.to_string(), Value::Object(watchlists));
    Value::Object(document)
}
