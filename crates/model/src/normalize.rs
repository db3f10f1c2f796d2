//! Raw document → canonical [`Snapshot`].
//!
//! Two document shapes have existed over time:
//!
//! ```text
//! canonical: { "watchlists": { "movies": { "watching": [..], .. }, "series": { .. } } }
//! legacy:    { "movies": { "watching": [..], .. }, "series": { .. } }
//! ```
//!
//! List entries are either bare identifiers (`"603"`, `603`) or item-like
//! objects carrying an identifier plus display metadata. Anything else is
//! dropped, as is any entry without a usable identifier. Normalization never
//! fails: the worst case is an empty snapshot.

use crate::error::{ErrorKind, Result};
use crate::models::{Category, ItemId, ItemRecord, MediaKind, Snapshot};
use crate::WATCHLISTS_KEY;
use exn::OptionExt;
use serde_json::{Map, Value};

/// Identifier fields of item-like entries, in order of preference.
pub const ID_FIELDS: [&str; 3] = ["id", "tmdbId", "itemId"];

/// Which shape a raw document holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Nested under a `watchlists` object, populated or not.
    Canonical,
    /// No `watchlists` object, but top-level per-kind lists with at least
    /// one entry.
    Legacy,
    /// No `watchlists` object and no legacy entries.
    Empty,
}

/// Classify a raw document.
///
/// Only canonical documents are ever written, so a `watchlists` object is
/// authoritative even when every list in it is empty: legacy keys next to
/// it are leftovers and are ignored.
pub fn detect(raw: &Value) -> Shape {
    if raw.get(WATCHLISTS_KEY).is_some_and(Value::is_object) {
        Shape::Canonical
    } else if has_entries(raw) {
        Shape::Legacy
    } else {
        Shape::Empty
    }
}

/// Normalize any known document shape into a [`Snapshot`].
///
/// # Examples
///
/// ```
/// use binge_model::{Category, normalize};
/// use serde_json::json;
///
/// let raw = json!({"watchlists": {"movies": {"watching": [{"id": 1}, "2"]}, "series": {}}});
/// let snapshot = normalize(&raw);
/// assert!(snapshot.contains("1", Category::Watching));
/// assert!(snapshot.contains("2", Category::Watching));
/// assert!(snapshot.ids(Category::Watched).is_empty());
/// ```
pub fn normalize(raw: &Value) -> Snapshot {
    match detect(raw) {
        Shape::Canonical => from_kinds(&raw[WATCHLISTS_KEY]),
        Shape::Legacy => from_kinds(raw),
        Shape::Empty => Snapshot::default(),
    }
}

fn lists<'a>(root: &'a Value, kind: MediaKind, category: Category) -> Option<&'a Value> {
    root.get(kind.document_key())?.get(category.as_str())
}

fn has_entries(root: &Value) -> bool {
    MediaKind::ALL.into_iter().any(|kind| {
        Category::ALL.into_iter().any(|category| {
            lists(root, kind, category).and_then(Value::as_array).is_some_and(|entries| !entries.is_empty())
        })
    })
}

fn from_kinds(root: &Value) -> Snapshot {
    let mut snapshot = Snapshot::default();
    for kind in MediaKind::ALL {
        for category in Category::ALL {
            let Some(entries) = lists(root, kind, category) else {
                continue;
            };
            let Some(entries) = entries.as_array() else {
                tracing::debug!(%kind, %category, "Ignoring watchlist category that is not a list");
                continue;
            };
            for entry in entries {
                match read_entry(entry, kind) {
                    Ok((id, record)) => {
                        snapshot.insert(id, category);
                        if let Some(record) = record {
                            snapshot.upsert_record(record);
                        }
                    },
                    Err(e) => tracing::debug!(%kind, %category, error = %e, "Dropping malformed watchlist entry"),
                }
            }
        }
    }
    snapshot
}

fn read_entry(entry: &Value, kind: MediaKind) -> Result<(ItemId, Option<ItemRecord>)> {
    match entry {
        Value::String(_) | Value::Number(_) => Ok((coerce_id(entry)?, None)),
        Value::Object(fields) => {
            let id = ID_FIELDS
                .into_iter()
                .filter_map(|field| fields.get(field))
                .find_map(|value| coerce_id(value).ok())
                .ok_or_raise(|| ErrorKind::MissingId)?;
            let record = read_record(id.clone(), fields, kind);
            Ok((id, Some(record)))
        },
        Value::Null => exn::bail!(ErrorKind::UnsupportedEntry("null")),
        Value::Bool(_) => exn::bail!(ErrorKind::UnsupportedEntry("boolean")),
        Value::Array(_) => exn::bail!(ErrorKind::UnsupportedEntry("array")),
    }
}

/// Identifiers are compared as strings, so numbers are rendered the way
/// they were originally issued: `603`, never `603.0`. Strings are opaque
/// and kept exactly as written.
fn coerce_id(value: &Value) -> Result<ItemId> {
    let id = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(u), _, _) => u.to_string(),
            (_, Some(i), _) => i.to_string(),
            (_, _, Some(f)) if f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        other => exn::bail!(ErrorKind::ParseError {
            field: "id",
            value: other.to_string()
        }),
    };
    if id.is_empty() {
        exn::bail!(ErrorKind::MissingId);
    }
    Ok(ItemId::from(id))
}

fn text(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().filter_map(|name| fields.get(*name)).find_map(|value| match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn number(fields: &Map<String, Value>, names: &[&str]) -> Option<f64> {
    names.iter().filter_map(|name| fields.get(*name)).find_map(|value| match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn read_record(id: ItemId, fields: &Map<String, Value>, kind: MediaKind) -> ItemRecord {
    let kind = fields
        .get("media_type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<MediaKind>().ok())
        .unwrap_or(kind);
    let year = text(fields, &["year"]).or_else(|| {
        text(fields, &["release_date", "first_air_date"])
            .and_then(|date| date.get(..4).map(str::to_string))
            .filter(|year| year.chars().all(|c| c.is_ascii_digit()))
    });
    ItemRecord {
        id,
        kind,
        title: text(fields, &["title", "name"]),
        year,
        poster: text(fields, &["poster", "poster_path"]),
        rating: number(fields, &["rating", "vote_average"]).filter(|r| r.is_finite()),
    }
}
