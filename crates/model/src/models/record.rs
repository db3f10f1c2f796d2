use super::{ItemId, MediaKind};
use serde_json::{Map, Value};

/// Display metadata for a tracked item.
///
/// Stored once per identifier, independent of which list references it. A
/// missing record only means "metadata unknown": an identifier can be a
/// perfectly valid list member without one.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub kind: MediaKind,
    pub title: Option<String>,
    /// Display year, e.g. `"1999"`
    pub year: Option<String>,
    /// Artwork reference (path or URL, whatever the metadata source gave us)
    pub poster: Option<String>,
    pub rating: Option<f64>,
}

impl ItemRecord {
    pub fn new(id: impl Into<ItemId>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            kind,
            title: None,
            year: None,
            poster: None,
            rating: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// The list entry written into canonical documents.
    pub fn to_entry(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("id".into(), Value::String(self.id.to_string()));
        entry.insert("media_type".into(), Value::String(self.kind.as_str().to_string()));
        if let Some(title) = &self.title {
            entry.insert("title".into(), Value::String(title.clone()));
        }
        if let Some(year) = &self.year {
            entry.insert("year".into(), Value::String(year.clone()));
        }
        if let Some(poster) = &self.poster {
            entry.insert("poster".into(), Value::String(poster.clone()));
        }
        // NaN/infinite ratings have no JSON representation; drop them.
        if let Some(rating) = self.rating.and_then(serde_json::Number::from_f64) {
            entry.insert("rating".into(), Value::Number(rating));
        }
        Value::Object(entry)
    }
}
