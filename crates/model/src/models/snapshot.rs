use super::{Category, ItemId, ItemRecord};
use std::collections::{BTreeMap, BTreeSet};

/// One owner's complete watchlist state: three membership sets plus the item
/// record side-table.
///
/// A `Snapshot` is a plain value. It does not enforce the "one category per
/// item" rule on its own (historical data can violate it); the cache's
/// mutation entry points do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    watching: BTreeSet<ItemId>,
    wishlist: BTreeSet<ItemId>,
    watched: BTreeSet<ItemId>,
    items: BTreeMap<ItemId, ItemRecord>,
}

/// Per-category sizes, for badges and counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub watching: usize,
    pub wishlist: usize,
    pub watched: usize,
}
impl Counts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Watching => self.watching,
            Category::Wishlist => self.wishlist,
            Category::Watched => self.watched,
        }
    }

    pub fn total(&self) -> usize {
        self.watching + self.wishlist + self.watched
    }
}

impl Snapshot {
    pub fn ids(&self, category: Category) -> &BTreeSet<ItemId> {
        match category {
            Category::Watching => &self.watching,
            Category::Wishlist => &self.wishlist,
            Category::Watched => &self.watched,
        }
    }

    fn ids_mut(&mut self, category: Category) -> &mut BTreeSet<ItemId> {
        match category {
            Category::Watching => &mut self.watching,
            Category::Wishlist => &mut self.wishlist,
            Category::Watched => &mut self.watched,
        }
    }

    pub fn contains(&self, id: &str, category: Category) -> bool {
        self.ids(category).contains(id)
    }

    /// First category (in document order) containing `id`.
    pub fn category_of(&self, id: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|category| self.contains(id, *category))
    }

    /// Every category containing `id`. More than one only for historical data.
    pub fn categories_of(&self, id: &str) -> Vec<Category> {
        Category::ALL.into_iter().filter(|category| self.contains(id, *category)).collect()
    }

    /// Insert into one set. Returns `false` if it was already there.
    pub fn insert(&mut self, id: ItemId, category: Category) -> bool {
        self.ids_mut(category).insert(id)
    }

    /// Remove from one set. Returns `false` if it wasn't there.
    pub fn remove(&mut self, id: &str, category: Category) -> bool {
        self.ids_mut(category).remove(id)
    }

    pub fn record(&self, id: &str) -> Option<&ItemRecord> {
        self.items.get(id)
    }

    pub fn records(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.values()
    }

    pub fn upsert_record(&mut self, record: ItemRecord) {
        self.items.insert(record.id.clone(), record);
    }

    /// Drop records no list references any more. Returns how many went.
    pub fn prune_records(&mut self) -> usize {
        let before = self.items.len();
        let (watching, wishlist, watched) = (&self.watching, &self.wishlist, &self.watched);
        self.items.retain(|id, _| watching.contains(id) || wishlist.contains(id) || watched.contains(id));
        before - self.items.len()
    }

    pub fn counts(&self) -> Counts {
        Counts {
            watching: self.watching.len(),
            wishlist: self.wishlist.len(),
            watched: self.watched.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    /// Compare membership only, ignoring item records.
    pub fn same_members(&self, other: &Snapshot) -> bool {
        Category::ALL.into_iter().all(|category| self.ids(category) == other.ids(category))
    }
}
