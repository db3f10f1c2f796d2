use crate::notify::{Change, Operation, Outcome};
use binge_cache::CacheStore;
use binge_model::{Category, ItemId, ItemRecord, Snapshot};

/// One of the three ways a watchlist can be changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Add {
        id: ItemId,
        category: Category,
        record: Option<ItemRecord>,
    },
    Move {
        id: ItemId,
        from: Category,
        to: Category,
    },
    Remove {
        id: ItemId,
        category: Category,
    },
}

impl Mutation {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Add { .. } => Operation::Add,
            Self::Move { .. } => Operation::Move,
            Self::Remove { .. } => Operation::Remove,
        }
    }

    pub fn item_id(&self) -> &ItemId {
        match self {
            Self::Add { id, .. } | Self::Move { id, .. } | Self::Remove { id, .. } => id,
        }
    }

    /// Apply to the cache. Returns `false` if nothing changed.
    pub fn apply(&self, cache: &CacheStore) -> bool {
        match self {
            Self::Add { id, category, record } => cache.add_item(id, *category, record.clone()),
            Self::Move { id, from, to } => cache.move_item(id, *from, *to),
            Self::Remove { id, category } => cache.remove_item(id, *category),
        }
    }

    /// Describe this mutation for subscribers. `before` is the snapshot it
    /// was applied to; an added item may have left another category.
    pub fn change(&self, before: &Snapshot, outcome: Outcome) -> Change {
        let (from, to) = match self {
            Self::Add { id, category, .. } => (before.category_of(id.as_str()), Some(*category)),
            Self::Move { from, to, .. } => (Some(*from), Some(*to)),
            Self::Remove { category, .. } => (Some(*category), None),
        };
        Change {
            operation: self.operation(),
            item_id: self.item_id().clone(),
            from,
            to,
            outcome,
        }
    }
}
