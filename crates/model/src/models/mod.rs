mod category;
mod id;
mod kind;
mod owner;
mod record;
mod snapshot;

pub use self::category::Category;
pub use self::id::ItemId;
pub use self::kind::MediaKind;
pub use self::owner::OwnerId;
pub use self::record::ItemRecord;
pub use self::snapshot::{Counts, Snapshot};

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace('/', "").replace('-', "").replace('_', "").replace(' ', "")
}
