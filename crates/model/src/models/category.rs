use super::sanitize;
use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// The three mutually exclusive membership lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Currently watching
    Watching,
    /// Want to watch
    Wishlist,
    /// Finished
    Watched,
}

impl Category {
    /// Every category, in document order.
    pub const ALL: [Category; 3] = [Category::Watching, Category::Wishlist, Category::Watched];

    /// Name used as the list key in persisted documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Watching => "watching",
            Category::Wishlist => "wishlist",
            Category::Watched => "watched",
        }
    }
}

impl FromStr for Category {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "watching" => Self::Watching,
            "wishlist" => Self::Wishlist,
            "watched" => Self::Watched,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "category",
                value: s.to_string()
            }),
        })
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
