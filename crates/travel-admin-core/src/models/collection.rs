use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The cloud database collections the admin dashboard manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Products,
    Regions,
    Banners,
    Orders,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Products,
        Collection::Regions,
        Collection::Banners,
        Collection::Orders,
    ];

    /// Collection name as used on the wire and in store file names.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Regions => "regions",
            Collection::Banners => "banners",
            Collection::Orders => "orders",
        }
    }

    /// Whether the dashboard may create or delete records in this collection.
    /// Orders come from the mini-program; the dashboard only updates their status.
    pub fn is_editable(&self) -> bool {
        !matches!(self, Collection::Orders)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCollection(pub String);

impl fmt::Display for UnknownCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown collection: {}", self.0)
    }
}

impl std::error::Error for UnknownCollection {}

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}
