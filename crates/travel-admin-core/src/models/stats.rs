use serde::{Deserialize, Serialize};

use super::Collection;

/// Record counts shown on the dashboard overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub product_count: usize,
    pub region_count: usize,
    pub banner_count: usize,
    pub order_count: usize,
}

impl Stats {
    pub fn set(&mut self, collection: Collection, count: usize) {
        match collection {
            Collection::Products => self.product_count = count,
            Collection::Regions => self.region_count = count,
            Collection::Banners => self.banner_count = count,
            Collection::Orders => self.order_count = count,
        }
    }

    pub fn get(&self, collection: Collection) -> usize {
        match collection {
            Collection::Products => self.product_count,
            Collection::Regions => self.region_count,
            Collection::Banners => self.banner_count,
            Collection::Orders => self.order_count,
        }
    }
}
