//! Favorite products, persisted as full product records keyed by id

use std::sync::Arc;

use crate::gift_engine::Product;
use crate::storage::{get_json, set_json, KeyValueStorage};

const STORAGE_KEY: &str = "favorite_products";

pub struct FavoritesService {
    storage: Arc<dyn KeyValueStorage>,
}

impl FavoritesService {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub fn list(&self) -> Vec<Product> {
        get_json(self.storage.as_ref(), STORAGE_KEY).unwrap_or_default()
    }

    /// Adds a product; returns false when it is already a favorite.
    pub fn add(&self, product: Product) -> bool {
        if self.is_favorite(&product.id) {
            return false;
        }
        let mut favorites = self.list();
        favorites.push(product);
        set_json(self.storage.as_ref(), STORAGE_KEY, &favorites)
    }

    pub fn remove(&self, product_id: &str) -> bool {
        let mut favorites = self.list();
        favorites.retain(|p| p.id != product_id);
        set_json(self.storage.as_ref(), STORAGE_KEY, &favorites)
    }

    pub fn is_favorite(&self, product_id: &str) -> bool {
        self.list().iter().any(|p| p.id == product_id)
    }

    pub fn clear(&self) -> bool {
        self.storage.remove(STORAGE_KEY)
    }
}
