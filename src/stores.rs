//! Affiliate store registry
//!
//! Operator-managed catalog of affiliate URL templates, persisted through an
//! injected storage backend. When nothing is stored yet, a hardcoded default
//! list is synthesized.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{get_json, set_json, KeyValueStorage};

const STORAGE_KEY: &str = "affiliate_stores";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateStore {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub affiliate_url_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    pub name: String,
    pub display_name: String,
    pub affiliate_url_template: String,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUpdate {
    pub display_name: Option<String>,
    pub affiliate_url_template: Option<String>,
    pub api_endpoint: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store name already in use: {0}")]
    DuplicateName(String),
    #[error("store not found: {0}")]
    NotFound(String),
    #[error("storage backend rejected the write")]
    StorageFailure,
}

pub struct StoreRegistry {
    storage: Arc<dyn KeyValueStorage>,
}

impl StoreRegistry {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// All stores, defaulting to the hardcoded list when none are persisted.
    pub fn list(&self) -> Vec<AffiliateStore> {
        get_json(self.storage.as_ref(), STORAGE_KEY).unwrap_or_else(default_stores)
    }

    /// Only stores eligible for outbound link generation.
    pub fn active(&self) -> Vec<AffiliateStore> {
        self.list().into_iter().filter(|s| s.is_active).collect()
    }

    pub fn get_by_id(&self, id: &str) -> Option<AffiliateStore> {
        self.list().into_iter().find(|s| s.id == id)
    }

    /// Name lookup is case-insensitive.
    pub fn get_by_name(&self, name: &str) -> Option<AffiliateStore> {
        let lower = name.to_lowercase();
        self.list()
            .into_iter()
            .find(|s| s.name.to_lowercase() == lower)
    }

    pub fn add(&self, new: NewStore) -> Result<AffiliateStore, StoreError> {
        let mut stores = self.list();
        let lower = new.name.to_lowercase();
        if stores.iter().any(|s| s.name.to_lowercase() == lower) {
            return Err(StoreError::DuplicateName(new.name));
        }

        let store = AffiliateStore {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            display_name: new.display_name,
            affiliate_url_template: new.affiliate_url_template,
            api_endpoint: new.api_endpoint,
            is_active: new.is_active,
            created_at: Utc::now().to_rfc3339(),
            updated_at: None,
        };
        stores.push(store.clone());
        self.save(&stores)?;
        Ok(store)
    }

    pub fn update(&self, id: &str, patch: StoreUpdate) -> Result<AffiliateStore, StoreError> {
        let mut stores = self.list();
        let store = stores
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(display_name) = patch.display_name {
            store.display_name = display_name;
        }
        if let Some(template) = patch.affiliate_url_template {
            store.affiliate_url_template = template;
        }
        if let Some(endpoint) = patch.api_endpoint {
            store.api_endpoint = Some(endpoint);
        }
        if let Some(active) = patch.is_active {
            store.is_active = active;
        }
        store.updated_at = Some(Utc::now().to_rfc3339());

        let updated = store.clone();
        self.save(&stores)?;
        Ok(updated)
    }

    pub fn toggle(&self, id: &str) -> Result<AffiliateStore, StoreError> {
        let mut stores = self.list();
        let store = stores
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        store.is_active = !store.is_active;
        store.updated_at = Some(Utc::now().to_rfc3339());

        let updated = store.clone();
        self.save(&stores)?;
        Ok(updated)
    }

    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut stores = self.list();
        let before = stores.len();
        stores.retain(|s| s.id != id);
        if stores.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.save(&stores)
    }

    fn save(&self, stores: &[AffiliateStore]) -> Result<(), StoreError> {
        if set_json(self.storage.as_ref(), STORAGE_KEY, &stores) {
            Ok(())
        } else {
            Err(StoreError::StorageFailure)
        }
    }
}

fn default_stores() -> Vec<AffiliateStore> {
    let now = Utc::now().to_rfc3339();
    vec![
        AffiliateStore {
            id: "magazine_luiza".to_string(),
            name: "magazine_luiza".to_string(),
            display_name: "Magazine Luiza".to_string(),
            affiliate_url_template: "https://www.magazinevoce.com.br/elislecio".to_string(),
            api_endpoint: None,
            is_active: true,
            created_at: now.clone(),
            updated_at: None,
        },
        AffiliateStore {
            id: "amazon".to_string(),
            name: "amazon".to_string(),
            display_name: "Amazon".to_string(),
            affiliate_url_template: "https://amazon.com.br/dp/{productId}?tag=wishbox-20"
                .to_string(),
            api_endpoint: None,
            is_active: false,
            created_at: now.clone(),
            updated_at: None,
        },
        AffiliateStore {
            id: "mercado_livre".to_string(),
            name: "mercado_livre".to_string(),
            display_name: "Mercado Livre".to_string(),
            affiliate_url_template:
                "https://produto.mercadolivre.com.br/{productId}?matt_tool=wishbox".to_string(),
            api_endpoint: None,
            is_active: false,
            created_at: now,
            updated_at: None,
        },
    ]
}
