use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::{
    error::ServiceError,
    model::{ModelLoader, ModelMetadata, ModelSpec, TextGenerator},
};

/// Snapshot of the loaded model. In-flight requests keep their `Arc` across swaps.
pub struct ActiveModel {
    version: u64,
    key: String,
    generator: Arc<dyn TextGenerator>,
}

impl ActiveModel {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }
}

#[derive(Debug, Serialize)]
pub struct RegistrySnapshot {
    pub models: Vec<ModelSpec>,
    pub active_key: String,
    pub active_version: u64,
    pub active: ModelMetadata,
}

pub struct ModelRegistry {
    catalog: Vec<ModelSpec>,
    loader: Arc<dyn ModelLoader>,
    active: RwLock<Arc<ActiveModel>>,
    swap: Mutex<()>,
}

impl ModelRegistry {
    /// Loads `initial_key` eagerly; the registry never exists without an active model.
    pub fn initialize(
        catalog: Vec<ModelSpec>,
        initial_key: &str,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<Self, ServiceError> {
        let spec = find_spec(&catalog, initial_key)?;
        let generator = loader.load(spec)?;
        tracing::info!(key = %spec.key, model_id = %spec.model_id, "model loaded");

        let active = ActiveModel {
            version: 1,
            key: spec.key.clone(),
            generator,
        };

        Ok(Self {
            catalog,
            loader,
            active: RwLock::new(Arc::new(active)),
            swap: Mutex::new(()),
        })
    }

    pub fn catalog(&self) -> &[ModelSpec] {
        &self.catalog
    }

    pub fn default_key(&self) -> &str {
        self.catalog.first().map(|spec| spec.key.as_str()).unwrap_or("")
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.catalog.iter().any(|spec| spec.key == key)
    }

    pub fn current(&self) -> Arc<ActiveModel> {
        self.active.read().clone()
    }

    /// Makes `key` the active model, loading it if it is not already active.
    ///
    /// Loading happens without holding the write lock, so readers are only
    /// blocked for the pointer swap. Concurrent selections are serialized.
    pub fn select(&self, key: &str) -> Result<Arc<ActiveModel>, ServiceError> {
        let spec = find_spec(&self.catalog, key)?;

        let _swap = self.swap.lock();
        let current = self.current();
        if current.key == key {
            return Ok(current);
        }

        let generator = self.loader.load(spec)?;
        let next = Arc::new(ActiveModel {
            version: current.version + 1,
            key: spec.key.clone(),
            generator,
        });
        *self.active.write() = next.clone();

        tracing::info!(key = %spec.key, version = next.version, "active model swapped");
        Ok(next)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let active = self.current();
        RegistrySnapshot {
            models: self.catalog.clone(),
            active_key: active.key.clone(),
            active_version: active.version,
            active: active.generator.metadata(),
        }
    }
}

fn find_spec<'a>(catalog: &'a [ModelSpec], key: &str) -> Result<&'a ModelSpec, ServiceError> {
    catalog
        .iter()
        .find(|spec| spec.key == key)
        .ok_or_else(|| ServiceError::UnknownModel(key.to_string()))
}
