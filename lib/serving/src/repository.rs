// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tensorgate_runtime::ServingConfig;
use validator::Validate;

use crate::error::{ServingError, ServingResult};
use crate::protocols::metadata::MetadataModelResponse;
use crate::signature::{ForeignSignature, translate_signature};
use crate::translate::{ModelInputSpec, ModelOutputSpec};

/// Metadata of every loaded model, keyed by model name.
///
/// Written when a model is loaded or unloaded, read on every request. Note: Don't implement
/// Clone for this, put it in an Arc instead.
#[derive(Debug)]
pub struct ModelRepository {
    config: ServingConfig,
    models: DashMap<String, Arc<MetadataModelResponse>>,
}

impl Default for ModelRepository {
    fn default() -> Self {
        Self::new(ServingConfig::default())
    }
}

impl ModelRepository {
    pub fn new(config: ServingConfig) -> Self {
        Self {
            config,
            models: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ServingConfig {
        &self.config
    }

    /// Translates the signature of a model and caches the result.
    ///
    /// A failed translation is logged and leaves the repository untouched, so the models
    /// already loaded keep serving.
    pub fn load(
        &self,
        name: &str,
        version: Option<&str>,
        signature: &ForeignSignature,
    ) -> ServingResult<Arc<MetadataModelResponse>> {
        if self.models.contains_key(name) {
            return Err(ServingError::ModelAlreadyLoaded(name.to_string()));
        }

        let metadata = translate_signature(name, version, signature, &self.config)
            .inspect_err(|err| {
                tracing::error!(model = name, error = %err, "failed to load model metadata");
            })?;
        self.insert(metadata)
    }

    /// Caches metadata that was produced elsewhere, such as a model that ships its own.
    pub fn register_metadata(
        &self,
        metadata: MetadataModelResponse,
    ) -> ServingResult<Arc<MetadataModelResponse>> {
        if let Err(err) = metadata.validate() {
            tracing::error!(model = %metadata.name, error = %err, "invalid model metadata");
            return Err(ServingError::invalid(&metadata.name, err.to_string()));
        }
        self.insert(metadata)
    }

    fn insert(&self, metadata: MetadataModelResponse) -> ServingResult<Arc<MetadataModelResponse>> {
        match self.models.entry(metadata.name.clone()) {
            Entry::Occupied(_) => Err(ServingError::ModelAlreadyLoaded(metadata.name)),
            Entry::Vacant(slot) => {
                let metadata = Arc::new(metadata);
                slot.insert(metadata.clone());
                tracing::info!(
                    model = %metadata.name,
                    inputs = metadata.inputs.len(),
                    outputs = metadata.outputs.len(),
                    "model loaded"
                );
                Ok(metadata)
            }
        }
    }

    pub fn metadata(&self, name: &str) -> ServingResult<Arc<MetadataModelResponse>> {
        self.models
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServingError::ModelNotFound(name.to_string()))
    }

    pub fn unload(&self, name: &str) -> ServingResult<Arc<MetadataModelResponse>> {
        let (_, metadata) = self
            .models
            .remove(name)
            .ok_or_else(|| ServingError::ModelNotFound(name.to_string()))?;
        tracing::info!(model = name, "model unloaded");
        Ok(metadata)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Names of the loaded models, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn input_spec(&self, name: &str) -> ServingResult<ModelInputSpec> {
        let metadata = self.metadata(name)?;
        Ok(ModelInputSpec::from_metadata(&metadata, &self.config))
    }

    pub fn output_spec(&self, name: &str) -> ServingResult<ModelOutputSpec> {
        let metadata = self.metadata(name)?;
        Ok(ModelOutputSpec::from_metadata(&metadata))
    }
}
