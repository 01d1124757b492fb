// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # Inference pipeline
//!
//! Runs one request end to end: decode against the cached metadata of the model, call the
//! model, encode what it returned. The pipeline itself never blocks and keeps no per-request
//! state, so any number of requests may run through it at once.

use std::sync::Arc;

use dashmap::DashMap;
use tensorgate_runtime::ServingConfig;

use crate::codecs::CodecRegistry;
use crate::error::{ServingError, ServingResult};
use crate::legacy::{LegacyRequest, LegacyResponse};
use crate::protocols::metadata::MetadataModelResponse;
use crate::protocols::tensor::{InferenceRequest, InferenceResponse};
use crate::repository::ModelRepository;
use crate::signature::ForeignSignature;
use crate::translate::{DomainBatch, Translator};

/// A loaded model, as seen by the serving layer.
pub trait InferenceModel: Send + Sync {
    fn predict(&self, inputs: DomainBatch) -> anyhow::Result<DomainBatch>;
}

impl<F> InferenceModel for F
where
    F: Fn(DomainBatch) -> anyhow::Result<DomainBatch> + Send + Sync,
{
    fn predict(&self, inputs: DomainBatch) -> anyhow::Result<DomainBatch> {
        self(inputs)
    }
}

pub struct InferencePipeline {
    translator: Translator,
    repository: Arc<ModelRepository>,
    models: DashMap<String, Arc<dyn InferenceModel>>,
}

impl InferencePipeline {
    pub fn new(registry: Arc<CodecRegistry>, repository: Arc<ModelRepository>) -> Self {
        Self {
            translator: Translator::new(registry),
            repository,
            models: DashMap::new(),
        }
    }

    /// Default codecs and an empty repository using `config`.
    pub fn from_config(config: ServingConfig) -> Self {
        Self::new(
            Arc::new(CodecRegistry::with_defaults()),
            Arc::new(ModelRepository::new(config)),
        )
    }

    pub fn repository(&self) -> &Arc<ModelRepository> {
        &self.repository
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Loads the metadata of a model from its signature and makes it servable.
    pub fn register_model(
        &self,
        name: &str,
        version: Option<&str>,
        signature: &ForeignSignature,
        model: Arc<dyn InferenceModel>,
    ) -> ServingResult<Arc<MetadataModelResponse>> {
        let metadata = self.repository.load(name, version, signature)?;
        self.models.insert(name.to_string(), model);
        Ok(metadata)
    }

    pub fn unregister_model(&self, name: &str) -> ServingResult<()> {
        self.models.remove(name);
        self.repository.unload(name).map(|_| ())
    }

    pub fn metadata(&self, model_name: &str) -> ServingResult<Arc<MetadataModelResponse>> {
        self.repository.metadata(model_name)
    }

    pub fn infer(
        &self,
        model_name: &str,
        request: InferenceRequest,
    ) -> ServingResult<InferenceResponse> {
        let request_id = get_or_create_request_id(request.id.as_deref());
        let span = tracing::info_span!("infer", model = model_name, request_id = %request_id);
        let _enter = span.enter();

        let model = self
            .models
            .get(model_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServingError::ModelNotFound(model_name.to_string()))?;
        let input_spec = self.repository.input_spec(model_name)?;
        let output_spec = self.repository.output_spec(model_name)?;

        let inputs = self
            .translator
            .decode(&request, &input_spec)
            .inspect_err(|err| tracing::debug!(error = %err, kind = %err.kind(), "decode failed"))?;
        let outputs = model.predict(inputs).map_err(|err| {
            tracing::warn!(error = %err, "model failed");
            ServingError::Model(err)
        })?;

        let response = self.translator.encode(outputs, &output_spec, &request_id)?;
        let response = self
            .translator
            .select_outputs(response, request.outputs.as_deref())?;
        tracing::debug!(outputs = response.outputs.len(), "inference complete");
        Ok(response)
    }

    /// Same as [`InferencePipeline::infer`] for a row-oriented request.
    pub fn infer_legacy(
        &self,
        model_name: &str,
        request: LegacyRequest,
    ) -> ServingResult<LegacyResponse> {
        let spec = self.repository.input_spec(model_name)?;
        let request = request.into_inference_request_for(&spec)?;
        let response = self.infer(model_name, request)?;
        Ok(LegacyResponse::from_response(&response))
    }
}

/// Request id of the request when it has one, a fresh UUID otherwise.
fn get_or_create_request_id(primary: Option<&str>) -> String {
    match primary {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}
