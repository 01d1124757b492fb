// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # Request / response translation
//!
//! [`Translator::decode`] validates an [`InferenceRequest`] against the declared inputs of a
//! model and converts it into the [`DomainBatch`] the model consumes. [`Translator::encode`]
//! converts what the model returned back into an [`InferenceResponse`].

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tensorgate_runtime::ServingConfig;
use validator::Validate;

use crate::codecs::{CodecRegistry, DomainValue, ResolutionContext, ResolverChain};
use crate::error::{ServingError, ServingResult};
use crate::protocols::metadata::MetadataModelResponse;
use crate::protocols::tensor::{
    InferenceRequest, InferenceResponse, OPTIONAL_KEY, Parameters, ParametersExt,
    RequestOutput, Tensor, TensorMetadata,
};

/// Name given to a grouped model output that no request codec can encode, when the model
/// declares no outputs.
pub const DEFAULT_OUTPUT_NAME: &str = "output-0";

/// What the model consumes or produces.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainBatch {
    /// Decoded by a request codec as a whole.
    Grouped(DomainValue),
    /// Decoded field by field, in request order.
    Fields(IndexMap<String, DomainValue>),
}

impl DomainBatch {
    pub fn field(&self, name: &str) -> Option<&DomainValue> {
        match self {
            DomainBatch::Fields(fields) => fields.get(name),
            DomainBatch::Grouped(_) => None,
        }
    }

    pub fn grouped(&self) -> Option<&DomainValue> {
        match self {
            DomainBatch::Grouped(value) => Some(value),
            DomainBatch::Fields(_) => None,
        }
    }
}

impl FromIterator<(String, DomainValue)> for DomainBatch {
    fn from_iter<I: IntoIterator<Item = (String, DomainValue)>>(iter: I) -> Self {
        DomainBatch::Fields(iter.into_iter().collect())
    }
}

/// Declared inputs of a model, and the policy requests are checked with.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInputSpec {
    pub model_name: String,
    pub inputs: Vec<TensorMetadata>,
    /// Request-level content type declared by the model.
    pub content_type: Option<String>,
    pub allow_extra_fields: bool,
    pub max_batch_elements: usize,
}

impl ModelInputSpec {
    pub fn from_metadata(metadata: &MetadataModelResponse, config: &ServingConfig) -> Self {
        Self {
            model_name: metadata.name.clone(),
            inputs: metadata.inputs.clone(),
            content_type: metadata.content_type().map(str::to_string),
            allow_extra_fields: config.allow_extra_fields,
            max_batch_elements: config.max_batch_elements,
        }
    }

    pub fn input(&self, name: &str) -> Option<&TensorMetadata> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

/// Declared outputs of a model, and how responses are labelled.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutputSpec {
    pub model_name: String,
    pub model_version: Option<String>,
    pub outputs: Vec<TensorMetadata>,
    pub content_type: Option<String>,
}

impl ModelOutputSpec {
    pub fn from_metadata(metadata: &MetadataModelResponse) -> Self {
        Self {
            model_name: metadata.name.clone(),
            model_version: metadata.versions.first().cloned(),
            outputs: metadata.outputs.clone(),
            content_type: metadata.content_type().map(str::to_string),
        }
    }

    pub fn output(&self, name: &str) -> Option<&TensorMetadata> {
        self.outputs.iter().find(|output| output.name == name)
    }
}

/// Converts requests to model inputs and model outputs to responses.
///
/// Holds no per-request state: one translator serves any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct Translator {
    registry: Arc<CodecRegistry>,
    resolvers: Arc<ResolverChain>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(Arc::new(CodecRegistry::with_defaults()))
    }
}

impl Translator {
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self::with_resolvers(registry, ResolverChain::default())
    }

    pub fn with_resolvers(registry: Arc<CodecRegistry>, resolvers: ResolverChain) -> Self {
        Self {
            registry,
            resolvers: Arc::new(resolvers),
        }
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    pub fn decode(
        &self,
        request: &InferenceRequest,
        spec: &ModelInputSpec,
    ) -> ServingResult<DomainBatch> {
        self.check_names(request, spec)?;
        for tensor in &request.inputs {
            check_tensor(tensor, spec)?;
        }

        let request_tag = request
            .parameters
            .content_type()
            .or(spec.content_type.as_deref());

        if let Some(tag) = request_tag {
            if let Some(codec) = self.registry.request(tag) {
                tracing::debug!(
                    model = %spec.model_name,
                    content_type = tag,
                    inputs = request.inputs.len(),
                    "decoding request as a group"
                );
                let tensors = inherit_declared_content_types(&request.inputs, spec);
                return codec
                    .decode(&tensors, &self.registry)
                    .map(DomainBatch::Grouped);
            }
            if !self.registry.has_input(tag) {
                return Err(ServingError::unsupported(tag, None));
            }
        }

        let mut fields = IndexMap::with_capacity(request.inputs.len());
        for tensor in &request.inputs {
            let ctx = ResolutionContext {
                tensor,
                request_parameters: &request.parameters,
                declared: spec.input(tensor.name()),
                registry: &self.registry,
            };
            let tag = self
                .resolvers
                .resolve(&ctx)
                .ok_or_else(|| ServingError::unsupported("", Some(tensor.name())))?;
            let codec = self.registry.require_input(tag, tensor.name())?;
            fields.insert(tensor.name().to_string(), codec.decode(tensor)?);
        }
        Ok(DomainBatch::Fields(fields))
    }

    pub fn encode(
        &self,
        batch: DomainBatch,
        spec: &ModelOutputSpec,
        request_id: &str,
    ) -> ServingResult<InferenceResponse> {
        let mut parameters = Parameters::new();
        let outputs = match batch {
            DomainBatch::Grouped(value) => {
                let codec = spec
                    .content_type
                    .as_deref()
                    .and_then(|tag| self.registry.request(tag))
                    .filter(|codec| codec.can_encode(&value))
                    .or_else(|| self.registry.find_request_encoder(&value));

                match codec {
                    Some(codec) => {
                        parameters.set_content_type(codec.content_type());
                        codec.encode(&value, &self.registry)?
                    }
                    None => {
                        let name = spec
                            .outputs
                            .first()
                            .map(|output| output.name.as_str())
                            .unwrap_or(DEFAULT_OUTPUT_NAME);
                        vec![self.encode_field(name, &value, spec)?]
                    }
                }
            }
            DomainBatch::Fields(fields) => fields
                .iter()
                .map(|(name, value)| self.encode_field(name, value, spec))
                .collect::<ServingResult<Vec<_>>>()?,
        };

        Ok(InferenceResponse {
            model_name: spec.model_name.clone(),
            model_version: spec.model_version.clone(),
            id: request_id.to_string(),
            parameters,
            outputs,
        })
    }

    /// Keeps only the outputs a request asked for, in the order it asked for them.
    pub fn select_outputs(
        &self,
        mut response: InferenceResponse,
        requested: Option<&[RequestOutput]>,
    ) -> ServingResult<InferenceResponse> {
        let Some(requested) = requested else {
            return Ok(response);
        };

        let mut produced: IndexMap<String, Tensor> = response
            .outputs
            .drain(..)
            .map(|tensor| (tensor.name().to_string(), tensor))
            .collect();
        response.outputs = requested
            .iter()
            .map(|output| {
                produced
                    .shift_remove(&output.name)
                    .ok_or_else(|| ServingError::UnknownField {
                        field: output.name.clone(),
                    })
            })
            .collect::<ServingResult<Vec<_>>>()?;
        Ok(response)
    }

    fn encode_field(
        &self,
        name: &str,
        value: &DomainValue,
        spec: &ModelOutputSpec,
    ) -> ServingResult<Tensor> {
        let declared_tag = spec
            .output(name)
            .and_then(|output| output.parameters.content_type());

        let codec = declared_tag
            .and_then(|tag| self.registry.input(tag))
            .filter(|codec| codec.can_encode(value))
            .or_else(|| self.registry.find_input_encoder(value))
            .ok_or_else(|| ServingError::IncompatibleValue {
                content_type: declared_tag.unwrap_or("none").to_string(),
                value_kind: value.kind().to_string(),
            })?;
        codec.encode(name, value)
    }

    fn check_names(&self, request: &InferenceRequest, spec: &ModelInputSpec) -> ServingResult<()> {
        let mut seen = HashSet::with_capacity(request.inputs.len());
        for tensor in &request.inputs {
            if !seen.insert(tensor.name()) {
                return Err(ServingError::DuplicateField {
                    field: tensor.name().to_string(),
                });
            }
        }

        // a model that declares no inputs takes anything
        if spec.inputs.is_empty() {
            return Ok(());
        }

        if !spec.allow_extra_fields
            && let Some(extra) = request
                .inputs
                .iter()
                .find(|tensor| spec.input(tensor.name()).is_none())
        {
            return Err(ServingError::UnknownField {
                field: extra.name().to_string(),
            });
        }

        if let Some(missing) = spec
            .inputs
            .iter()
            .find(|input| !input.parameters.flag(OPTIONAL_KEY) && !seen.contains(input.name.as_str()))
        {
            return Err(ServingError::MissingField {
                field: missing.name.clone(),
            });
        }
        Ok(())
    }
}

fn check_tensor(tensor: &Tensor, spec: &ModelInputSpec) -> ServingResult<()> {
    if let Some(declared) = spec.input(tensor.name()) {
        if declared.data_type != tensor.data_type() {
            return Err(ServingError::DatatypeMismatch {
                field: tensor.name().to_string(),
                expected: declared.data_type.to_string(),
                actual: tensor.data_type().to_string(),
            });
        }
        if !shape_matches(&declared.shape, tensor.shape()) {
            return Err(ServingError::ShapeMismatch {
                field: tensor.name().to_string(),
                expected: declared.shape.clone(),
                actual: tensor.shape().to_vec(),
            });
        }
    }

    tensor
        .validate()
        .map_err(|e| ServingError::invalid(tensor.name(), e.to_string()))?;

    if tensor.data.len() > spec.max_batch_elements {
        return Err(ServingError::invalid(
            tensor.name(),
            format!(
                "{} elements exceed the limit of {}",
                tensor.data.len(),
                spec.max_batch_elements
            ),
        ));
    }
    Ok(())
}

/// Same rank, and every declared dimension is either `-1` or equal.
pub fn shape_matches(declared: &[i64], actual: &[i64]) -> bool {
    declared.len() == actual.len()
        && declared
            .iter()
            .zip(actual)
            .all(|(&d, &a)| d == -1 || d == a)
}

/// Gives untagged tensors the content type declared for them, so that request codecs see
/// the same tags the field path would resolve. Borrows when nothing needs tagging.
fn inherit_declared_content_types<'a>(
    inputs: &'a [Tensor],
    spec: &ModelInputSpec,
) -> Cow<'a, [Tensor]> {
    let declared_tag = |tensor: &Tensor| {
        if tensor.parameters().content_type().is_some() {
            return None;
        }
        spec.input(tensor.name())
            .and_then(|declared| declared.parameters.content_type())
            .map(str::to_string)
    };

    if inputs.iter().all(|tensor| declared_tag(tensor).is_none()) {
        return Cow::Borrowed(inputs);
    }

    Cow::Owned(
        inputs
            .iter()
            .map(|tensor| match declared_tag(tensor) {
                Some(tag) => tensor.clone().with_content_type(&tag),
                None => tensor.clone(),
            })
            .collect(),
    )
}
