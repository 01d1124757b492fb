// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # Tensorgate serving
//!
//! The data plane between the inference protocol and a loaded model:
//!
//! - [`protocols`]: V2 inference protocol wire types.
//! - [`codecs`]: content-type codecs converting tensors to arrays, strings, bytes and dataframes.
//! - [`translate`]: request decoding and response encoding against a model's declared inputs
//!   and outputs.
//! - [`signature`]: foreign (MLflow) signatures to protocol metadata.
//! - [`repository`]: per-model metadata cache.
//! - [`legacy`]: row-oriented `{columns, data}` requests.
//! - [`pipeline`]: decode, predict, encode for one request.

pub mod codecs;
pub mod error;
pub mod legacy;
pub mod pipeline;
pub mod protocols;
pub mod repository;
pub mod signature;
pub mod translate;

pub use codecs::{CodecRegistry, DomainValue, InputCodec, RequestCodec};
pub use error::{ServingError, ServingErrorKind, ServingResult};
pub use legacy::{LegacyRequest, LegacyResponse};
pub use pipeline::{InferenceModel, InferencePipeline};
pub use protocols::{InferenceRequest, InferenceResponse, MetadataModelResponse, Tensor};
pub use repository::ModelRepository;
pub use signature::{ForeignSignature, Grouping, SignatureField, translate_signature};
pub use translate::{DomainBatch, ModelInputSpec, ModelOutputSpec, Translator};

pub use tensorgate_runtime::ServingConfig;
