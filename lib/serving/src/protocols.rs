// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # Open Inference Protocol
//!
//! Wire types of the V2 inference protocol: tensors, inference requests and responses, and
//! model metadata. Transports parse into these types and serialize them back out; nothing in
//! this module knows about codecs or models.

pub mod metadata;
pub mod raw;
pub mod tensor;

pub use metadata::MetadataModelResponse;
pub use tensor::{
    DataType, FlattenTensor, InferenceRequest, InferenceResponse, ParameterValue, Parameters,
    ParametersExt, RequestOutput, Tensor, TensorMetadata,
};
