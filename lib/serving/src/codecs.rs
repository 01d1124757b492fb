// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # Content-type codecs
//!
//! A codec converts between protocol [`Tensor`]s and a [`DomainValue`], the representation a
//! model works with. Field codecs ([`InputCodec`]) convert one tensor at a time; request codecs
//! ([`RequestCodec`]) convert the whole set of inputs of a request at once (a dataframe).
//!
//! Codecs are looked up by their content-type tag in a [`CodecRegistry`]. Which tag applies to
//! a tensor is decided by the [`ResolverChain`].

use std::fmt::Debug;

use ndarray::ArrayD;

use crate::error::ServingResult;
use crate::protocols::tensor::Tensor;

pub mod array;
pub mod base64;
pub mod dataframe;
pub mod raw;
pub mod registry;
pub mod resolver;
pub mod string;

pub use array::{ArrayCodec, NdArray};
pub use base64::Base64Codec;
pub use dataframe::{Column, DataFrame, DataFrameCodec};
pub use raw::RawBytesCodec;
pub use registry::CodecRegistry;
pub use resolver::{ContentTypeResolver, ResolutionContext, ResolverChain, default_content_type};
pub use string::StringCodec;

/// Well-known content-type tags.
pub mod content_type {
    pub const ARRAY: &str = "array";
    pub const DATAFRAME: &str = "dataframe";
    pub const RAW: &str = "raw";
    pub const STRING: &str = "str";
    pub const BASE64: &str = "base64";

    /// MLServer name of the array codec
    pub const NUMPY: &str = "np";
    /// MLServer name of the dataframe codec
    pub const PANDAS: &str = "pd";
}

/// Decoded form of one or more tensors.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainValue {
    Array(NdArray),
    Bytes(ArrayD<Vec<u8>>),
    Strings(Vec<String>),
    DataFrame(DataFrame),
}

impl DomainValue {
    pub fn kind(&self) -> &'static str {
        match self {
            DomainValue::Array(_) => "array",
            DomainValue::Bytes(_) => "bytes",
            DomainValue::Strings(_) => "strings",
            DomainValue::DataFrame(_) => "dataframe",
        }
    }
}

impl From<NdArray> for DomainValue {
    fn from(array: NdArray) -> Self {
        DomainValue::Array(array)
    }
}

impl From<DataFrame> for DomainValue {
    fn from(frame: DataFrame) -> Self {
        DomainValue::DataFrame(frame)
    }
}

/// Converts a single tensor to and from a [`DomainValue`].
pub trait InputCodec: Send + Sync + Debug {
    /// Canonical tag of the codec, set on the tensors it produces when tagging is needed.
    fn content_type(&self) -> &'static str;

    fn can_encode(&self, value: &DomainValue) -> bool;

    fn encode(&self, name: &str, value: &DomainValue) -> ServingResult<Tensor>;

    fn decode(&self, tensor: &Tensor) -> ServingResult<DomainValue>;
}

/// Converts the full, ordered set of tensors of a request or response.
pub trait RequestCodec: Send + Sync + Debug {
    fn content_type(&self) -> &'static str;

    fn can_encode(&self, value: &DomainValue) -> bool;

    /// `fields` provides the field codecs the individual tensors are converted with.
    fn encode(&self, value: &DomainValue, fields: &CodecRegistry) -> ServingResult<Vec<Tensor>>;

    fn decode(&self, tensors: &[Tensor], fields: &CodecRegistry) -> ServingResult<DomainValue>;
}
