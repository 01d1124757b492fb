// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use indexmap::IndexMap;

use super::{
    ArrayCodec, Base64Codec, DataFrameCodec, DomainValue, InputCodec, RawBytesCodec,
    RequestCodec, StringCodec, content_type,
};
use crate::error::{ServingError, ServingResult};

/// Content-type tag to codec lookup.
///
/// Built once at startup and shared behind an `Arc`; lookups never mutate it. Registration
/// order matters: when an output carries no usable tag, the first field codec that can encode
/// the value wins.
#[derive(Debug, Default, Clone)]
pub struct CodecRegistry {
    inputs: IndexMap<String, Arc<dyn InputCodec>>,
    requests: IndexMap<String, Arc<dyn RequestCodec>>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in codecs, including the `np` and `pd` aliases.
    pub fn with_defaults() -> Self {
        let array: Arc<dyn InputCodec> = Arc::new(ArrayCodec);
        let dataframe: Arc<dyn RequestCodec> = Arc::new(DataFrameCodec);

        let mut registry = Self::new();
        registry
            .register_input(content_type::ARRAY, array.clone())
            .register_input(content_type::STRING, Arc::new(StringCodec))
            .register_input(content_type::RAW, Arc::new(RawBytesCodec))
            .register_input(content_type::BASE64, Arc::new(Base64Codec))
            .register_input(content_type::NUMPY, array)
            .register_request(content_type::DATAFRAME, dataframe.clone())
            .register_request(content_type::PANDAS, dataframe);
        registry
    }

    /// Registers a field codec under `tag`, replacing any previous codec with that tag.
    pub fn register_input(
        &mut self,
        tag: impl Into<String>,
        codec: Arc<dyn InputCodec>,
    ) -> &mut Self {
        let tag = tag.into();
        tracing::debug!(%tag, codec = codec.content_type(), "registering field codec");
        self.inputs.insert(tag, codec);
        self
    }

    /// Registers a request codec under `tag`, replacing any previous codec with that tag.
    pub fn register_request(
        &mut self,
        tag: impl Into<String>,
        codec: Arc<dyn RequestCodec>,
    ) -> &mut Self {
        let tag = tag.into();
        tracing::debug!(%tag, codec = codec.content_type(), "registering request codec");
        self.requests.insert(tag, codec);
        self
    }

    pub fn input(&self, tag: &str) -> Option<Arc<dyn InputCodec>> {
        self.inputs.get(tag).cloned()
    }

    pub fn request(&self, tag: &str) -> Option<Arc<dyn RequestCodec>> {
        self.requests.get(tag).cloned()
    }

    pub fn has_input(&self, tag: &str) -> bool {
        self.inputs.contains_key(tag)
    }

    pub fn has_request(&self, tag: &str) -> bool {
        self.requests.contains_key(tag)
    }

    /// Field codec for `tag`, or `UnsupportedContentType` naming the field being converted.
    pub fn require_input(&self, tag: &str, field: &str) -> ServingResult<Arc<dyn InputCodec>> {
        self.input(tag)
            .ok_or_else(|| ServingError::unsupported(tag, Some(field)))
    }

    /// First registered field codec able to encode `value`.
    pub fn find_input_encoder(&self, value: &DomainValue) -> Option<Arc<dyn InputCodec>> {
        self.inputs
            .values()
            .find(|codec| codec.can_encode(value))
            .cloned()
    }

    /// First registered request codec able to encode `value`.
    pub fn find_request_encoder(&self, value: &DomainValue) -> Option<Arc<dyn RequestCodec>> {
        self.requests
            .values()
            .find(|codec| codec.can_encode(value))
            .cloned()
    }

    pub fn input_tags(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    pub fn request_tags(&self) -> impl Iterator<Item = &str> {
        self.requests.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::NdArray;
    use ndarray::ArrayD;
    use rstest::rstest;

    #[rstest]
    #[case("array", "array")]
    #[case("np", "array")]
    #[case("str", "str")]
    #[case("raw", "raw")]
    #[case("base64", "base64")]
    fn test_default_input_codecs(#[case] tag: &str, #[case] canonical: &str) {
        let registry = CodecRegistry::with_defaults();
        assert_eq!(registry.input(tag).unwrap().content_type(), canonical);
        assert!(!registry.has_request(tag));
    }

    #[rstest]
    #[case("dataframe")]
    #[case("pd")]
    fn test_default_request_codecs(#[case] tag: &str) {
        let registry = CodecRegistry::with_defaults();
        assert_eq!(registry.request(tag).unwrap().content_type(), "dataframe");
        assert!(!registry.has_input(tag));
    }

    #[test]
    fn test_unknown_tag() {
        let registry = CodecRegistry::with_defaults();
        assert!(registry.input("parquet").is_none());
        let err = registry.require_input("parquet", "x").unwrap_err();
        assert!(matches!(
            err,
            ServingError::UnsupportedContentType { content_type, field: Some(field) }
                if content_type == "parquet" && field == "x"
        ));
    }

    #[test]
    fn test_fallback_order() {
        let registry = CodecRegistry::with_defaults();

        let array = DomainValue::Array(NdArray::Int32(ArrayD::zeros(vec![2])));
        assert_eq!(
            registry.find_input_encoder(&array).unwrap().content_type(),
            "array"
        );

        let strings = DomainValue::Strings(vec!["a".to_string()]);
        assert_eq!(
            registry.find_input_encoder(&strings).unwrap().content_type(),
            "str"
        );

        // raw is registered before base64
        let bytes = DomainValue::Bytes(ArrayD::from_elem(vec![1], b"x".to_vec()));
        assert_eq!(
            registry.find_input_encoder(&bytes).unwrap().content_type(),
            "raw"
        );
    }

    #[test]
    fn test_custom_registration_replaces() {
        let mut registry = CodecRegistry::new();
        registry.register_input("custom", Arc::new(StringCodec));
        assert_eq!(registry.input("custom").unwrap().content_type(), "str");
        registry.register_input("custom", Arc::new(ArrayCodec));
        assert_eq!(registry.input("custom").unwrap().content_type(), "array");
        assert_eq!(registry.input_tags().collect::<Vec<_>>(), vec!["custom"]);
    }
}
