// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Content-type resolution.
//!
//! Which codec converts a tensor is decided by asking a list of resolvers in order; the first
//! one that answers wins:
//!
//! 1. the tensor's own `content_type` parameter,
//! 2. the request's `content_type` parameter, when it names a field codec,
//! 3. the content type declared for the input in the model metadata,
//! 4. the datatype default: `raw` for BYTES, `array` for everything else.

use std::fmt::Debug;

use super::{CodecRegistry, content_type};
use crate::protocols::tensor::{DataType, Parameters, ParametersExt, Tensor, TensorMetadata};

/// Everything a resolver may look at for one tensor.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub tensor: &'a Tensor,
    pub request_parameters: &'a Parameters,
    pub declared: Option<&'a TensorMetadata>,
    pub registry: &'a CodecRegistry,
}

pub trait ContentTypeResolver: Send + Sync + Debug {
    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Option<&'a str>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FieldParameterResolver;

impl ContentTypeResolver for FieldParameterResolver {
    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Option<&'a str> {
        ctx.tensor.parameters().content_type()
    }
}

/// Request-level tag, only when it names a field codec. Request codec tags such as
/// `dataframe` describe the whole request and are not inherited by its fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestParameterResolver;

impl ContentTypeResolver for RequestParameterResolver {
    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Option<&'a str> {
        ctx.request_parameters
            .content_type()
            .filter(|tag| ctx.registry.has_input(tag))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredFieldResolver;

impl ContentTypeResolver for DeclaredFieldResolver {
    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Option<&'a str> {
        ctx.declared.and_then(|declared| declared.parameters.content_type())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DatatypeDefaultResolver;

impl ContentTypeResolver for DatatypeDefaultResolver {
    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Option<&'a str> {
        Some(default_content_type(ctx.tensor.data_type()))
    }
}

/// Tag of the codec that converts an untagged tensor of `data_type`.
pub fn default_content_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Bytes => content_type::RAW,
        _ => content_type::ARRAY,
    }
}

#[derive(Debug)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ContentTypeResolver>>,
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self {
            resolvers: vec![
                Box::new(FieldParameterResolver),
                Box::new(RequestParameterResolver),
                Box::new(DeclaredFieldResolver),
                Box::new(DatatypeDefaultResolver),
            ],
        }
    }
}

impl ResolverChain {
    pub fn empty() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Appends a resolver, consulted after the existing ones.
    pub fn push(&mut self, resolver: Box<dyn ContentTypeResolver>) -> &mut Self {
        self.resolvers.push(resolver);
        self
    }

    /// Inserts a resolver ahead of all existing ones.
    pub fn push_front(&mut self, resolver: Box<dyn ContentTypeResolver>) -> &mut Self {
        self.resolvers.insert(0, resolver);
        self
    }

    pub fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Option<&'a str> {
        let resolved = self.resolvers.iter().find_map(|r| r.resolve(ctx));
        tracing::trace!(
            field = ctx.tensor.name(),
            content_type = resolved,
            "resolved content type"
        );
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::tensor::FlattenTensor;
    use rstest::rstest;

    fn params(tag: Option<&str>) -> Parameters {
        let mut parameters = Parameters::new();
        if let Some(tag) = tag {
            parameters.set_content_type(tag);
        }
        parameters
    }

    #[rstest]
    // field tag always wins
    #[case(Some("str"), Some("base64"), Some("raw"), false, "str")]
    // request tag naming a field codec
    #[case(None, Some("base64"), Some("str"), false, "base64")]
    // request tag naming a request codec is skipped
    #[case(None, Some("dataframe"), Some("str"), false, "str")]
    // unknown request tag is skipped
    #[case(None, Some("parquet"), None, true, "raw")]
    // declared tag before datatype default
    #[case(None, None, Some("str"), true, "str")]
    #[case(None, None, None, true, "raw")]
    #[case(None, None, None, false, "array")]
    fn test_resolution_order(
        #[case] field: Option<&str>,
        #[case] request: Option<&str>,
        #[case] declared: Option<&str>,
        #[case] bytes: bool,
        #[case] expected: &str,
    ) {
        let registry = CodecRegistry::with_defaults();
        let data = if bytes {
            FlattenTensor::Bytes(vec![b"a".to_vec()])
        } else {
            FlattenTensor::Int64(vec![1])
        };
        let mut tensor = Tensor::new("x", vec![1], data);
        tensor.metadata.parameters = params(field);
        let request_parameters = params(request);
        let declared_meta = declared
            .map(|tag| TensorMetadata::new("x", tensor.data_type(), vec![-1]).with_content_type(tag));

        let ctx = ResolutionContext {
            tensor: &tensor,
            request_parameters: &request_parameters,
            declared: declared_meta.as_ref(),
            registry: &registry,
        };
        assert_eq!(ResolverChain::default().resolve(&ctx), Some(expected));
    }

    #[derive(Debug)]
    struct Fixed(&'static str);

    impl ContentTypeResolver for Fixed {
        fn resolve<'a>(&self, _ctx: &ResolutionContext<'a>) -> Option<&'a str> {
            Some(self.0)
        }
    }

    #[test]
    fn test_chain_extension() {
        let registry = CodecRegistry::with_defaults();
        let tensor = Tensor::new("x", vec![1], FlattenTensor::Int64(vec![1]))
            .with_content_type("str");
        let request_parameters = Parameters::new();
        let ctx = ResolutionContext {
            tensor: &tensor,
            request_parameters: &request_parameters,
            declared: None,
            registry: &registry,
        };

        let mut chain = ResolverChain::empty();
        assert_eq!(chain.resolve(&ctx), None);
        chain.push(Box::new(Fixed("raw")));
        assert_eq!(chain.resolve(&ctx), Some("raw"));

        let mut chain = ResolverChain::default();
        chain.push_front(Box::new(Fixed("base64")));
        assert_eq!(chain.resolve(&ctx), Some("base64"));
    }
}
