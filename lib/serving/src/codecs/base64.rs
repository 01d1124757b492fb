// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use ::base64::Engine;
use ::base64::engine::general_purpose::STANDARD;
use ndarray::ArrayD;

use super::array::{dims_of, wire_shape};
use super::{DomainValue, InputCodec, content_type};
use crate::error::{ServingError, ServingResult};
use crate::protocols::tensor::{DataType, FlattenTensor, Tensor};

/// `base64` codec: BYTES elements holding base64 text, decoded to the binary they encode.
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64Codec;

impl InputCodec for Base64Codec {
    fn content_type(&self) -> &'static str {
        content_type::BASE64
    }

    fn can_encode(&self, value: &DomainValue) -> bool {
        matches!(value, DomainValue::Bytes(_))
    }

    fn encode(&self, name: &str, value: &DomainValue) -> ServingResult<Tensor> {
        let DomainValue::Bytes(elements) = value else {
            return Err(ServingError::IncompatibleValue {
                content_type: self.content_type().to_string(),
                value_kind: value.kind().to_string(),
            });
        };
        let encoded = elements
            .iter()
            .map(|element| STANDARD.encode(element).into_bytes())
            .collect();
        Ok(Tensor::new(name, wire_shape(elements.shape()), FlattenTensor::Bytes(encoded))
            .with_content_type(self.content_type()))
    }

    fn decode(&self, tensor: &Tensor) -> ServingResult<DomainValue> {
        let FlattenTensor::Bytes(elements) = &tensor.data else {
            return Err(ServingError::DatatypeMismatch {
                field: tensor.name().to_string(),
                expected: DataType::Bytes.to_string(),
                actual: tensor.data_type().to_string(),
            });
        };
        let decoded = elements
            .iter()
            .enumerate()
            .map(|(idx, element)| {
                STANDARD.decode(element).map_err(|e| {
                    ServingError::invalid(tensor.name(), format!("element {idx} is not base64: {e}"))
                })
            })
            .collect::<ServingResult<Vec<_>>>()?;

        let dims = dims_of(tensor)?;
        ArrayD::from_shape_vec(dims, decoded)
            .map(DomainValue::Bytes)
            .map_err(|e| ServingError::invalid(tensor.name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::tensor::ParametersExt;
    use assert_matches::assert_matches;

    #[test]
    fn test_base64_decode() {
        let tensor = Tensor::new(
            "img",
            vec![2],
            FlattenTensor::Bytes(vec![b"aGVsbG8=".to_vec(), b"".to_vec()]),
        );
        let value = Base64Codec.decode(&tensor).unwrap();
        let DomainValue::Bytes(elements) = &value else {
            panic!("expected bytes");
        };
        assert_eq!(elements.as_slice().unwrap(), &[b"hello".to_vec(), vec![]]);

        let encoded = Base64Codec.encode("img", &value).unwrap();
        assert_eq!(encoded.parameters().content_type(), Some("base64"));
        assert_eq!(encoded.data, tensor.data);
    }

    #[test]
    fn test_base64_rejects_garbage() {
        let tensor = Tensor::new("img", vec![1], FlattenTensor::Bytes(vec![b"@@@".to_vec()]));
        assert_matches!(
            Base64Codec.decode(&tensor),
            Err(ServingError::InvalidPayload { reason, .. }) if reason.starts_with("element 0")
        );
    }
}
