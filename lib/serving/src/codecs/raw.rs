// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use ndarray::ArrayD;

use super::array::{dims_of, wire_shape};
use super::{DomainValue, InputCodec, content_type};
use crate::error::{ServingError, ServingResult};
use crate::protocols::tensor::{DataType, FlattenTensor, Tensor};

/// `raw` codec: BYTES elements passed through untouched, keeping their shape.
///
/// This is the default for BYTES tensors that carry no content type.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawBytesCodec;

impl InputCodec for RawBytesCodec {
    fn content_type(&self) -> &'static str {
        content_type::RAW
    }

    fn can_encode(&self, value: &DomainValue) -> bool {
        matches!(value, DomainValue::Bytes(_))
    }

    fn encode(&self, name: &str, value: &DomainValue) -> ServingResult<Tensor> {
        match value {
            DomainValue::Bytes(elements) => Ok(Tensor::new(
                name,
                wire_shape(elements.shape()),
                FlattenTensor::Bytes(elements.iter().cloned().collect()),
            )),
            other => Err(ServingError::IncompatibleValue {
                content_type: self.content_type().to_string(),
                value_kind: other.kind().to_string(),
            }),
        }
    }

    fn decode(&self, tensor: &Tensor) -> ServingResult<DomainValue> {
        let FlattenTensor::Bytes(elements) = &tensor.data else {
            return Err(ServingError::DatatypeMismatch {
                field: tensor.name().to_string(),
                expected: DataType::Bytes.to_string(),
                actual: tensor.data_type().to_string(),
            });
        };
        let dims = dims_of(tensor)?;
        ArrayD::from_shape_vec(dims, elements.clone())
            .map(DomainValue::Bytes)
            .map_err(|e| ServingError::invalid(tensor.name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_raw_passthrough() {
        let tensor = Tensor::new(
            "blob",
            vec![3],
            FlattenTensor::Bytes(vec![vec![0, 159, 146, 150], vec![], b"ok".to_vec()]),
        );
        let value = RawBytesCodec.decode(&tensor).unwrap();
        assert_matches!(&value, DomainValue::Bytes(a) if a.len() == 3);
        assert_eq!(RawBytesCodec.encode("blob", &value).unwrap(), tensor);
    }

    #[test]
    fn test_raw_rejects_numeric() {
        let tensor = Tensor::new("x", vec![1], FlattenTensor::Fp32(vec![1.0]));
        assert_matches!(
            RawBytesCodec.decode(&tensor),
            Err(ServingError::DatatypeMismatch { field, actual, .. }) if field == "x" && actual == "FP32"
        );
    }
}
