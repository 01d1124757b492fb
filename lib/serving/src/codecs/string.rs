// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{DomainValue, InputCodec, content_type};
use crate::error::{ServingError, ServingResult};
use crate::protocols::tensor::{DataType, FlattenTensor, Tensor};

/// `str` codec: BYTES elements as UTF-8 strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringCodec;

impl StringCodec {
    pub fn decode_strings(&self, tensor: &Tensor) -> ServingResult<Vec<String>> {
        let FlattenTensor::Bytes(elements) = &tensor.data else {
            return Err(ServingError::DatatypeMismatch {
                field: tensor.name().to_string(),
                expected: DataType::Bytes.to_string(),
                actual: tensor.data_type().to_string(),
            });
        };

        elements
            .iter()
            .enumerate()
            .map(|(idx, element)| {
                String::from_utf8(element.clone()).map_err(|e| {
                    ServingError::invalid(
                        tensor.name(),
                        format!("element {idx} is not valid UTF-8: {e}"),
                    )
                })
            })
            .collect()
    }

    pub fn encode_strings(&self, name: &str, strings: &[String]) -> Tensor {
        let elements = strings.iter().map(|s| s.as_bytes().to_vec()).collect();
        Tensor::new(
            name,
            vec![strings.len() as i64],
            FlattenTensor::Bytes(elements),
        )
        .with_content_type(self.content_type())
    }
}

impl InputCodec for StringCodec {
    fn content_type(&self) -> &'static str {
        content_type::STRING
    }

    fn can_encode(&self, value: &DomainValue) -> bool {
        matches!(value, DomainValue::Strings(_))
    }

    fn encode(&self, name: &str, value: &DomainValue) -> ServingResult<Tensor> {
        match value {
            DomainValue::Strings(strings) => Ok(self.encode_strings(name, strings)),
            other => Err(ServingError::IncompatibleValue {
                content_type: self.content_type().to_string(),
                value_kind: other.kind().to_string(),
            }),
        }
    }

    fn decode(&self, tensor: &Tensor) -> ServingResult<DomainValue> {
        self.decode_strings(tensor).map(DomainValue::Strings)
    }
}
