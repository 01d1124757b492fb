// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use super::resolver::default_content_type;
use super::{CodecRegistry, DomainValue, RequestCodec, content_type};
use crate::error::{ServingError, ServingResult};
use crate::protocols::tensor::{ParametersExt, Tensor};

/// Number of rows of a column value, its leading dimension. `None` for values that can not
/// be a column.
fn rows_of(value: &DomainValue) -> Option<usize> {
    match value {
        DomainValue::Array(array) => Some(array.shape().first().copied().unwrap_or(1)),
        DomainValue::Bytes(bytes) => Some(bytes.shape().first().copied().unwrap_or(1)),
        DomainValue::Strings(strings) => Some(strings.len()),
        DomainValue::DataFrame(_) => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: DomainValue,
    /// Field codec the column was decoded with, used again when it is encoded.
    pub content_type: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data: DomainValue) -> Self {
        Self {
            name: name.into(),
            data,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn rows(&self) -> usize {
        rows_of(&self.data).unwrap_or(0)
    }
}

/// Ordered, named columns sharing a row count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataFrame {
    columns: Vec<Column>,
}

impl DataFrame {
    /// Fails on duplicate column names, nested dataframes, or columns with a different row
    /// count than the first.
    pub fn new(columns: Vec<Column>) -> ServingResult<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        let mut expected_rows = None;
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ServingError::DuplicateField {
                    field: column.name.clone(),
                });
            }

            let rows = rows_of(&column.data).ok_or_else(|| ServingError::IncompatibleValue {
                content_type: content_type::DATAFRAME.to_string(),
                value_kind: column.data.kind().to_string(),
            })?;
            match expected_rows {
                None => expected_rows = Some(rows),
                Some(expected) if expected != rows => {
                    return Err(ServingError::ShapeMismatch {
                        field: column.name.clone(),
                        expected: vec![expected as i64],
                        actual: vec![rows as i64],
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Column::rows).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

/// `dataframe` request codec: every tensor of a request becomes a column, in request order.
///
/// Each column goes through the field codec named by its `content_type`, or the datatype
/// default when untagged. Encoding uses the same codec again, so tagged columns come back
/// tagged.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataFrameCodec;

impl RequestCodec for DataFrameCodec {
    fn content_type(&self) -> &'static str {
        content_type::DATAFRAME
    }

    fn can_encode(&self, value: &DomainValue) -> bool {
        matches!(value, DomainValue::DataFrame(_))
    }

    fn encode(&self, value: &DomainValue, fields: &CodecRegistry) -> ServingResult<Vec<Tensor>> {
        let DomainValue::DataFrame(frame) = value else {
            return Err(ServingError::IncompatibleValue {
                content_type: self.content_type().to_string(),
                value_kind: value.kind().to_string(),
            });
        };

        frame
            .columns()
            .iter()
            .map(|column| {
                let codec = column
                    .content_type
                    .as_deref()
                    .and_then(|tag| fields.input(tag))
                    .filter(|codec| codec.can_encode(&column.data))
                    .or_else(|| fields.find_input_encoder(&column.data))
                    .ok_or_else(|| ServingError::IncompatibleValue {
                        content_type: column.content_type.clone().unwrap_or_default(),
                        value_kind: column.data.kind().to_string(),
                    })?;
                codec.encode(&column.name, &column.data)
            })
            .collect()
    }

    fn decode(&self, tensors: &[Tensor], fields: &CodecRegistry) -> ServingResult<DomainValue> {
        let columns = tensors
            .iter()
            .map(|tensor| {
                let tag = tensor
                    .parameters()
                    .content_type()
                    .unwrap_or_else(|| default_content_type(tensor.data_type()));
                let codec = fields.require_input(tag, tensor.name())?;
                Ok(Column::new(tensor.name(), codec.decode(tensor)?)
                    .with_content_type(codec.content_type()))
            })
            .collect::<ServingResult<Vec<_>>>()?;

        tracing::trace!(columns = columns.len(), "decoded dataframe");
        DataFrame::new(columns).map(DomainValue::DataFrame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::NdArray;
    use crate::protocols::tensor::{DataType, FlattenTensor};
    use assert_matches::assert_matches;

    fn registry() -> CodecRegistry {
        CodecRegistry::with_defaults()
    }

    fn request_tensors() -> Vec<Tensor> {
        vec![
            Tensor::new("b", vec![2], FlattenTensor::Int64(vec![1, 2])),
            Tensor::new(
                "a",
                vec![2],
                FlattenTensor::Bytes(vec![b"x".to_vec(), b"y".to_vec()]),
            )
            .with_content_type("str"),
            Tensor::new("c", vec![2, 2], FlattenTensor::Fp32(vec![0.0, 0.5, 1.0, 1.5])),
        ]
    }

    #[test]
    fn test_decode_preserves_column_order() {
        let value = DataFrameCodec.decode(&request_tensors(), &registry()).unwrap();
        let DomainValue::DataFrame(frame) = &value else {
            panic!("expected a dataframe");
        };
        assert_eq!(frame.names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(frame.num_rows(), 2);
        assert_matches!(
            &frame.column("a").unwrap().data,
            DomainValue::Strings(s) if s == &["x", "y"]
        );
        assert_matches!(
            &frame.column("c").unwrap().data,
            DomainValue::Array(a) if a.shape() == [2, 2] && a.data_type() == DataType::Fp32
        );
        assert_eq!(frame.column("c").unwrap().content_type.as_deref(), Some("array"));
    }

    #[test]
    fn test_encode_round_trip() {
        let tensors = request_tensors();
        let value = DataFrameCodec.decode(&tensors, &registry()).unwrap();
        assert_eq!(DataFrameCodec.encode(&value, &registry()).unwrap(), tensors);
    }

    #[test]
    fn test_untagged_bytes_column_is_raw() {
        let tensors = vec![Tensor::new(
            "raw",
            vec![1],
            FlattenTensor::Bytes(vec![b"x".to_vec()]),
        )];
        let value = DataFrameCodec.decode(&tensors, &registry()).unwrap();
        let DomainValue::DataFrame(frame) = &value else {
            panic!("expected a dataframe");
        };
        assert_matches!(&frame.columns()[0].data, DomainValue::Bytes(b) if b.len() == 1);
        assert_eq!(DataFrameCodec.encode(&value, &registry()).unwrap(), tensors);
    }

    #[test]
    fn test_base64_column_decoded_and_retagged() {
        let tensors = vec![
            Tensor::new("blob", vec![1], FlattenTensor::Bytes(vec![b"aGVsbG8=".to_vec()]))
                .with_content_type("base64"),
            Tensor::new("x", vec![1], FlattenTensor::Fp64(vec![1.0])),
        ];
        let value = DataFrameCodec.decode(&tensors, &registry()).unwrap();
        let DomainValue::DataFrame(frame) = &value else {
            panic!("expected a dataframe");
        };
        assert_matches!(
            &frame.columns()[0].data,
            DomainValue::Bytes(b) if b.iter().next() == Some(&b"hello".to_vec())
        );
        assert_eq!(DataFrameCodec.encode(&value, &registry()).unwrap(), tensors);
    }

    #[test]
    fn test_unknown_column_tag() {
        let tensors = vec![
            Tensor::new("a", vec![1], FlattenTensor::Int64(vec![1])).with_content_type("parquet"),
        ];
        assert_matches!(
            DataFrameCodec.decode(&tensors, &registry()),
            Err(ServingError::UnsupportedContentType { content_type, field: Some(field) })
                if content_type == "parquet" && field == "a"
        );
    }

    #[test]
    fn test_mismatched_rows() {
        let tensors = vec![
            Tensor::new("a", vec![2], FlattenTensor::Int64(vec![1, 2])),
            Tensor::new("b", vec![3], FlattenTensor::Int64(vec![1, 2, 3])),
        ];
        assert_matches!(
            DataFrameCodec.decode(&tensors, &registry()),
            Err(ServingError::ShapeMismatch { field, expected, actual })
                if field == "b" && expected == vec![2] && actual == vec![3]
        );
    }

    #[test]
    fn test_duplicate_columns() {
        let tensors = vec![
            Tensor::new("a", vec![1], FlattenTensor::Int64(vec![1])),
            Tensor::new("a", vec![1], FlattenTensor::Int64(vec![2])),
        ];
        assert_matches!(
            DataFrameCodec.decode(&tensors, &registry()),
            Err(ServingError::DuplicateField { field }) if field == "a"
        );
    }

    #[test]
    fn test_nested_frames_rejected() {
        let inner = DataFrame::new(vec![Column::new(
            "x",
            DomainValue::Array(NdArray::Int64(ndarray::ArrayD::zeros(vec![1]))),
        )])
        .unwrap();
        assert_matches!(
            DataFrame::new(vec![Column::new("nested", DomainValue::DataFrame(inner))]),
            Err(ServingError::IncompatibleValue { value_kind, .. }) if value_kind == "dataframe"
        );
    }

    #[test]
    fn test_encode_rejects_other_values() {
        let value = DomainValue::Strings(vec![]);
        assert!(!DataFrameCodec.can_encode(&value));
        assert!(DataFrameCodec.encode(&value, &registry()).is_err());
    }
}
