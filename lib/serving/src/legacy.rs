// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Row-oriented `{"columns": [...], "data": [[...], ...]}` requests.
//!
//! Each column becomes one tensor of shape `[rows]` and the request is tagged `dataframe`.
//! Columns the model declares take the declared datatype, the others are typed from their
//! values.
//! Responses come back as a flat JSON array of scalars; names and datatypes are dropped.

use half::f16;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codecs::content_type;
use crate::error::{ServingError, ServingResult};
use crate::protocols::tensor::{
    DataType, FlattenTensor, InferenceRequest, InferenceResponse, Parameters, ParametersExt,
    Tensor,
};
use crate::translate::ModelInputSpec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRequest {
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyResponse(pub Vec<Value>);

impl LegacyRequest {
    pub fn new(columns: Vec<String>, data: Vec<Vec<Value>>) -> Self {
        Self { columns, data }
    }

    /// Checks the row lengths and builds one tensor per column, typed from its values.
    pub fn into_inference_request(self) -> ServingResult<InferenceRequest> {
        self.into_request(None)
    }

    /// Same as [`LegacyRequest::into_inference_request`], with every column `spec` declares
    /// converted to its declared datatype.
    pub fn into_inference_request_for(
        self,
        spec: &ModelInputSpec,
    ) -> ServingResult<InferenceRequest> {
        self.into_request(Some(spec))
    }

    fn into_request(self, spec: Option<&ModelInputSpec>) -> ServingResult<InferenceRequest> {
        if self.columns.is_empty() {
            return Err(ServingError::EmptyColumnSet);
        }

        let expected = self.columns.len();
        if let Some((row, values)) = self
            .data
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != expected)
        {
            return Err(ServingError::ColumnLengthMismatch {
                row,
                expected,
                actual: values.len(),
            });
        }

        let rows = self.data.len();
        let inputs = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<&Value> = self.data.iter().map(|row| &row[idx]).collect();
                let declared = spec.and_then(|s| s.input(name)).map(|m| m.data_type);
                let data = column_data(name, &values, declared)?;
                Ok(Tensor::new(name.as_str(), vec![rows as i64], data))
            })
            .collect::<ServingResult<Vec<_>>>()?;

        let mut parameters = Parameters::new();
        parameters.set_content_type(content_type::DATAFRAME);
        Ok(InferenceRequest {
            id: None,
            parameters,
            inputs,
            outputs: None,
        })
    }
}

impl TryFrom<LegacyRequest> for InferenceRequest {
    type Error = ServingError;

    fn try_from(request: LegacyRequest) -> Result<Self, Self::Error> {
        request.into_inference_request()
    }
}

impl LegacyResponse {
    /// Every output in order, each flattened in row-major order.
    pub fn from_response(response: &InferenceResponse) -> Self {
        Self(
            response
                .outputs
                .iter()
                .flat_map(|tensor| tensor.data.to_json_values())
                .collect(),
        )
    }
}

impl From<&InferenceResponse> for LegacyResponse {
    fn from(response: &InferenceResponse) -> Self {
        Self::from_response(response)
    }
}

fn is_integer(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_i64() || n.is_u64())
}

/// Datatype of a column, from its first non-null value. An integer column holding a float
/// further down is FP64.
fn infer_data_type(values: &[&Value]) -> Option<DataType> {
    values.iter().find(|v| !v.is_null()).map(|v| match v {
        Value::Bool(_) => DataType::Bool,
        Value::Number(_)
            if is_integer(v) && !values.iter().any(|v| v.is_number() && !is_integer(v)) =>
        {
            DataType::Int64
        }
        Value::Number(_) => DataType::Fp64,
        // nested values are rejected when the column is converted
        _ => DataType::Bytes,
    })
}

fn column_data(
    name: &str,
    values: &[&Value],
    declared: Option<DataType>,
) -> ServingResult<FlattenTensor> {
    if let Some(data_type) = declared {
        return declared_column_data(name, values, data_type);
    }

    let mismatch = |row: usize, value: &Value, data_type: DataType| {
        ServingError::invalid(
            name,
            format!("row {row}: expected a {data_type} value, got {value}"),
        )
    };

    // a column of nulls only (or no rows) is a column of missing numbers
    let Some(data_type) = infer_data_type(values) else {
        return Ok(FlattenTensor::Fp64(vec![f64::NAN; values.len()]));
    };

    let data = match data_type {
        DataType::Bool => FlattenTensor::Bool(
            values
                .iter()
                .enumerate()
                .map(|(row, v)| v.as_bool().ok_or_else(|| mismatch(row, *v, data_type)))
                .collect::<ServingResult<_>>()?,
        ),
        DataType::Int64 => FlattenTensor::Int64(
            values
                .iter()
                .enumerate()
                .map(|(row, v)| v.as_i64().ok_or_else(|| mismatch(row, *v, data_type)))
                .collect::<ServingResult<_>>()?,
        ),
        DataType::Fp64 => FlattenTensor::Fp64(
            values
                .iter()
                .enumerate()
                .map(|(row, v)| match v {
                    Value::Null => Ok(f64::NAN),
                    _ => v.as_f64().ok_or_else(|| mismatch(row, *v, data_type)),
                })
                .collect::<ServingResult<_>>()?,
        ),
        _ => FlattenTensor::Bytes(
            values
                .iter()
                .enumerate()
                .map(|(row, v)| {
                    v.as_str()
                        .map(|s| s.as_bytes().to_vec())
                        .ok_or_else(|| mismatch(row, *v, DataType::Bytes))
                })
                .collect::<ServingResult<_>>()?,
        ),
    };
    Ok(data)
}

/// Converts a column to the datatype the model declares for it. Nulls in a float column are
/// NaN.
fn declared_column_data(
    name: &str,
    values: &[&Value],
    data_type: DataType,
) -> ServingResult<FlattenTensor> {
    if !matches!(data_type, DataType::Fp16 | DataType::Fp32 | DataType::Fp64) {
        return FlattenTensor::from_scalars(data_type, name, values);
    }

    let floats = values
        .iter()
        .enumerate()
        .map(|(row, v)| match v {
            Value::Null => Ok(f64::NAN),
            _ => v.as_f64().ok_or_else(|| {
                ServingError::invalid(
                    name,
                    format!("row {row}: expected a {data_type} value, got {v}"),
                )
            }),
        })
        .collect::<ServingResult<Vec<_>>>()?;
    Ok(match data_type {
        DataType::Fp16 => FlattenTensor::Fp16(floats.into_iter().map(f16::from_f64).collect()),
        DataType::Fp32 => FlattenTensor::Fp32(floats.into_iter().map(|v| v as f32).collect()),
        _ => FlattenTensor::Fp64(floats),
    })
}
