// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use half::f16;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use indexmap::IndexMap;
use std::str::FromStr;
use validator::Validate;

use crate::error::{ServingError, ServingResult};

/// Parameter key carrying the content-type tag of a tensor or of a whole request.
pub const CONTENT_TYPE_KEY: &str = "content_type";

/// Parameter key marking a declared input as optional.
pub const OPTIONAL_KEY: &str = "optional";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Fp16,
    Fp32,
    Fp64,
    Bytes,
}

impl DataType {
    pub const ALL: [DataType; 13] = [
        DataType::Bool,
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Uint64,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Fp16,
        DataType::Fp32,
        DataType::Fp64,
        DataType::Bytes,
    ];

    pub fn size(&self) -> usize {
        match self {
            DataType::Bool => size_of::<bool>(),
            DataType::Uint8 => size_of::<u8>(),
            DataType::Uint16 => size_of::<u16>(),
            DataType::Uint32 => size_of::<u32>(),
            DataType::Uint64 => size_of::<u64>(),
            DataType::Int8 => size_of::<i8>(),
            DataType::Int16 => size_of::<i16>(),
            DataType::Int32 => size_of::<i32>(),
            DataType::Int64 => size_of::<i64>(),
            DataType::Fp16 => size_of::<f16>(),
            DataType::Fp32 => size_of::<f32>(),
            DataType::Fp64 => size_of::<f64>(),
            DataType::Bytes => 0, // variable length, return 0 as indicator
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DataType::Bool => write!(f, "BOOL"),
            DataType::Uint8 => write!(f, "UINT8"),
            DataType::Uint16 => write!(f, "UINT16"),
            DataType::Uint32 => write!(f, "UINT32"),
            DataType::Uint64 => write!(f, "UINT64"),
            DataType::Int8 => write!(f, "INT8"),
            DataType::Int16 => write!(f, "INT16"),
            DataType::Int32 => write!(f, "INT32"),
            DataType::Int64 => write!(f, "INT64"),
            DataType::Fp16 => write!(f, "FP16"),
            DataType::Fp32 => write!(f, "FP32"),
            DataType::Fp64 => write!(f, "FP64"),
            DataType::Bytes => write!(f, "BYTES"),
        }
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOL" => Ok(DataType::Bool),
            "UINT8" => Ok(DataType::Uint8),
            "UINT16" => Ok(DataType::Uint16),
            "UINT32" => Ok(DataType::Uint32),
            "UINT64" => Ok(DataType::Uint64),
            "INT8" => Ok(DataType::Int8),
            "INT16" => Ok(DataType::Int16),
            "INT32" => Ok(DataType::Int32),
            "INT64" => Ok(DataType::Int64),
            "FP16" => Ok(DataType::Fp16),
            "FP32" => Ok(DataType::Fp32),
            "FP64" => Ok(DataType::Fp64),
            "BYTES" => Ok(DataType::Bytes),
            _ => Err(anyhow::anyhow!("Invalid data type: {s}")),
        }
    }
}

/// Typed flat buffer backing a [`Tensor`], one variant per [`DataType`].
#[derive(Debug, Clone, PartialEq)]
pub enum FlattenTensor {
    Bool(Vec<bool>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Fp16(Vec<f16>),
    Fp32(Vec<f32>),
    Fp64(Vec<f64>),
    // Typically use to store string data, but really it can store
    // arbitrary data such as serialized objects.
    Bytes(Vec<Vec<u8>>),
}

impl FlattenTensor {
    pub fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::Bool => Self::Bool(Vec::new()),
            DataType::Uint8 => Self::Uint8(Vec::new()),
            DataType::Uint16 => Self::Uint16(Vec::new()),
            DataType::Uint32 => Self::Uint32(Vec::new()),
            DataType::Uint64 => Self::Uint64(Vec::new()),
            DataType::Int8 => Self::Int8(Vec::new()),
            DataType::Int16 => Self::Int16(Vec::new()),
            DataType::Int32 => Self::Int32(Vec::new()),
            DataType::Int64 => Self::Int64(Vec::new()),
            DataType::Fp16 => Self::Fp16(Vec::new()),
            DataType::Fp32 => Self::Fp32(Vec::new()),
            DataType::Fp64 => Self::Fp64(Vec::new()),
            DataType::Bytes => Self::Bytes(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Uint8(v) => v.len(),
            Self::Uint16(v) => v.len(),
            Self::Uint32(v) => v.len(),
            Self::Uint64(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Fp16(v) => v.len(),
            Self::Fp32(v) => v.len(),
            Self::Fp64(v) => v.len(),
            Self::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Uint8(_) => DataType::Uint8,
            Self::Uint16(_) => DataType::Uint16,
            Self::Uint32(_) => DataType::Uint32,
            Self::Uint64(_) => DataType::Uint64,
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Fp16(_) => DataType::Fp16,
            Self::Fp32(_) => DataType::Fp32,
            Self::Fp64(_) => DataType::Fp64,
            Self::Bytes(_) => DataType::Bytes,
        }
    }

    /// Builds a buffer of `data_type` from the JSON `data` field of a wire tensor.
    /// Nested arrays are flattened in row-major order; a bare scalar is a single element.
    pub fn from_json(data_type: DataType, name: &str, data: &Value) -> ServingResult<Self> {
        let mut scalars = Vec::new();
        collect_scalars(data, &mut scalars);
        Self::from_scalars(data_type, name, &scalars)
    }

    /// Builds a buffer of `data_type` from JSON scalars, one element each.
    pub fn from_scalars(data_type: DataType, name: &str, scalars: &[&Value]) -> ServingResult<Self> {
        let flat = match data_type {
            DataType::Bool => Self::Bool(convert(name, data_type, scalars, Value::as_bool)?),
            DataType::Uint8 => Self::Uint8(convert(name, data_type, scalars, as_unsigned::<u8>)?),
            DataType::Uint16 => Self::Uint16(convert(name, data_type, scalars, as_unsigned::<u16>)?),
            DataType::Uint32 => Self::Uint32(convert(name, data_type, scalars, as_unsigned::<u32>)?),
            DataType::Uint64 => Self::Uint64(convert(name, data_type, scalars, Value::as_u64)?),
            DataType::Int8 => Self::Int8(convert(name, data_type, scalars, as_signed::<i8>)?),
            DataType::Int16 => Self::Int16(convert(name, data_type, scalars, as_signed::<i16>)?),
            DataType::Int32 => Self::Int32(convert(name, data_type, scalars, as_signed::<i32>)?),
            DataType::Int64 => Self::Int64(convert(name, data_type, scalars, Value::as_i64)?),
            DataType::Fp16 => Self::Fp16(convert(name, data_type, scalars, |v| {
                v.as_f64().map(f16::from_f64)
            })?),
            DataType::Fp32 => Self::Fp32(convert(name, data_type, scalars, |v| {
                v.as_f64().map(|x| x as f32)
            })?),
            DataType::Fp64 => Self::Fp64(convert(name, data_type, scalars, Value::as_f64)?),
            DataType::Bytes => Self::Bytes(convert(name, data_type, scalars, |v| {
                v.as_str().map(|s| s.as_bytes().to_vec())
            })?),
        };
        Ok(flat)
    }

    /// Renders the buffer as flat JSON values. BYTES elements become strings (lossy UTF-8).
    pub fn to_json_values(&self) -> Vec<Value> {
        match self {
            Self::Bool(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Uint8(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Uint16(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Uint32(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Uint64(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Int8(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Int16(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Int32(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Int64(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Fp16(v) => v.iter().map(|&x| Value::from(x.to_f64())).collect(),
            Self::Fp32(v) => v.iter().map(|&x| Value::from(x as f64)).collect(),
            Self::Fp64(v) => v.iter().map(|&x| Value::from(x)).collect(),
            Self::Bytes(v) => v.iter().map(|x| bytes_to_json(x)).collect(),
        }
    }
}

/// JSON rendering of a single BYTES element.
pub fn bytes_to_json(bytes: &[u8]) -> Value {
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

fn collect_scalars<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_scalars(item, out);
            }
        }
        other => out.push(other),
    }
}

fn as_signed<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    value.as_i64().and_then(|x| T::try_from(x).ok())
}

fn as_unsigned<T: TryFrom<u64>>(value: &Value) -> Option<T> {
    value.as_u64().and_then(|x| T::try_from(x).ok())
}

fn convert<T>(
    name: &str,
    data_type: DataType,
    scalars: &[&Value],
    f: impl Fn(&Value) -> Option<T>,
) -> ServingResult<Vec<T>> {
    scalars
        .iter()
        .map(|&v| {
            f(v).ok_or_else(|| ServingError::InvalidPayload {
                field: name.to_string(),
                reason: format!("expected {data_type} element, got {v}"),
            })
        })
        .collect()
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Double(f64),
    String(String),
}

pub type Parameters = IndexMap<String, ParameterValue>;

/// Typed access to the well-known keys of a [`Parameters`] map.
pub trait ParametersExt {
    fn content_type(&self) -> Option<&str>;
    fn set_content_type(&mut self, content_type: &str);
    fn flag(&self, key: &str) -> bool;
}

impl ParametersExt for Parameters {
    fn content_type(&self) -> Option<&str> {
        match self.get(CONTENT_TYPE_KEY) {
            Some(ParameterValue::String(value)) if !value.is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    fn set_content_type(&mut self, content_type: &str) {
        self.insert(
            CONTENT_TYPE_KEY.to_string(),
            ParameterValue::String(content_type.to_string()),
        );
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(ParameterValue::Bool(true)))
    }
}

/// Name, type and shape of a tensor. Also used to describe declared model inputs and outputs,
/// where a `-1` dimension is a wildcard.
#[derive(Serialize, Deserialize, Validate, Debug, Clone, PartialEq)]
pub struct TensorMetadata {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "datatype")]
    pub data_type: DataType,
    pub shape: Vec<i64>,

    /// Optional parameters for this tensor
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub parameters: Parameters,
}

impl TensorMetadata {
    pub fn new(name: impl Into<String>, data_type: DataType, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            data_type,
            shape,
            parameters: Parameters::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.parameters.set_content_type(content_type);
        self
    }

    /// Number of elements implied by the shape, `None` if a dimension is negative or it overflows.
    pub fn element_count(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &d| {
            usize::try_from(d).ok().and_then(|d| acc.checked_mul(d))
        })
    }
}

/// A named, shaped and typed buffer: the atomic unit of the inference protocol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "WireTensor", into = "WireTensor")]
pub struct Tensor {
    pub metadata: TensorMetadata,
    pub data: FlattenTensor,
}

impl Tensor {
    pub fn new(name: impl Into<String>, shape: Vec<i64>, data: FlattenTensor) -> Self {
        Self {
            metadata: TensorMetadata::new(name, data.data_type(), shape),
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.metadata.parameters.set_content_type(content_type);
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn shape(&self) -> &[i64] {
        &self.metadata.shape
    }

    pub fn data_type(&self) -> DataType {
        self.metadata.data_type
    }

    pub fn parameters(&self) -> &Parameters {
        &self.metadata.parameters
    }
}

impl validator::Validate for Tensor {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        use validator::{ValidationError, ValidationErrors};
        let mut errs = ValidationErrors::new();

        // dtype must match
        if self.metadata.data_type != self.data.data_type() {
            let mut e = ValidationError::new("dtype_mismatch");
            e.message = Some("metadata.datatype does not match data variant".into());
            errs.add("datatype", e);
        }

        match self.metadata.element_count() {
            None => {
                let mut e = ValidationError::new("negative_dim");
                e.message = Some("shape dimensions must be non-negative".into());
                errs.add("shape", e);
            }
            // bytes payloads may be variable-length per item; enforce outer count only
            Some(product) if product != self.data.len() => {
                let mut e = ValidationError::new("element_count_mismatch");
                e.message = Some(
                    format!(
                        "shape implies {} elements but data has {}",
                        product,
                        self.data.len()
                    )
                    .into(),
                );
                errs.add("shape", e);
            }
            Some(_) => {}
        }

        if errs.is_empty() { Ok(()) } else { Err(errs) }
    }
}

/// JSON shape of a tensor on the wire, with an untyped `data` array.
#[derive(Serialize, Deserialize)]
struct WireTensor {
    name: String,
    shape: Vec<i64>,
    datatype: DataType,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    parameters: Parameters,
    data: Value,
}

impl TryFrom<WireTensor> for Tensor {
    type Error = ServingError;

    fn try_from(wire: WireTensor) -> Result<Self, Self::Error> {
        let data = FlattenTensor::from_json(wire.datatype, &wire.name, &wire.data)?;
        Ok(Tensor {
            metadata: TensorMetadata {
                name: wire.name,
                data_type: wire.datatype,
                shape: wire.shape,
                parameters: wire.parameters,
            },
            data,
        })
    }
}

impl From<Tensor> for WireTensor {
    fn from(tensor: Tensor) -> Self {
        WireTensor {
            data: Value::Array(tensor.data.to_json_values()),
            name: tensor.metadata.name,
            shape: tensor.metadata.shape,
            datatype: tensor.metadata.data_type,
            parameters: tensor.metadata.parameters,
        }
    }
}

/// An output the client asks for; when a request lists outputs, only those are returned.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestOutput {
    pub name: String,

    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub parameters: Parameters,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct InferenceRequest {
    /// ID of the request
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,

    /// Optional request-level parameters, may carry the request content type
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub parameters: Parameters,

    /// Input tensors.
    pub inputs: Vec<Tensor>,

    /// Outputs to return, all outputs when absent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub outputs: Option<Vec<RequestOutput>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InferenceResponse {
    pub model_name: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model_version: Option<String>,

    /// ID of the corresponding request.
    pub id: String,

    /// Optional response-level parameters
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub parameters: Parameters,

    /// Output tensors.
    pub outputs: Vec<Tensor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_parameters_keep_insertion_order() {
        let text = r#"{"zeta":1,"content_type":"str","alpha":true,"mid":2.5}"#;
        let parameters: Parameters = serde_json::from_str(text).unwrap();
        let keys: Vec<_> = parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "content_type", "alpha", "mid"]);
        assert_eq!(serde_json::to_string(&parameters).unwrap(), text);

        let mut parameters = Parameters::new();
        parameters.insert("b".to_string(), ParameterValue::Bool(false));
        parameters.set_content_type("np");
        parameters.set_content_type("pd");
        assert_eq!(
            serde_json::to_string(&parameters).unwrap(),
            r#"{"b":false,"content_type":"pd"}"#
        );
    }

    #[test]
    fn test_data_type_string_round_trip() {
        for data_type in DataType::ALL {
            let parsed: DataType = data_type.to_string().parse().unwrap();
            assert_eq!(parsed, data_type);
            let json = serde_json::to_value(data_type).unwrap();
            assert_eq!(json, Value::String(data_type.to_string()));
        }
        assert!("FLOAT32".parse::<DataType>().is_err());
    }

    #[test]
    fn test_tensor_from_wire_json() {
        let tensor: Tensor = serde_json::from_value(json!({
            "name": "input-0",
            "shape": [2, 2],
            "datatype": "INT32",
            "parameters": {"content_type": "np"},
            "data": [[1, 2], [3, 4]]
        }))
        .unwrap();

        assert_eq!(tensor.name(), "input-0");
        assert_eq!(tensor.shape(), &[2, 2]);
        assert_eq!(tensor.data, FlattenTensor::Int32(vec![1, 2, 3, 4]));
        assert_eq!(tensor.parameters().content_type(), Some("np"));
        assert!(tensor.validate().is_ok());
    }

    #[test]
    fn test_tensor_wire_serialization() {
        let tensor = Tensor::new(
            "text",
            vec![2],
            FlattenTensor::Bytes(vec![b"hello".to_vec(), b"world".to_vec()]),
        )
        .with_content_type("str");

        let json = serde_json::to_value(&tensor).unwrap();
        assert_eq!(
            json,
            json!({
                "name": "text",
                "shape": [2],
                "datatype": "BYTES",
                "parameters": {"content_type": "str"},
                "data": ["hello", "world"]
            })
        );
        let back: Tensor = serde_json::from_value(json).unwrap();
        assert_eq!(back, tensor);
    }

    #[test]
    fn test_tensor_rejects_out_of_range_elements() {
        let result = serde_json::from_value::<Tensor>(json!({
            "name": "x",
            "shape": [2],
            "datatype": "UINT8",
            "data": [1, 300]
        }));
        assert!(result.is_err());

        let err = FlattenTensor::from_json(DataType::Bool, "flag", &json!([true, 1])).unwrap_err();
        assert_matches!(err, ServingError::InvalidPayload { field, .. } if field == "flag");
    }

    #[test]
    fn test_tensor_validate_element_count() {
        let tensor = Tensor::new("x", vec![3, 2], FlattenTensor::Fp32(vec![1.0; 5]));
        assert!(tensor.validate().is_err());

        let tensor = Tensor::new("x", vec![-1], FlattenTensor::Fp32(vec![1.0]));
        assert!(tensor.validate().is_err());

        let mut tensor = Tensor::new("x", vec![1], FlattenTensor::Fp32(vec![1.0]));
        tensor.metadata.data_type = DataType::Fp64;
        assert!(tensor.validate().is_err());
    }

    #[test]
    fn test_fp16_json() {
        let flat = FlattenTensor::from_json(DataType::Fp16, "h", &json!([0.5, 2])).unwrap();
        assert_eq!(
            flat,
            FlattenTensor::Fp16(vec![f16::from_f64(0.5), f16::from_f64(2.0)])
        );
        assert_eq!(flat.to_json_values(), vec![json!(0.5), json!(2.0)]);
    }

    #[test]
    fn test_request_parsing() {
        let request: InferenceRequest = serde_json::from_value(json!({
            "id": "req-1",
            "parameters": {"content_type": "pd", "threshold": 0.5, "top_k": 3},
            "inputs": [
                {"name": "a", "shape": [2], "datatype": "FP64", "data": [1.0, 2.5]}
            ],
            "outputs": [{"name": "predict"}]
        }))
        .unwrap();

        assert_eq!(request.id.as_deref(), Some("req-1"));
        assert_eq!(request.parameters.content_type(), Some("pd"));
        assert_eq!(
            request.parameters.get("threshold"),
            Some(&ParameterValue::Double(0.5))
        );
        assert_eq!(
            request.parameters.get("top_k"),
            Some(&ParameterValue::Int64(3))
        );
        assert_eq!(request.inputs[0].data, FlattenTensor::Fp64(vec![1.0, 2.5]));
        assert_eq!(request.outputs.unwrap()[0].name, "predict");
    }
}
