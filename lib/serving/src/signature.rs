// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # Signature translation
//!
//! Turns the input / output signature a model framework declares (MLflow column or tensor
//! signatures) into protocol metadata. Every declared field is annotated with the content type
//! later requests should be decoded with, and column signatures mark the whole model as
//! `dataframe`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tensorgate_runtime::ServingConfig;

use crate::codecs::content_type;
use crate::error::{ServingError, ServingResult};
use crate::protocols::metadata::MetadataModelResponse;
use crate::protocols::tensor::{DataType, Parameters, ParametersExt, TensorMetadata};

/// Whether a foreign type name belongs to a column or a tensor signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKind {
    Column,
    Tensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignTypeEntry {
    pub kind: ForeignKind,
    pub name: &'static str,
    pub data_type: DataType,
    pub content_type: &'static str,
}

const fn entry(
    kind: ForeignKind,
    name: &'static str,
    data_type: DataType,
    content_type: &'static str,
) -> ForeignTypeEntry {
    ForeignTypeEntry {
        kind,
        name,
        data_type,
        content_type,
    }
}

/// Every foreign type the translator understands. Anything missing is rejected.
pub static FOREIGN_TYPE_TABLE: &[ForeignTypeEntry] = &[
    // column types
    entry(ForeignKind::Column, "boolean", DataType::Bool, content_type::ARRAY),
    entry(ForeignKind::Column, "integer", DataType::Int32, content_type::ARRAY),
    entry(ForeignKind::Column, "long", DataType::Int64, content_type::ARRAY),
    entry(ForeignKind::Column, "float", DataType::Fp32, content_type::ARRAY),
    entry(ForeignKind::Column, "double", DataType::Fp64, content_type::ARRAY),
    entry(ForeignKind::Column, "string", DataType::Bytes, content_type::STRING),
    entry(ForeignKind::Column, "binary", DataType::Bytes, content_type::BASE64),
    // tensor dtypes
    entry(ForeignKind::Tensor, "bool", DataType::Bool, content_type::ARRAY),
    entry(ForeignKind::Tensor, "int8", DataType::Int8, content_type::ARRAY),
    entry(ForeignKind::Tensor, "int16", DataType::Int16, content_type::ARRAY),
    entry(ForeignKind::Tensor, "int32", DataType::Int32, content_type::ARRAY),
    entry(ForeignKind::Tensor, "int64", DataType::Int64, content_type::ARRAY),
    entry(ForeignKind::Tensor, "uint8", DataType::Uint8, content_type::ARRAY),
    entry(ForeignKind::Tensor, "uint16", DataType::Uint16, content_type::ARRAY),
    entry(ForeignKind::Tensor, "uint32", DataType::Uint32, content_type::ARRAY),
    entry(ForeignKind::Tensor, "uint64", DataType::Uint64, content_type::ARRAY),
    entry(ForeignKind::Tensor, "float16", DataType::Fp16, content_type::ARRAY),
    entry(ForeignKind::Tensor, "float32", DataType::Fp32, content_type::ARRAY),
    entry(ForeignKind::Tensor, "float64", DataType::Fp64, content_type::ARRAY),
    entry(ForeignKind::Tensor, "str", DataType::Bytes, content_type::ARRAY),
    entry(ForeignKind::Tensor, "object", DataType::Bytes, content_type::ARRAY),
    entry(ForeignKind::Tensor, "bytes", DataType::Bytes, content_type::ARRAY),
];

pub fn lookup_foreign_type(kind: ForeignKind, name: &str) -> Option<&'static ForeignTypeEntry> {
    FOREIGN_TYPE_TABLE
        .iter()
        .find(|entry| entry.kind == kind && entry.name == name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignType {
    /// A dataframe column of the named type, one value per row.
    Column(String),
    /// A tensor of the named dtype with a fixed shape, `-1` for variable dimensions.
    Tensor { dtype: String, shape: Vec<i64> },
}

impl ForeignType {
    pub fn kind(&self) -> ForeignKind {
        match self {
            ForeignType::Column(_) => ForeignKind::Column,
            ForeignType::Tensor { .. } => ForeignKind::Tensor,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            ForeignType::Column(name) => name,
            ForeignType::Tensor { dtype, .. } => dtype,
        }
    }
}

/// One named, typed entry of a foreign signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSignatureField", into = "RawSignatureField")]
pub struct SignatureField {
    pub name: String,
    pub declared_type: ForeignType,
    /// Overrides the content type implied by the declared type.
    pub content_type: Option<String>,
}

impl SignatureField {
    pub fn column(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: ForeignType::Column(type_name.into()),
            content_type: None,
        }
    }

    pub fn tensor(name: impl Into<String>, dtype: impl Into<String>, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            declared_type: ForeignType::Tensor {
                dtype: dtype.into(),
                shape,
            },
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// MLflow JSON rendering of a signature field:
/// `{"name": "x", "type": "double"}` or
/// `{"name": "x", "type": "tensor", "tensor-spec": {"dtype": "float32", "shape": [-1, 3]}}`.
#[derive(Debug, Serialize, Deserialize)]
struct RawSignatureField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(rename = "tensor-spec", default, skip_serializing_if = "Option::is_none")]
    tensor_spec: Option<RawTensorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawTensorSpec {
    dtype: String,
    shape: Vec<i64>,
}

impl TryFrom<RawSignatureField> for SignatureField {
    type Error = String;

    fn try_from(raw: RawSignatureField) -> Result<Self, Self::Error> {
        let name = raw.name.unwrap_or_default();
        let declared_type = if raw.type_name == "tensor" {
            let spec = raw
                .tensor_spec
                .ok_or_else(|| format!("tensor field '{name}' has no tensor-spec"))?;
            ForeignType::Tensor {
                dtype: spec.dtype,
                shape: spec.shape,
            }
        } else {
            ForeignType::Column(raw.type_name)
        };
        Ok(SignatureField {
            name,
            declared_type,
            content_type: raw.content_type,
        })
    }
}

impl From<SignatureField> for RawSignatureField {
    fn from(field: SignatureField) -> Self {
        let (type_name, tensor_spec) = match field.declared_type {
            ForeignType::Column(type_name) => (type_name, None),
            ForeignType::Tensor { dtype, shape } => {
                ("tensor".to_string(), Some(RawTensorSpec { dtype, shape }))
            }
        };
        RawSignatureField {
            name: (!field.name.is_empty()).then_some(field.name),
            type_name,
            tensor_spec,
            content_type: field.content_type,
        }
    }
}

/// How the inputs of a model are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// As a single dataframe.
    Columnar,
    /// As independent tensors.
    Tensor,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForeignSignature {
    #[serde(default)]
    pub inputs: Vec<SignatureField>,
    #[serde(default)]
    pub outputs: Vec<SignatureField>,
    /// Inferred from the inputs when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping: Option<Grouping>,
}

impl ForeignSignature {
    pub fn new(inputs: Vec<SignatureField>, outputs: Vec<SignatureField>) -> Self {
        Self {
            inputs,
            outputs,
            grouping: None,
        }
    }

    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = Some(grouping);
        self
    }

    /// Declared grouping, otherwise columnar when every input is a column.
    pub fn grouping(&self) -> Grouping {
        self.grouping.unwrap_or_else(|| {
            let columnar = !self.inputs.is_empty()
                && self
                    .inputs
                    .iter()
                    .all(|field| field.declared_type.kind() == ForeignKind::Column);
            if columnar {
                Grouping::Columnar
            } else {
                Grouping::Tensor
            }
        })
    }

    /// Parses the `inputs` / `outputs` JSON of an MLflow signature. Unnamed fields are called
    /// `input-<i>` / `output-<i>`.
    pub fn from_mlflow(inputs: &Value, outputs: Option<&Value>) -> ServingResult<Self> {
        let inputs = parse_fields(inputs, "input")?;
        let outputs = match outputs {
            Some(outputs) => parse_fields(outputs, "output")?,
            None => Vec::new(),
        };
        Ok(Self::new(inputs, outputs))
    }
}

fn parse_fields(value: &Value, prefix: &str) -> ServingResult<Vec<SignatureField>> {
    // MLflow stores the signature as a JSON string inside the MLmodel file
    let parsed;
    let value = match value {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text)
                .map_err(|e| ServingError::invalid(prefix, format!("invalid signature: {e}")))?;
            &parsed
        }
        other => other,
    };

    let mut fields: Vec<SignatureField> = serde_json::from_value(value.clone())
        .map_err(|e| ServingError::invalid(prefix, format!("invalid signature: {e}")))?;
    for (idx, field) in fields.iter_mut().enumerate() {
        if field.name.is_empty() {
            field.name = format!("{prefix}-{idx}");
        }
    }
    Ok(fields)
}

/// Builds the metadata descriptor of a model from its foreign signature.
///
/// Either every field translates or nothing is returned. `version` falls back to the
/// configured default version.
pub fn translate_signature(
    name: &str,
    version: Option<&str>,
    signature: &ForeignSignature,
    config: &ServingConfig,
) -> ServingResult<MetadataModelResponse> {
    let inputs = translate_fields(&signature.inputs)?;
    let outputs = translate_fields(&signature.outputs)?;

    let mut parameters = Parameters::new();
    if signature.grouping() == Grouping::Columnar {
        parameters.set_content_type(content_type::DATAFRAME);
    }

    Ok(MetadataModelResponse {
        name: name.to_string(),
        versions: vec![version.unwrap_or(&config.default_model_version).to_string()],
        platform: config.platform.clone(),
        inputs,
        outputs,
        parameters,
    })
}

/// Names must be unique within one side of the signature.
fn translate_fields(fields: &[SignatureField]) -> ServingResult<Vec<TensorMetadata>> {
    let mut seen = HashSet::with_capacity(fields.len());
    fields
        .iter()
        .map(|field| {
            if !seen.insert(field.name.as_str()) {
                return Err(ServingError::DuplicateField {
                    field: field.name.clone(),
                });
            }
            translate_field(field)
        })
        .collect()
}

fn translate_field(field: &SignatureField) -> ServingResult<TensorMetadata> {
    let declared = &field.declared_type;
    let entry = lookup_foreign_type(declared.kind(), declared.type_name()).ok_or_else(|| {
        ServingError::UnsupportedSignatureType {
            field: field.name.clone(),
            declared_type: declared.type_name().to_string(),
        }
    })?;

    let shape = match declared {
        ForeignType::Column(_) => vec![-1],
        ForeignType::Tensor { shape, .. } => shape.clone(),
    };
    let content_type = field.content_type.as_deref().unwrap_or(entry.content_type);
    Ok(TensorMetadata::new(&field.name, entry.data_type, shape).with_content_type(content_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("boolean", DataType::Bool, "array")]
    #[case("integer", DataType::Int32, "array")]
    #[case("long", DataType::Int64, "array")]
    #[case("float", DataType::Fp32, "array")]
    #[case("double", DataType::Fp64, "array")]
    #[case("string", DataType::Bytes, "str")]
    #[case("binary", DataType::Bytes, "base64")]
    fn test_column_types(
        #[case] type_name: &str,
        #[case] data_type: DataType,
        #[case] content_type: &str,
    ) {
        let field = SignatureField::column("x", type_name);
        let metadata = translate_field(&field).unwrap();
        assert_eq!(metadata.data_type, data_type);
        assert_eq!(metadata.shape, vec![-1]);
        assert_eq!(metadata.parameters.content_type(), Some(content_type));
    }

    #[rstest]
    #[case("float16", DataType::Fp16)]
    #[case("uint32", DataType::Uint32)]
    #[case("int8", DataType::Int8)]
    #[case("object", DataType::Bytes)]
    fn test_tensor_types_keep_shape(#[case] dtype: &str, #[case] data_type: DataType) {
        let field = SignatureField::tensor("t", dtype, vec![-1, 28, 28]);
        let metadata = translate_field(&field).unwrap();
        assert_eq!(metadata.data_type, data_type);
        assert_eq!(metadata.shape, vec![-1, 28, 28]);
        assert_eq!(metadata.parameters.content_type(), Some("array"));
    }

    #[test]
    fn test_content_type_override() {
        let field = SignatureField::column("s", "string").with_content_type("raw");
        let metadata = translate_field(&field).unwrap();
        assert_eq!(metadata.parameters.content_type(), Some("raw"));
    }

    #[test]
    fn test_column_and_tensor_names_do_not_mix() {
        // "double" is a column type, "float64" a tensor dtype
        assert!(lookup_foreign_type(ForeignKind::Tensor, "double").is_none());
        assert!(lookup_foreign_type(ForeignKind::Column, "float64").is_none());
    }

    #[test]
    fn test_translation_is_atomic() {
        let signature = ForeignSignature::new(
            vec![
                SignatureField::column("ok", "double"),
                SignatureField::column("when", "datetime"),
            ],
            vec![],
        );
        let err = translate_signature("m", None, &signature, &ServingConfig::default()).unwrap_err();
        assert_matches!(
            err,
            ServingError::UnsupportedSignatureType { field, declared_type }
                if field == "when" && declared_type == "datetime"
        );
    }

    #[test]
    fn test_duplicate_field_names() {
        let signature = ForeignSignature::new(
            vec![
                SignatureField::column("a", "double"),
                SignatureField::column("a", "long"),
            ],
            vec![],
        );
        assert_matches!(
            translate_signature("m", None, &signature, &ServingConfig::default()),
            Err(ServingError::DuplicateField { field }) if field == "a"
        );

        // an output may share the name of an input
        let signature = ForeignSignature::new(
            vec![SignatureField::tensor("x", "float32", vec![-1])],
            vec![SignatureField::tensor("x", "float32", vec![-1])],
        );
        assert!(translate_signature("m", None, &signature, &ServingConfig::default()).is_ok());
    }

    #[test]
    fn test_grouping() {
        let columns = ForeignSignature::new(vec![SignatureField::column("x", "double")], vec![]);
        assert_eq!(columns.grouping(), Grouping::Columnar);

        let tensors = ForeignSignature::new(
            vec![SignatureField::tensor("x", "float32", vec![-1])],
            vec![],
        );
        assert_eq!(tensors.grouping(), Grouping::Tensor);
        assert_eq!(ForeignSignature::default().grouping(), Grouping::Tensor);

        let forced = columns.clone().with_grouping(Grouping::Tensor);
        let metadata = translate_signature("m", Some("3"), &forced, &ServingConfig::default()).unwrap();
        assert!(metadata.content_type().is_none());
        assert_eq!(metadata.versions, vec!["3".to_string()]);
    }

    #[test]
    fn test_from_mlflow() {
        let inputs = json!(
            "[{\"name\": \"age\", \"type\": \"long\"}, {\"name\": \"city\", \"type\": \"string\"}]"
        );
        let outputs = json!([
            {"type": "tensor", "tensor-spec": {"dtype": "float64", "shape": [-1]}}
        ]);
        let signature = ForeignSignature::from_mlflow(&inputs, Some(&outputs)).unwrap();
        assert_eq!(signature.inputs[1], SignatureField::column("city", "string"));
        assert_eq!(
            signature.outputs[0],
            SignatureField::tensor("output-0", "float64", vec![-1])
        );
        assert_eq!(signature.grouping(), Grouping::Columnar);

        let bad = json!([{"name": "t", "type": "tensor"}]);
        assert_matches!(
            ForeignSignature::from_mlflow(&bad, None),
            Err(ServingError::InvalidPayload { .. })
        );
    }

    #[test]
    fn test_signature_field_json() {
        let field = SignatureField::tensor("img", "uint8", vec![-1, 3]).with_content_type("raw");
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(
            json,
            json!({
                "name": "img",
                "type": "tensor",
                "tensor-spec": {"dtype": "uint8", "shape": [-1, 3]},
                "content_type": "raw"
            })
        );
        assert_eq!(serde_json::from_value::<SignatureField>(json).unwrap(), field);
    }
}
