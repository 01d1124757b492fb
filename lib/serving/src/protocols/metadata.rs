// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use validator::Validate;

use super::tensor::{Parameters, ParametersExt, TensorMetadata};

/// Protocol-native description of a model: what the metadata endpoint returns and what
/// requests are validated against.
#[derive(Serialize, Deserialize, Validate, Debug, Clone, PartialEq)]
pub struct MetadataModelResponse {
    #[validate(length(min = 1))]
    pub name: String,
    pub versions: Vec<String>,
    pub platform: String,

    #[validate(nested)]
    pub inputs: Vec<TensorMetadata>,
    #[validate(nested)]
    pub outputs: Vec<TensorMetadata>,

    /// Model-level parameters, `content_type` here is the request-level tag.
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub parameters: Parameters,
}

impl MetadataModelResponse {
    pub fn input(&self, name: &str) -> Option<&TensorMetadata> {
        self.inputs.iter().find(|input| input.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&TensorMetadata> {
        self.outputs.iter().find(|output| output.name == name)
    }

    /// Request-level content type declared for the model, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.parameters.content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::tensor::DataType;
    use serde_json::json;

    #[test]
    fn test_metadata_json_shape() {
        let mut parameters = Parameters::new();
        parameters.set_content_type("dataframe");
        let metadata = MetadataModelResponse {
            name: "iris".to_string(),
            versions: vec!["1".to_string()],
            platform: "tensorgate".to_string(),
            inputs: vec![
                TensorMetadata::new("sepal_length", DataType::Fp64, vec![-1])
                    .with_content_type("array"),
            ],
            outputs: vec![],
            parameters,
        };

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "iris",
                "versions": ["1"],
                "platform": "tensorgate",
                "inputs": [{
                    "name": "sepal_length",
                    "datatype": "FP64",
                    "shape": [-1],
                    "parameters": {"content_type": "array"}
                }],
                "outputs": [],
                "parameters": {"content_type": "dataframe"}
            })
        );
        assert!(metadata.validate().is_ok());
        assert_eq!(metadata.content_type(), Some("dataframe"));
        assert!(metadata.input("sepal_length").is_some());
        assert!(metadata.output("sepal_length").is_none());
    }
}
