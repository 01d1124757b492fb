// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use half::f16;
use ndarray::{ArrayD, IxDyn, ShapeError};

use super::{DomainValue, InputCodec, content_type};
use crate::error::{ServingError, ServingResult};
use crate::protocols::tensor::{DataType, FlattenTensor, Tensor};

/// N-dimensional array, one variant per [`DataType`].
#[derive(Debug, Clone, PartialEq)]
pub enum NdArray {
    Bool(ArrayD<bool>),
    Uint8(ArrayD<u8>),
    Uint16(ArrayD<u16>),
    Uint32(ArrayD<u32>),
    Uint64(ArrayD<u64>),
    Int8(ArrayD<i8>),
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Fp16(ArrayD<f16>),
    Fp32(ArrayD<f32>),
    Fp64(ArrayD<f64>),
    Bytes(ArrayD<Vec<u8>>),
}

macro_rules! with_array {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            NdArray::Bool($array) => $body,
            NdArray::Uint8($array) => $body,
            NdArray::Uint16($array) => $body,
            NdArray::Uint32($array) => $body,
            NdArray::Uint64($array) => $body,
            NdArray::Int8($array) => $body,
            NdArray::Int16($array) => $body,
            NdArray::Int32($array) => $body,
            NdArray::Int64($array) => $body,
            NdArray::Fp16($array) => $body,
            NdArray::Fp32($array) => $body,
            NdArray::Fp64($array) => $body,
            NdArray::Bytes($array) => $body,
        }
    };
}

impl NdArray {
    /// Reshapes a flat row-major buffer.
    pub fn from_flat(shape: &[usize], data: FlattenTensor) -> Result<NdArray, ShapeError> {
        let dim = IxDyn(shape);
        let array = match data {
            FlattenTensor::Bool(v) => NdArray::Bool(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Uint8(v) => NdArray::Uint8(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Uint16(v) => NdArray::Uint16(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Uint32(v) => NdArray::Uint32(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Uint64(v) => NdArray::Uint64(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Int8(v) => NdArray::Int8(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Int16(v) => NdArray::Int16(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Int32(v) => NdArray::Int32(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Int64(v) => NdArray::Int64(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Fp16(v) => NdArray::Fp16(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Fp32(v) => NdArray::Fp32(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Fp64(v) => NdArray::Fp64(ArrayD::from_shape_vec(dim, v)?),
            FlattenTensor::Bytes(v) => NdArray::Bytes(ArrayD::from_shape_vec(dim, v)?),
        };
        Ok(array)
    }

    /// Flattens the array in row-major order, whatever its memory layout.
    pub fn to_flat(&self) -> FlattenTensor {
        match self {
            NdArray::Bool(a) => FlattenTensor::Bool(a.iter().copied().collect()),
            NdArray::Uint8(a) => FlattenTensor::Uint8(a.iter().copied().collect()),
            NdArray::Uint16(a) => FlattenTensor::Uint16(a.iter().copied().collect()),
            NdArray::Uint32(a) => FlattenTensor::Uint32(a.iter().copied().collect()),
            NdArray::Uint64(a) => FlattenTensor::Uint64(a.iter().copied().collect()),
            NdArray::Int8(a) => FlattenTensor::Int8(a.iter().copied().collect()),
            NdArray::Int16(a) => FlattenTensor::Int16(a.iter().copied().collect()),
            NdArray::Int32(a) => FlattenTensor::Int32(a.iter().copied().collect()),
            NdArray::Int64(a) => FlattenTensor::Int64(a.iter().copied().collect()),
            NdArray::Fp16(a) => FlattenTensor::Fp16(a.iter().copied().collect()),
            NdArray::Fp32(a) => FlattenTensor::Fp32(a.iter().copied().collect()),
            NdArray::Fp64(a) => FlattenTensor::Fp64(a.iter().copied().collect()),
            NdArray::Bytes(a) => FlattenTensor::Bytes(a.iter().cloned().collect()),
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            NdArray::Bool(_) => DataType::Bool,
            NdArray::Uint8(_) => DataType::Uint8,
            NdArray::Uint16(_) => DataType::Uint16,
            NdArray::Uint32(_) => DataType::Uint32,
            NdArray::Uint64(_) => DataType::Uint64,
            NdArray::Int8(_) => DataType::Int8,
            NdArray::Int16(_) => DataType::Int16,
            NdArray::Int32(_) => DataType::Int32,
            NdArray::Int64(_) => DataType::Int64,
            NdArray::Fp16(_) => DataType::Fp16,
            NdArray::Fp32(_) => DataType::Fp32,
            NdArray::Fp64(_) => DataType::Fp64,
            NdArray::Bytes(_) => DataType::Bytes,
        }
    }
}

/// Converts a wire shape into array dimensions, rejecting negative dimensions.
pub(crate) fn dims_of(tensor: &Tensor) -> ServingResult<Vec<usize>> {
    tensor
        .shape()
        .iter()
        .map(|&d| {
            usize::try_from(d).map_err(|_| {
                ServingError::invalid(tensor.name(), format!("negative dimension {d} in shape"))
            })
        })
        .collect()
}

pub(crate) fn wire_shape(dims: &[usize]) -> Vec<i64> {
    dims.iter().map(|&d| d as i64).collect()
}

/// `array` codec: one tensor to one [`NdArray`] of the same shape and datatype.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrayCodec;

impl ArrayCodec {
    pub fn decode_array(&self, tensor: &Tensor) -> ServingResult<NdArray> {
        let dims = dims_of(tensor)?;
        NdArray::from_flat(&dims, tensor.data.clone())
            .map_err(|e| ServingError::invalid(tensor.name(), e.to_string()))
    }

    pub fn encode_array(&self, name: &str, array: &NdArray) -> Tensor {
        Tensor::new(name, wire_shape(array.shape()), array.to_flat())
    }
}

impl InputCodec for ArrayCodec {
    fn content_type(&self) -> &'static str {
        content_type::ARRAY
    }

    fn can_encode(&self, value: &DomainValue) -> bool {
        matches!(value, DomainValue::Array(_))
    }

    fn encode(&self, name: &str, value: &DomainValue) -> ServingResult<Tensor> {
        match value {
            DomainValue::Array(array) => Ok(self.encode_array(name, array)),
            other => Err(ServingError::IncompatibleValue {
                content_type: self.content_type().to_string(),
                value_kind: other.kind().to_string(),
            }),
        }
    }

    fn decode(&self, tensor: &Tensor) -> ServingResult<DomainValue> {
        self.decode_array(tensor).map(DomainValue::Array)
    }
}
