// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Contiguous binary payloads for tensors.
//!
//! Fixed-width types are packed little-endian, element after element. BYTES elements are each
//! prefixed by their length as a little-endian `u32`. This is the layout of the protocol's
//! `raw_input_contents` / `raw_output_contents` fields.

use half::f16;

use super::tensor::{DataType, FlattenTensor, Tensor, TensorMetadata};
use crate::error::{ServingError, ServingResult};

impl Tensor {
    /// Builds a tensor from its metadata and a raw payload.
    pub fn from_raw_contents(metadata: TensorMetadata, raw: &[u8]) -> ServingResult<Tensor> {
        let element_count = metadata
            .element_count()
            .ok_or_else(|| ServingError::InvalidPayload {
                field: metadata.name.clone(),
                reason: format!("shape {:?} has no valid element count", metadata.shape),
            })?;
        let data = FlattenTensor::from_raw_bytes(metadata.data_type, &metadata.name, element_count, raw)?;
        Ok(Tensor { metadata, data })
    }

    /// Serializes the tensor data into the raw payload layout.
    pub fn raw_contents(&self) -> Vec<u8> {
        self.data.to_raw_bytes()
    }
}

impl FlattenTensor {
    pub fn from_raw_bytes(
        data_type: DataType,
        name: &str,
        element_count: usize,
        raw: &[u8],
    ) -> ServingResult<FlattenTensor> {
        let data_size = data_type.size();

        // BYTES elements are not fixed size, parse the length prefixes instead
        if data_size == 0 {
            return raw_to_bytes_tensor(name, element_count, raw);
        }

        if raw.len() % data_size != 0 {
            return Err(invalid(
                name,
                format!("raw input length must be a multiple of {data_size}"),
            ));
        } else if raw.len() / data_size != element_count {
            return Err(invalid(
                name,
                format!(
                    "raw input element count does not match expected size, expected {} elements, got {} elements",
                    element_count,
                    raw.len() / data_size
                ),
            ));
        }

        // Vec<u8> can not be reinterpreted as Vec<T> without alignment guarantees, so each
        // element is rebuilt from its little-endian bytes.
        let flat = match data_type {
            DataType::Bool => FlattenTensor::Bool(raw.iter().map(|&b| b != 0).collect()),
            DataType::Uint8 => FlattenTensor::Uint8(raw.to_vec()),
            DataType::Uint16 => FlattenTensor::Uint16(
                raw.chunks_exact(2)
                    .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect(),
            ),
            DataType::Uint32 => FlattenTensor::Uint32(
                raw.chunks_exact(4)
                    .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect(),
            ),
            DataType::Uint64 => FlattenTensor::Uint64(
                raw.chunks_exact(8).map(|chunk| u64::from_le_bytes(le8(chunk))).collect(),
            ),
            DataType::Int8 => FlattenTensor::Int8(raw.iter().map(|&b| b as i8).collect()),
            DataType::Int16 => FlattenTensor::Int16(
                raw.chunks_exact(2)
                    .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect(),
            ),
            DataType::Int32 => FlattenTensor::Int32(
                raw.chunks_exact(4)
                    .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect(),
            ),
            DataType::Int64 => FlattenTensor::Int64(
                raw.chunks_exact(8).map(|chunk| i64::from_le_bytes(le8(chunk))).collect(),
            ),
            DataType::Fp16 => FlattenTensor::Fp16(
                raw.chunks_exact(2)
                    .map(|chunk| f16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect(),
            ),
            DataType::Fp32 => FlattenTensor::Fp32(
                raw.chunks_exact(4)
                    .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect(),
            ),
            DataType::Fp64 => FlattenTensor::Fp64(
                raw.chunks_exact(8).map(|chunk| f64::from_le_bytes(le8(chunk))).collect(),
            ),
            DataType::Bytes => unreachable!("BYTES handled above"),
        };
        Ok(flat)
    }

    pub fn to_raw_bytes(&self) -> Vec<u8> {
        match self {
            FlattenTensor::Bool(data) => data.iter().map(|&b| if b { 1u8 } else { 0u8 }).collect(),
            FlattenTensor::Uint8(data) => data.clone(),
            FlattenTensor::Uint16(data) => data.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            FlattenTensor::Uint32(data) => data.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            FlattenTensor::Uint64(data) => data.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            FlattenTensor::Int8(data) => data.iter().map(|&x| x as u8).collect(),
            FlattenTensor::Int16(data) => data.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            FlattenTensor::Int32(data) => data.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            FlattenTensor::Int64(data) => data.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            FlattenTensor::Fp16(data) => data.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            FlattenTensor::Fp32(data) => data.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            FlattenTensor::Fp64(data) => data.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            FlattenTensor::Bytes(data) => {
                let mut bytes = Vec::new();
                for item in data {
                    let len = item.len() as u32;
                    bytes.extend_from_slice(&len.to_le_bytes());
                    bytes.extend_from_slice(item);
                }
                bytes
            }
        }
    }
}

fn le8(chunk: &[u8]) -> [u8; 8] {
    [
        chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
    ]
}

fn invalid(name: &str, reason: String) -> ServingError {
    ServingError::InvalidPayload {
        field: name.to_string(),
        reason,
    }
}

fn raw_to_bytes_tensor(
    name: &str,
    element_count: usize,
    raw: &[u8],
) -> ServingResult<FlattenTensor> {
    let mut bytes_contents = vec![];
    let mut offset = 0;
    while offset + 4 <= raw.len() {
        let len = u32::from_le_bytes([
            raw[offset],
            raw[offset + 1],
            raw[offset + 2],
            raw[offset + 3],
        ]) as usize;
        offset += 4;
        if offset + len > raw.len() {
            return Err(invalid(
                name,
                "invalid length-prefixed BYTES input, length exceeds raw input size".to_string(),
            ));
        }
        bytes_contents.push(raw[offset..offset + len].to_vec());
        offset += len;
    }
    if offset != raw.len() {
        return Err(invalid(
            name,
            "invalid length-prefixed BYTES input, extra bytes at the end".to_string(),
        ));
    }
    if element_count != bytes_contents.len() {
        return Err(invalid(
            name,
            format!(
                "raw input element count does not match expected size, expected {} elements, got {} elements",
                element_count,
                bytes_contents.len()
            ),
        ));
    }
    Ok(FlattenTensor::Bytes(bytes_contents))
}
