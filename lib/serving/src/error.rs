// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use strum::{Display, IntoStaticStr};

pub type ServingResult<T> = Result<T, ServingError>;

#[derive(Debug, thiserror::Error)]
pub enum ServingError {
    #[error("Unsupported content type '{content_type}'{}", for_field(.field))]
    UnsupportedContentType {
        content_type: String,
        field: Option<String>,
    },

    #[error("Shape mismatch for '{field}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        field: String,
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    #[error("Datatype mismatch for '{field}': expected {expected}, got {actual}")]
    DatatypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    #[error("Missing field: {field}")]
    MissingField { field: String },

    #[error("Duplicate field: {field}")]
    DuplicateField { field: String },

    #[error("Unsupported signature type '{declared_type}' for field '{field}'")]
    UnsupportedSignatureType {
        field: String,
        declared_type: String,
    },

    #[error("Row {row} has {actual} values but there are {expected} columns")]
    ColumnLengthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Request has no columns")]
    EmptyColumnSet,

    #[error("Invalid payload for '{field}': {reason}")]
    InvalidPayload { field: String, reason: String },

    #[error("Codec '{content_type}' can not encode a {value_kind} value")]
    IncompatibleValue {
        content_type: String,
        value_kind: String,
    },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model already loaded: {0}")]
    ModelAlreadyLoaded(String),

    #[error("Model error: {0:#}")]
    Model(#[source] anyhow::Error),
}

/// Coarse classification of a [`ServingError`], stable for logging and for mapping onto
/// transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ServingErrorKind {
    UnsupportedContentType,
    ShapeMismatch,
    DatatypeMismatch,
    UnknownField,
    MissingField,
    DuplicateField,
    UnsupportedSignatureType,
    ColumnLengthMismatch,
    EmptyColumnSet,
    InvalidPayload,
    IncompatibleValue,
    ModelNotFound,
    ModelAlreadyLoaded,
    Model,
}

impl ServingError {
    pub fn kind(&self) -> ServingErrorKind {
        match self {
            Self::UnsupportedContentType { .. } => ServingErrorKind::UnsupportedContentType,
            Self::ShapeMismatch { .. } => ServingErrorKind::ShapeMismatch,
            Self::DatatypeMismatch { .. } => ServingErrorKind::DatatypeMismatch,
            Self::UnknownField { .. } => ServingErrorKind::UnknownField,
            Self::MissingField { .. } => ServingErrorKind::MissingField,
            Self::DuplicateField { .. } => ServingErrorKind::DuplicateField,
            Self::UnsupportedSignatureType { .. } => ServingErrorKind::UnsupportedSignatureType,
            Self::ColumnLengthMismatch { .. } => ServingErrorKind::ColumnLengthMismatch,
            Self::EmptyColumnSet => ServingErrorKind::EmptyColumnSet,
            Self::InvalidPayload { .. } => ServingErrorKind::InvalidPayload,
            Self::IncompatibleValue { .. } => ServingErrorKind::IncompatibleValue,
            Self::ModelNotFound(_) => ServingErrorKind::ModelNotFound,
            Self::ModelAlreadyLoaded(_) => ServingErrorKind::ModelAlreadyLoaded,
            Self::Model(_) => ServingErrorKind::Model,
        }
    }

    /// The offending field, for errors that concern a single named input or output.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnsupportedContentType { field, .. } => field.as_deref(),
            Self::ShapeMismatch { field, .. }
            | Self::DatatypeMismatch { field, .. }
            | Self::UnknownField { field }
            | Self::MissingField { field }
            | Self::DuplicateField { field }
            | Self::UnsupportedSignatureType { field, .. }
            | Self::InvalidPayload { field, .. } => Some(field),
            _ => None,
        }
    }

    /// True for errors caused by the caller's payload rather than by the server or the model.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self.kind(),
            ServingErrorKind::ModelNotFound
                | ServingErrorKind::ModelAlreadyLoaded
                | ServingErrorKind::Model
        )
    }

    pub(crate) fn unsupported(content_type: &str, field: Option<&str>) -> Self {
        Self::UnsupportedContentType {
            content_type: content_type.to_string(),
            field: field.map(str::to_string),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

fn for_field(field: &Option<String>) -> String {
    match field {
        Some(field) => format!(" for field '{field}'"),
        None => String::new(),
    }
}
