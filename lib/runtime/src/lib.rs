// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tensorgate runtime
//!
//! Ambient services shared by the serving crates: configuration loading and logging setup.

pub use anyhow::{
    Context as ErrorContext, Error, Ok as OK, Result, anyhow as error, bail as raise,
};

pub mod config;
pub mod logging;

pub use config::{ServingConfig, ServingConfigBuilder, environment_names};
