// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

pub mod api {
    pub mod error;
}

pub mod config;

// Re-exports for convenience
pub use api::error::{PlanError, Result};
pub use config::{
    ExecutionMethodFormat, KnownFlagFormat, RenderConfig, TargetMetadataFormat, TitleFormat,
    TreeStyle,
};
