// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanError {
    #[error("plan nodes cannot be empty")]
    EmptyInput,

    /// A node's declared index does not match its position in the node list.
    #[error("plan node at position {position} declares index {declared}")]
    IndexMismatch { position: usize, declared: u32 },

    /// A child link points outside the node list.
    #[error("plan node {parent} links to child {child}, but the plan has only {len} nodes")]
    DanglingChildLink { parent: u32, child: u32, len: usize },

    /// A child link leads back to the linking node or one of its ancestors.
    #[error("plan node {parent} links to child {child}, which closes a cycle")]
    CyclicPlan { parent: u32, child: u32 },

    #[error("failed to encode {what} of plan node {node_index}: {source}")]
    Encoding {
        what: &'static str,
        node_index: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected tree line format ({reason}), tree line = {fragment:?}")]
    Decode { reason: String, fragment: String },

    #[error("failed to decode execution stats of plan node {node_index}: {message}")]
    StatsDecode { node_index: u32, message: String },

    #[error("invalid {kind}, expect {expected}: {value}")]
    FormatParse {
        kind: &'static str,
        expected: &'static str,
        value: String,
    },

    /// Tree glyphs must never contain the characters used as payload delimiters.
    #[error("invalid tree style: {field} contains {character:?}")]
    InvalidTreeStyle {
        field: &'static str,
        character: char,
    },

    #[error("invalid plan input: {message}")]
    Input { message: String },
}

impl PlanError {
    pub fn format_parse(
        kind: &'static str,
        expected: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::FormatParse {
            kind,
            expected,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
