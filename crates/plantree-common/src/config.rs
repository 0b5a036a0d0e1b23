// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use crate::api::error::{PlanError, Result};
use std::fmt;
use std::str::FromStr;

/// How the `execution_method` metadata is rendered in a node title.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMethodFormat {
    /// Prints `execution_method` as an ordinary metadata field.
    #[default]
    Raw,
    /// Prints `execution_method` after the operator name in angle brackets, like `Scan <Row>`.
    Angle,
}

impl FromStr for ExecutionMethodFormat {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RAW" => Ok(Self::Raw),
            "ANGLE" => Ok(Self::Angle),
            _ => Err(PlanError::format_parse(
                "ExecutionMethodFormat",
                "RAW or ANGLE",
                s,
            )),
        }
    }
}

impl fmt::Display for ExecutionMethodFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("RAW"),
            Self::Angle => f.write_str("ANGLE"),
        }
    }
}

/// How target metadata (`scan_target`, `distribution_table` and `table`) is rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetMetadataFormat {
    /// Prints target metadata as ordinary fields.
    #[default]
    Raw,
    /// Prints target metadata in the operator clause as `on <target>`.
    On,
}

impl FromStr for TargetMetadataFormat {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RAW" => Ok(Self::Raw),
            "ON" => Ok(Self::On),
            _ => Err(PlanError::format_parse(
                "TargetMetadataFormat",
                "RAW or ON",
                s,
            )),
        }
    }
}

impl fmt::Display for TargetMetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("RAW"),
            Self::On => f.write_str("ON"),
        }
    }
}

/// How known boolean flags (`Full scan`, `split_ranges_aligned`) are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KnownFlagFormat {
    /// Prints known flags as `key: value` fields.
    #[default]
    Raw,
    /// Prints the bare key when the flag is true and omits it otherwise.
    Label,
}

impl FromStr for KnownFlagFormat {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RAW" => Ok(Self::Raw),
            "LABEL" => Ok(Self::Label),
            _ => Err(PlanError::format_parse(
                "KnownFlagFormat",
                "RAW or LABEL",
                s,
            )),
        }
    }
}

impl fmt::Display for KnownFlagFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("RAW"),
            Self::Label => f.write_str("LABEL"),
        }
    }
}

/// Formatting options for a single node title.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TitleFormat {
    pub execution_method: ExecutionMethodFormat,
    pub target_metadata: TargetMetadataFormat,
    pub known_flag: KnownFlagFormat,

    /// Removes the spaces separating title parts (default: false)
    pub compact: bool,

    /// Hides every metadata label and field, even under `KnownFlagFormat::Label` (default: false)
    pub hide_metadata: bool,
}

/// Glyphs used to draw tree branches in front of each rendered line.
///
/// None of the glyphs may contain a NUL byte, a tab, or a newline: those
/// characters delimit the per-node payloads passed through the tree renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeStyle {
    /// Vertical line continuing past a non-last sibling (default: `|`)
    pub edge_link: String,

    /// Edge in front of a non-last child (default: `+-`)
    pub edge_mid: String,

    /// Edge in front of the last child (default: `+-`)
    pub edge_end: String,

    /// Spaces following `edge_link` on each nesting level (default: 2)
    pub indent_size: usize,

    /// Separator between an edge and the node text (default: a single space)
    pub edge_separator: String,
}

impl Default for TreeStyle {
    fn default() -> Self {
        Self {
            edge_link: "|".to_string(),
            edge_mid: "+-".to_string(),
            edge_end: "+-".to_string(),
            indent_size: 2,
            edge_separator: " ".to_string(),
        }
    }
}

impl TreeStyle {
    /// The narrowest style: one-character edges and no indentation.
    #[must_use]
    pub fn compact() -> Self {
        Self {
            edge_link: "|".to_string(),
            edge_mid: "+".to_string(),
            edge_end: "+".to_string(),
            indent_size: 0,
            edge_separator: String::new(),
        }
    }

    /// Checks that no glyph contains a payload delimiter.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("edge_link", &self.edge_link),
            ("edge_mid", &self.edge_mid),
            ("edge_end", &self.edge_end),
            ("edge_separator", &self.edge_separator),
        ];
        for (field, glyph) in fields {
            if let Some(character) = glyph.chars().find(|c| matches!(c, '\0' | '\t' | '\n')) {
                return Err(PlanError::InvalidTreeStyle { field, character });
            }
        }
        Ok(())
    }
}

/// Everything one render call needs, apart from the inline stats callback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderConfig {
    pub title: TitleFormat,
    pub tree: TreeStyle,

    /// Display width at which node text is wrapped; 0 disables wrapping (default: 0)
    pub wrap_width: usize,

    /// Fail on execution stats fields the stats model does not declare (default: false)
    pub disallow_unknown_stats: bool,
}

impl RenderConfig {
    /// Switches both node titles and tree glyphs to their compact form.
    #[must_use]
    pub fn compact(mut self) -> Self {
        self.title.compact = true;
        self.tree = TreeStyle::compact();
        self
    }

    #[must_use]
    pub fn with_wrap_width(mut self, width: usize) -> Self {
        self.wrap_width = width;
        self
    }

    #[must_use]
    pub fn disallow_unknown_stats(mut self, disallow: bool) -> Self {
        self.disallow_unknown_stats = disallow;
        self
    }

    /// Separator placed between title parts.
    pub fn separator(&self) -> &'static str {
        if self.title.compact { "" } else { " " }
    }
}
