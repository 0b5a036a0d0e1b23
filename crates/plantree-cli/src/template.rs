// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Column templates: literal text with `{{.Field}}` and `{{secsToS .Field}}` placeholders.

use anyhow::{Result, anyhow, bail};
use plantree::{ExecutionStats, RowWithPredicates};
use regex::Regex;
use std::sync::OnceLock;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
static SECS_RE: OnceLock<Regex> = OnceLock::new();

const STATS_PREFIX: &str = "ExecutionStats.";

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"\{\{\s*(?:(\w+)\s+)?\.([A-Za-z][A-Za-z0-9_.]*)\s*\}\}").expect("valid regex")
    })
}

/// Shortens a trailing `secs` unit to `s`, e.g. `1.92 msecs` to `1.92 ms`.
pub fn secs_to_s(value: &str) -> String {
    SECS_RE
        .get_or_init(|| Regex::new(r"secs$").expect("valid regex"))
        .replace(value, "s")
        .into_owned()
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Field {
    Id,
    FormatId,
    Text,
    NodeText,
    TreePart,
    Predicates,
    /// Dotted path below `ExecutionStats`, e.g. `Rows.Total`.
    Stats(String),
}

impl Field {
    fn parse(path: &str) -> Result<Self> {
        let field = match path {
            "ID" => Self::Id,
            "FormatID" => Self::FormatId,
            "Text" => Self::Text,
            "NodeText" => Self::NodeText,
            "TreePart" => Self::TreePart,
            "Predicates" => Self::Predicates,
            _ => {
                let stats_path = path
                    .strip_prefix(STATS_PREFIX)
                    .ok_or_else(|| anyhow!("unknown field: .{}", path))?;
                if ExecutionStats::default().lookup(stats_path).is_none() {
                    bail!("unknown execution stats field: .{}", path);
                }
                Self::Stats(stats_path.to_string())
            }
        };
        Ok(field)
    }

    fn resolve(&self, row: &RowWithPredicates<'_>) -> String {
        match self {
            Self::Id => row.id.to_string(),
            Self::FormatId => row.format_id(),
            Self::Text => row.text(),
            Self::NodeText => row.node_text.clone(),
            Self::TreePart => row.tree_part.clone(),
            Self::Predicates => row.predicates.join(", "),
            Self::Stats(path) => row.execution_stats.lookup(path).unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { field: Field, shorten_secs: bool },
}

/// A parsed column template. Every placeholder is checked at parse time, so
/// rendering cannot fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut last = 0;
        for captures in placeholder_re().captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            push_literal(&mut segments, name, &text[last..whole.start()])?;
            last = whole.end();

            let shorten_secs = match captures.get(1).map(|m| m.as_str()) {
                None => false,
                Some("secsToS") => true,
                Some(function) => bail!("template {}: function {:?} not defined", name, function),
            };
            let path = captures.get(2).map_or("", |m| m.as_str());
            let field = Field::parse(path).map_err(|e| anyhow!("template {}: {}", name, e))?;
            segments.push(Segment::Field {
                field,
                shorten_secs,
            });
        }
        push_literal(&mut segments, name, &text[last..])?;
        Ok(Self { segments })
    }

    pub fn render(&self, row: &RowWithPredicates<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    field,
                    shorten_secs,
                } => {
                    let value = field.resolve(row);
                    if *shorten_secs {
                        out.push_str(&secs_to_s(&value));
                    } else {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

fn push_literal(segments: &mut Vec<Segment>, name: &str, text: &str) -> Result<()> {
    if text.contains("{{") || text.contains("}}") {
        bail!("template {}: unsupported action in {:?}", name, text);
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}
