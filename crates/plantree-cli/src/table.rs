// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use crate::template::Template;
use anyhow::{Context, Result, bail};
use plantree::plan::{InlineStatsFn, PlanNode};
use plantree::{RowWithPredicates, stats};
use prettytable::format::{self, FormatBuilder, LinePosition, LineSeparator};
use prettytable::{Cell, Row, Table};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

/// Which section follows the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrintMode {
    /// Predicates of each row.
    #[default]
    Predicates,
    /// Scalar operands grouped by link type, skipping untyped links.
    Typed,
    /// Scalar operands grouped by link type, including untyped links.
    Full,
}

impl FromStr for PrintMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "predicates" => Ok(Self::Predicates),
            "typed" => Ok(Self::Typed),
            "full" => Ok(Self::Full),
            _ => bail!("unknown print mode: {}", s),
        }
    }
}

/// Whether a column is rendered as a `Name=value` label inside the operator title.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InlineType {
    /// Inlined under `--inline-stats`, except for the `ID` and `Operator` columns.
    #[default]
    Unspecified,
    Never,
    Always,
    /// Inlined under `--inline-stats`.
    Can,
}

impl FromStr for InlineType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NEVER" => Ok(Self::Never),
            "ALWAYS" => Ok(Self::Always),
            "CAN" => Ok(Self::Can),
            _ => bail!("inline type must be one of ALWAYS, CAN, NEVER, but: {}", s),
        }
    }
}

impl TryFrom<String> for InlineType {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnAlignment {
    Right,
    Left,
    Center,
    Default,
    #[default]
    None,
}

impl FromStr for ColumnAlignment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.strip_prefix("ALIGN_").unwrap_or(s) {
            "RIGHT" => Ok(Self::Right),
            "LEFT" => Ok(Self::Left),
            "CENTER" => Ok(Self::Center),
            "DEFAULT" => Ok(Self::Default),
            "NONE" => Ok(Self::None),
            _ => bail!("unknown alignment: {}", s),
        }
    }
}

impl TryFrom<String> for ColumnAlignment {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ColumnAlignment> for format::Alignment {
    fn from(alignment: ColumnAlignment) -> Self {
        match alignment {
            ColumnAlignment::Right => format::Alignment::RIGHT,
            ColumnAlignment::Center => format::Alignment::CENTER,
            ColumnAlignment::Left | ColumnAlignment::Default | ColumnAlignment::None => {
                format::Alignment::LEFT
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnRenderDef {
    pub name: String,
    pub template: Template,
    pub alignment: ColumnAlignment,
    pub inline: InlineType,
}

impl ColumnRenderDef {
    fn new(
        name: &str,
        template: &str,
        alignment: ColumnAlignment,
        inline: InlineType,
    ) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            template: Template::parse(name, template)?,
            alignment,
            inline,
        })
    }

    pub fn should_inline(&self, inline_stats: bool) -> bool {
        match self.inline {
            InlineType::Always => true,
            InlineType::Can => inline_stats,
            InlineType::Unspecified => {
                inline_stats && !matches!(self.name.as_str(), "ID" | "Operator")
            }
            InlineType::Never => false,
        }
    }
}

/// One entry of a custom column file.
#[derive(Debug, Deserialize)]
struct PlainColumnRenderDef {
    name: String,
    template: String,
    #[serde(default)]
    alignment: Option<ColumnAlignment>,
    #[serde(default)]
    inline: Option<InlineType>,
}

impl<'de> Deserialize<'de> for ColumnAlignment {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::try_from(s).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for InlineType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::try_from(s).map_err(serde::de::Error::custom)
    }
}

/// The columns of the output table.
#[derive(Clone, Debug)]
pub struct TableRenderDef {
    pub columns: Vec<ColumnRenderDef>,
}

impl TableRenderDef {
    /// `ID` and `Operator`, plus `Rows`, `Exec.` and `Latency` when rendering with stats.
    pub fn default_columns(with_stats: bool) -> Result<Self> {
        let mut columns = vec![
            ColumnRenderDef::new(
                "ID",
                "{{.FormatID}}",
                ColumnAlignment::Right,
                InlineType::Never,
            )?,
            ColumnRenderDef::new(
                "Operator",
                "{{.Text}}",
                ColumnAlignment::Left,
                InlineType::Never,
            )?,
        ];
        if with_stats {
            let stats_columns = [
                ("Rows", "{{.ExecutionStats.Rows.Total}}"),
                ("Exec.", "{{.ExecutionStats.ExecutionSummary.NumExecutions}}"),
                ("Latency", "{{secsToS .ExecutionStats.Latency}}"),
            ];
            for (name, template) in stats_columns {
                columns.push(ColumnRenderDef::new(
                    name,
                    template,
                    ColumnAlignment::Right,
                    InlineType::Unspecified,
                )?);
            }
        }
        Ok(Self { columns })
    }

    /// Parses `<name>:<template>[:<alignment>[:<inline_type>]]` items.
    pub fn from_custom_list(items: &[String]) -> Result<Self> {
        let mut columns = Vec::with_capacity(items.len());
        for item in items {
            let parts: Vec<&str> = item.splitn(4, ':').collect();
            if parts.len() < 2 {
                bail!(
                    "invalid format: must be \"<name>:<template>[:<alignment>[:<inline_type>]]\", but: {}",
                    item
                );
            }

            let alignment = match parts.get(2) {
                Some(s) if !s.is_empty() => s.parse().context("failed on parse alignment")?,
                _ => ColumnAlignment::None,
            };
            let inline = match parts.get(3) {
                Some(s) if !s.is_empty() => s.parse().context("failed on parse inline_type")?,
                _ => InlineType::Unspecified,
            };
            columns.push(ColumnRenderDef::new(parts[0], parts[1], alignment, inline)?);
        }
        Ok(Self { columns })
    }

    /// Parses a YAML list of `{name, template, alignment, inline}` entries.
    pub fn from_custom_file(yaml: &str) -> Result<Self> {
        let defs: Vec<PlainColumnRenderDef> =
            serde_yaml::from_str(yaml).context("invalid custom column file")?;
        let columns = defs
            .into_iter()
            .map(|def| {
                ColumnRenderDef::new(
                    &def.name,
                    &def.template,
                    def.alignment.unwrap_or_default(),
                    def.inline.unwrap_or_default(),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// The columns left in the table once inlined columns moved into the titles.
    pub fn without_inlined(&self, inline_stats: bool) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| !c.should_inline(inline_stats))
                .cloned()
                .collect(),
        }
    }

    /// Title callback rendering inlined columns as `Name=value` labels.
    ///
    /// Columns are evaluated against a row carrying only the node's stats. Nodes
    /// whose stats cannot be extracted get no labels.
    pub fn inline_stats_fn(
        &self,
        disallow_unknown_stats: bool,
        inline_stats: bool,
    ) -> InlineStatsFn {
        let columns: Vec<ColumnRenderDef> = self
            .columns
            .iter()
            .filter(|c| c.should_inline(inline_stats))
            .cloned()
            .collect();

        Arc::new(move |node: &PlanNode| {
            if columns.is_empty() {
                return Vec::new();
            }
            let execution_stats = match stats::extract(node, disallow_unknown_stats) {
                Ok(execution_stats) => execution_stats,
                Err(err) => {
                    tracing::warn!(
                        node_id = node.index,
                        error = %err,
                        "failed to extract execution stats"
                    );
                    return Vec::new();
                }
            };
            let row = RowWithPredicates {
                id: node.index,
                tree_part: String::new(),
                node_text: String::new(),
                predicates: Vec::new(),
                child_links: BTreeMap::new(),
                execution_stats,
            };
            columns
                .iter()
                .filter_map(|c| {
                    let value = c.template.render(&row);
                    (!value.is_empty()).then(|| format!("{}={}", c.name, value))
                })
                .collect()
        })
    }
}

/// Renders the table followed by the predicates or node parameters section.
pub fn print_result(
    def: &TableRenderDef,
    rows: &[RowWithPredicates<'_>],
    mode: PrintMode,
) -> String {
    let mut out = String::new();

    if !rows.is_empty() {
        let mut table = Table::new();
        table.set_format(
            FormatBuilder::new()
                .column_separator('|')
                .borders('|')
                .separators(
                    &[LinePosition::Top, LinePosition::Title, LinePosition::Bottom],
                    LineSeparator::new('-', '+', '+', '+'),
                )
                .padding(1, 1)
                .build(),
        );
        table.set_titles(Row::new(
            def.columns.iter().map(|c| Cell::new(&c.name)).collect(),
        ));
        for row in rows {
            table.add_row(Row::new(
                def.columns
                    .iter()
                    .map(|c| Cell::new_align(&c.template.render(row), c.alignment.into()))
                    .collect(),
            ));
        }
        out.push_str(&table.to_string());
    }

    let id_width = rows
        .iter()
        .map(|r| r.id.to_string().len())
        .max()
        .unwrap_or(0);
    let (title, lines) = match mode {
        PrintMode::Predicates => (
            "Predicates(identified by ID):",
            predicate_lines(rows, id_width),
        ),
        PrintMode::Typed | PrintMode::Full => (
            "Node Parameters(identified by ID):",
            parameter_lines(rows, id_width, mode == PrintMode::Full),
        ),
    };
    if !lines.is_empty() {
        out.push_str(title);
        out.push('\n');
        for line in lines {
            out.push(' ');
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// `"<id>:"` for the first line of a row, blanks of the same width afterwards.
fn line_prefix(id: u32, id_width: usize, first: bool) -> String {
    if first {
        format!("{:>width$}:", id, width = id_width)
    } else {
        " ".repeat(id_width + 1)
    }
}

fn predicate_lines(rows: &[RowWithPredicates<'_>], id_width: usize) -> Vec<String> {
    rows.iter()
        .flat_map(|row| {
            row.predicates
                .iter()
                .enumerate()
                .map(move |(i, predicate)| {
                    format!("{} {}", line_prefix(row.id, id_width, i == 0), predicate)
                })
        })
        .collect()
}

fn parameter_lines(
    rows: &[RowWithPredicates<'_>],
    id_width: usize,
    include_untyped: bool,
) -> Vec<String> {
    let mut lines = Vec::new();
    for row in rows {
        let mut emitted = 0;
        for (link_type, links) in &row.child_links {
            if link_type.is_empty() && !include_untyped {
                continue;
            }
            let operands = links
                .iter()
                .map(|resolved| match resolved.child_link.variable.as_deref() {
                    Some(variable) if !variable.is_empty() => {
                        format!("${}={}", variable, resolved.child.description())
                    }
                    _ => resolved.child.description().to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            if operands.is_empty() {
                continue;
            }

            let type_part = if link_type.is_empty() {
                String::new()
            } else {
                format!("{}: ", link_type)
            };
            lines.push(format!(
                "{} {}{}",
                line_prefix(row.id, id_width, emitted == 0),
                type_part,
                operands
            ));
            emitted += 1;
        }
    }
    lines
}
