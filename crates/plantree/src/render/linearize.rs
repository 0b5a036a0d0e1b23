// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Depth-first walk turning a plan into a printable [`Tree`] of payloads.
//!
//! The tree printer only sees opaque strings, so each node is encoded as
//!
//! ```text
//! "\n" * title_line_breaks + "\t" + json(title) + "\t" + json(child_link) + "\0"
//! ```
//!
//! The leading newlines make the printer emit one branch-art line per title line.
//! The JSON fields contain no raw tab, newline or NUL, so the printed output can
//! be split back into rows unambiguously; the child link (`null` for the root)
//! identifies the node without relying on its title.

use crate::plan::graph::QueryPlan;
use crate::plan::model::{ChildLink, PlanNode};
use crate::plan::title::{TitleOptions, node_title};
use crate::render::treeprint::Tree;
use crate::render::wrap::{display_width, wrap};
use plantree_common::{PlanError, RenderConfig, Result};
use tracing::trace;

/// Payload terminator; the printer appends a newline after it.
pub(crate) const PAYLOAD_TERMINATOR: char = '\0';

/// Separates the fields of a payload.
pub(crate) const FIELD_SEPARATOR: char = '\t';

pub(crate) struct Linearizer<'a> {
    plan: &'a QueryPlan,
    config: &'a RenderConfig,
    title: TitleOptions,
}

impl<'a> Linearizer<'a> {
    pub(crate) fn new(plan: &'a QueryPlan, config: &'a RenderConfig, title: TitleOptions) -> Self {
        Self {
            plan,
            config,
            title,
        }
    }

    /// Builds the payload tree rooted at the plan root. An invisible root yields an empty tree.
    pub(crate) fn build_tree(&self) -> Result<Tree> {
        let mut tree = Tree::new();
        self.visit(&mut tree, None, 0)?;
        Ok(tree)
    }

    fn visit(&self, tree: &mut Tree, link: Option<&ChildLink>, level: usize) -> Result<()> {
        if !self.plan.is_visible_link(link) {
            return Ok(());
        }

        let node = self.plan.get_node_by_link(link);
        let payload = self.encode_payload(node, link, level)?;
        trace!(node_index = node.index, level, "linearized plan node");

        let children = self.plan.visible_child_links(node);
        let branch = match link {
            None => {
                tree.set_value(payload);
                tree
            }
            Some(_) if !children.is_empty() => tree.add_branch(payload),
            Some(_) => {
                tree.add_node(payload);
                return Ok(());
            }
        };

        for child in children {
            self.visit(branch, Some(child), level + 1)?;
        }
        Ok(())
    }

    /// Display text of a node: optional `[LinkType]` tag, then its title, wrapped if configured.
    fn node_text(&self, node: &PlanNode, link: Option<&ChildLink>, level: usize) -> String {
        let sep = self.config.separator();
        let link_type = link.map_or("", |l| self.plan.get_link_type(l));

        let mut text = String::new();
        if !link_type.is_empty() {
            text.push('[');
            text.push_str(link_type);
            text.push(']');
            text.push_str(sep);
        }
        text.push_str(&node_title(node, &self.title));

        if self.config.wrap_width > 0 {
            let width = wrap_width(self.config, level);
            text = wrap(&text, width);
        }
        text
    }

    fn encode_payload(
        &self,
        node: &PlanNode,
        link: Option<&ChildLink>,
        level: usize,
    ) -> Result<String> {
        let text = self.node_text(node, link, level);

        let text_json = serde_json::to_string(&text).map_err(|source| PlanError::Encoding {
            what: "node text",
            node_index: node.index,
            source,
        })?;
        let link_json = serde_json::to_string(&link).map_err(|source| PlanError::Encoding {
            what: "child link",
            node_index: node.index,
            source,
        })?;

        let line_breaks = text.matches('\n').count();
        let mut payload =
            String::with_capacity(line_breaks + text_json.len() + link_json.len() + 3);
        payload.extend(std::iter::repeat_n('\n', line_breaks));
        payload.push(FIELD_SEPARATOR);
        payload.push_str(&text_json);
        payload.push(FIELD_SEPARATOR);
        payload.push_str(&link_json);
        payload.push(PAYLOAD_TERMINATOR);
        Ok(payload)
    }
}

/// Columns left for the node text at `level` once branch art and the edge separator are drawn.
fn wrap_width(config: &RenderConfig, level: usize) -> usize {
    let art = level * (config.tree.indent_size + 1) + display_width(config.separator());
    config.wrap_width.saturating_sub(art).max(1)
}
