// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Minimal multi-way tree printer.
//!
//! Values are opaque strings. A value spanning several lines keeps its branch
//! art aligned: every line after the first is prefixed with the same columns as
//! the line that opened it, so a continuation line never looks like a sibling.

use plantree_common::TreeStyle;

/// A node of the printable tree. The top-level node is printed without an edge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tree {
    value: Option<String>,
    children: Vec<Tree>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    /// Appends a child that will receive children of its own.
    pub fn add_branch(&mut self, value: impl Into<String>) -> &mut Tree {
        self.children.push(Tree {
            value: Some(value.into()),
            children: Vec::new(),
        });
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn add_node(&mut self, value: impl Into<String>) {
        self.add_branch(value);
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Draws the tree. Every printed value is terminated by a newline.
    pub fn render(&self, style: &TreeStyle) -> String {
        let mut out = String::new();
        if let Some(value) = &self.value {
            out.push_str(value);
            out.push('\n');
        }
        let mut ancestors_last = Vec::new();
        render_children(&self.children, style, &mut ancestors_last, &mut out);
        out
    }
}

fn render_children(
    children: &[Tree],
    style: &TreeStyle,
    ancestors_last: &mut Vec<bool>,
    out: &mut String,
) {
    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == children.len();
        let prefix: String = ancestors_last
            .iter()
            .map(|&last| column(style, last))
            .collect();
        let edge = if is_last {
            &style.edge_end
        } else {
            &style.edge_mid
        };

        let mut lines = child.value.as_deref().unwrap_or("").split('\n');
        out.push_str(&prefix);
        out.push_str(edge);
        out.push_str(&style.edge_separator);
        out.push_str(lines.next().unwrap_or(""));

        let pad = format!("{}{}", prefix, column(style, is_last));
        for line in lines {
            out.push('\n');
            out.push_str(&pad);
            out.push_str(line);
        }
        out.push('\n');

        ancestors_last.push(is_last);
        render_children(&child.children, style, ancestors_last, out);
        ancestors_last.pop();
    }
}

/// One indentation column: blank below a last child, a link line otherwise.
fn column(style: &TreeStyle, last: bool) -> String {
    if last {
        " ".repeat(style.indent_size + 1)
    } else {
        format!("{}{}", style.edge_link, " ".repeat(style.indent_size))
    }
}
