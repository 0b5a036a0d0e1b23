// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Navigation and classification over a flat plan node list.
//!
//! Nodes reference their children by index. [`QueryPlan`] adds the reverse
//! direction (child index to parent index) and the rules deciding which nodes
//! become rows of their own and which child links are predicates.

use crate::plan::model::{ChildLink, PlanNode, PlanNodeKind};
use plantree_common::{PlanError, Result};
use std::collections::HashMap;

/// Display name shared by every scalar function node.
const FUNCTION_DISPLAY_NAME: &str = "Function";

/// Link type surfacing a scalar child as a row of its own.
const SCALAR_LINK_TYPE: &str = "Scalar";

/// A child link paired with the node it points to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedChildLink<'a> {
    pub child_link: &'a ChildLink,
    pub child: &'a PlanNode,
}

/// Immutable view of one query plan.
#[derive(Clone, Debug)]
pub struct QueryPlan {
    plan_nodes: Vec<PlanNode>,
    /// child index -> parent index
    parent_map: HashMap<u32, u32>,
}

impl QueryPlan {
    /// Builds the plan and its parent index in one pass over every child link.
    ///
    /// The node at position `i` must declare index `i`, every child link must
    /// point inside the node list, and no link may lead back to one of its
    /// ancestors. Afterwards all lookups are infallible and every walk ends.
    pub fn new(plan_nodes: Vec<PlanNode>) -> Result<Self> {
        if plan_nodes.is_empty() {
            return Err(PlanError::EmptyInput);
        }

        let len = plan_nodes.len();
        let mut parent_map = HashMap::with_capacity(len);
        for (position, node) in plan_nodes.iter().enumerate() {
            if node.index as usize != position {
                return Err(PlanError::IndexMismatch {
                    position,
                    declared: node.index,
                });
            }
            for link in &node.child_links {
                if link.child_index as usize >= len {
                    return Err(PlanError::DanglingChildLink {
                        parent: node.index,
                        child: link.child_index,
                        len,
                    });
                }
                parent_map.insert(link.child_index, node.index);
            }
        }
        check_acyclic(&plan_nodes)?;

        Ok(Self {
            plan_nodes,
            parent_map,
        })
    }

    pub fn plan_nodes(&self) -> &[PlanNode] {
        &self.plan_nodes
    }

    pub fn root(&self) -> &PlanNode {
        &self.plan_nodes[0]
    }

    /// True only if the root carries execution stats.
    pub fn has_stats(&self) -> bool {
        self.root().execution_stats.is_some()
    }

    pub fn get_node_by_index(&self, index: u32) -> &PlanNode {
        &self.plan_nodes[index as usize]
    }

    pub fn get_node_by_child_link(&self, link: &ChildLink) -> &PlanNode {
        self.get_node_by_index(link.child_index)
    }

    /// Node a link points to, where `None` stands for the root.
    pub fn get_node_by_link(&self, link: Option<&ChildLink>) -> &PlanNode {
        link.map_or_else(|| self.root(), |l| self.get_node_by_child_link(l))
    }

    pub fn get_parent_node_by_child_index(&self, index: u32) -> Option<&PlanNode> {
        self.parent_map
            .get(&index)
            .map(|&parent| self.get_node_by_index(parent))
    }

    pub fn get_parent_node_by_child_link(&self, link: &ChildLink) -> Option<&PlanNode> {
        self.get_parent_node_by_child_index(link.child_index)
    }

    /// A node gets its own row if it is relational or reached through a `Scalar` link.
    pub fn is_visible(&self, link: &ChildLink) -> bool {
        self.get_node_by_child_link(link).kind == PlanNodeKind::Relational
            || link.link_type == SCALAR_LINK_TYPE
    }

    /// Like [`QueryPlan::is_visible`], with `None` standing for the root.
    pub fn is_visible_link(&self, link: Option<&ChildLink>) -> bool {
        match link {
            Some(link) => self.is_visible(link),
            None => self.root().kind == PlanNodeKind::Relational,
        }
    }

    pub fn visible_child_links<'a>(&'a self, node: &'a PlanNode) -> Vec<&'a ChildLink> {
        node.child_links
            .iter()
            .filter(|link| self.is_visible(link))
            .collect()
    }

    pub fn is_function(&self, link: &ChildLink) -> bool {
        self.get_node_by_child_link(link).display_name == FUNCTION_DISPLAY_NAME
    }

    /// Known predicates are `Condition` (Filter, Hash Join), `Seek Condition` and
    /// `Residual Condition` (Filter Scan, Hash Join) and `Split Range` (Distributed Union).
    /// Aggregate functions are functions but not predicates.
    pub fn is_predicate(&self, link: &ChildLink) -> bool {
        self.is_function(link)
            && (link.link_type.ends_with("Condition") || link.link_type == "Split Range")
    }

    /// Type of the link, with the `Apply` input rule applied to untyped links.
    pub fn get_link_type<'a>(&self, link: &'a ChildLink) -> &'a str {
        if !link.link_type.is_empty() {
            return &link.link_type;
        }
        if self.is_apply_input(link) {
            return "Input";
        }
        ""
    }

    /// The untyped first child of an `Apply` operator is its input.
    ///
    /// Apply variants are Cross Apply, Anti Semi Apply, Semi Apply, Outer Apply
    /// and their Distributed counterparts. Naming the first child `Input` matches
    /// the operator documentation. Re-check this if the operator catalog changes.
    fn is_apply_input(&self, link: &ChildLink) -> bool {
        let Some(parent) = self.get_parent_node_by_child_link(link) else {
            return false;
        };
        parent.display_name.ends_with("Apply")
            && parent
                .child_links
                .first()
                .is_some_and(|first| first.child_index == link.child_index)
    }

    pub fn resolve_child_link<'a>(&'a self, link: &'a ChildLink) -> ResolvedChildLink<'a> {
        ResolvedChildLink {
            child_link: link,
            child: self.get_node_by_child_link(link),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Depth-first colouring over every child link; a link to a node still on the
/// current path closes a cycle.
fn check_acyclic(plan_nodes: &[PlanNode]) -> Result<()> {
    let mut marks = vec![Mark::Unvisited; plan_nodes.len()];
    for start in 0..plan_nodes.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::OnPath;
        // (node position, next child link to follow)
        let mut stack = vec![(start, 0usize)];
        while let Some(&(position, next)) = stack.last() {
            let node = &plan_nodes[position];
            let Some(link) = node.child_links.get(next) else {
                marks[position] = Mark::Done;
                stack.pop();
                continue;
            };
            let top = stack.len() - 1;
            stack[top].1 += 1;

            let child = link.child_index as usize;
            match marks[child] {
                Mark::Unvisited => {
                    marks[child] = Mark::OnPath;
                    stack.push((child, 0));
                }
                Mark::OnPath => {
                    return Err(PlanError::CyclicPlan {
                        parent: node.index,
                        child: link.child_index,
                    });
                }
                Mark::Done => {}
            }
        }
    }
    Ok(())
}
