//! Reconstructs the full object path of a tree item by walking its ancestors.

use crate::{NodeId, ObjectPath, TreeView};
use std::collections::VecDeque;

/// Rebuilds the [`ObjectPath`] of `node` from the labels on its ancestor chain.
///
/// ### Logic
/// 1. The node's own label, trimmed, is the last segment.
/// 2. Walk to the enclosing tree item, then its enclosing item, and so on.
/// 3. Prepend each ancestor's own label (trimmed, without its children) to the segment list.
/// 4. Stop at the root and prefix the result with the scheme and the view's bucket.
///
/// Returns `None` if `node` is not part of `view`.
///
/// For every leaf of a view built from path `P`, the result equals `P` as long as
/// no segment carries leading or trailing whitespace.
pub fn read_path(view: &TreeView, node: NodeId) -> Option<ObjectPath> {
    let mut segments = VecDeque::new();
    let mut current = view.node(node)?;
    segments.push_front(current.label.trim().to_string());

    while let Some(parent) = current.parent {
        current = view.node(parent)?;
        segments.push_front(current.label.trim().to_string());
    }

    Some(ObjectPath::new(view.bucket(), segments))
}

/// A tree item that contains nested tree items is a directory, never a selectable file.
pub fn is_selectable(view: &TreeView, node: NodeId) -> bool {
    view.node(node)
        .is_some_and(|tree_node| tree_node.children.is_empty())
}

/// Resolves an activated tree item to a file that should be previewed.
///
/// Uses the path stored on the node when the view was built, so labels with
/// surrounding whitespace still resolve to their own object.
///
/// Directories and nodes outside the view yield `None`, as do files whose
/// extension is not one of the queryable data formats (csv, parquet, json).
pub fn activated_file(view: &TreeView, node: NodeId) -> Option<ObjectPath> {
    if !is_selectable(view, node) {
        return None;
    }
    view.node(node)
        .map(|tree_node| tree_node.path.clone())
        .filter(|path| path.extension().is_queryable())
}
