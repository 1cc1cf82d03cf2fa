//! Builds a directory hierarchy out of a flat list of object paths.
//!
//! [`PathTree`] is the plain nested mapping (segment name to file or sub-directory).
//! [`TreeView`] is the form the UI works with: an arena of nodes with parent links,
//! each carrying the full [`ObjectPath`] it was built from. It renders as egui
//! collapsing headers and serializes to nested HTML tree markup.

use crate::{ObjectPath, SEPARATOR, escape_html};
use egui::{CollapsingHeader, Ui};
use indexmap::IndexMap;

/// Icon shown in front of directory names.
const FOLDER_ICON: &str = "📁";

/// Nested mapping from segment name to `None` (a file) or `Some(PathTree)` (a directory).
///
/// Entries keep the order in which their names were first seen. Re-inserting an
/// existing name changes its value in place and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTree {
    entries: IndexMap<String, Option<PathTree>>,
}

impl PathTree {
    /// Builds a tree from bucket-relative paths (`a/x.csv`, `z.json`, ...).
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = PathTree::default();
        for path in paths {
            let segments: Vec<&str> = path.as_ref().split(SEPARATOR).collect();
            tree.insert(&segments);
        }
        tree
    }

    /// Builds a tree from object paths, using their segments directly.
    pub fn from_object_paths<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a ObjectPath>,
    {
        let mut tree = PathTree::default();
        for path in paths {
            tree.insert(path.segments());
        }
        tree
    }

    /// Inserts one path given as its segments.
    ///
    /// Intermediate segments become directories (a file of the same name is
    /// replaced); the final segment becomes a file even if a directory of that
    /// name already exists. Inputs where one path is a prefix of another are
    /// outside the supported domain: the outcome depends on insertion order.
    pub fn insert<S: AsRef<str>>(&mut self, segments: &[S]) {
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = self;
        for segment in parents {
            current = current.slot(segment.as_ref()).get_or_insert_with(PathTree::default);
        }
        *current.slot(last.as_ref()) = None;
    }

    /// Returns the value stored under `name`, inserting an empty directory first if absent.
    fn slot(&mut self, name: &str) -> &mut Option<PathTree> {
        let index = match self.entries.get_index_of(name) {
            Some(index) => index,
            None => {
                self.entries
                    .insert_full(name.to_string(), Some(PathTree::default()))
                    .0
            }
        };
        &mut self.entries[index]
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&PathTree>)> {
        self.entries
            .iter()
            .map(|(name, child)| (name.as_str(), child.as_ref()))
    }

    pub fn get(&self, name: &str) -> Option<Option<&PathTree>> {
        self.entries.get(name).map(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Serializes the tree as markup, with paths resolved under `bucket`.
    pub fn to_markup(&self, bucket: &str) -> String {
        TreeView::build(bucket, self).to_markup()
    }
}

/// Index of a node inside a [`TreeView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// One rendered tree item.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// The segment name shown for this item.
    pub label: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Full path of the item, attached when the view is built.
    pub path: ObjectPath,
}

/// Arena representation of a [`PathTree`] for one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeView {
    bucket: String,
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
}

impl TreeView {
    /// Flattens `tree` into an arena, visiting entries in their stored order.
    pub fn build(bucket: &str, tree: &PathTree) -> Self {
        let mut view = TreeView {
            bucket: bucket.to_string(),
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        view.push_entries(tree, None, &[]);
        view
    }

    fn push_entries(&mut self, tree: &PathTree, parent: Option<NodeId>, prefix: &[String]) {
        for (name, child) in tree.entries() {
            let mut segments = prefix.to_vec();
            segments.push(name.to_string());

            let id = NodeId(self.nodes.len());
            self.nodes.push(TreeNode {
                label: name.to_string(),
                kind: if child.is_some() {
                    NodeKind::Directory
                } else {
                    NodeKind::File
                },
                parent,
                children: Vec::new(),
                path: ObjectPath::new(&self.bucket, segments.clone()),
            });

            match parent {
                Some(parent) => self.nodes[parent.0].children.push(id),
                None => self.roots.push(id),
            }

            if let Some(subtree) = child {
                self.push_entries(subtree, Some(id), &segments);
            }
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All file nodes, in document order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind == NodeKind::File)
            .map(|(index, _)| NodeId(index))
    }

    /// Finds the node whose stored path equals `path`.
    pub fn find(&self, path: &ObjectPath) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| &node.path == path)
            .map(NodeId)
    }

    /// Serializes the view as nested tree markup.
    ///
    /// Files become a single tree item holding their name (and their full path as a
    /// `data-path` attribute). Directories become a tree item holding a folder icon
    /// marker, their name and their serialized children. Children appear in entry
    /// order, not sorted.
    pub fn to_markup(&self) -> String {
        let mut markup = String::from("<div class=\"tree\" role=\"tree\">\n");
        for &id in &self.roots {
            self.write_node(&mut markup, id, 1);
        }
        markup.push_str("</div>\n");
        markup
    }

    fn write_node(&self, markup: &mut String, id: NodeId, depth: usize) {
        let node = &self.nodes[id.0];
        let indent = "  ".repeat(depth);
        let label = escape_html(&node.label);

        match node.kind {
            NodeKind::File => {
                markup.push_str(&format!(
                    "{indent}<div class=\"tree-item\" role=\"treeitem\" data-path=\"{}\">{label}</div>\n",
                    escape_html(&node.path.to_string())
                ));
            }
            NodeKind::Directory => {
                markup.push_str(&format!(
                    "{indent}<div class=\"tree-item\" role=\"treeitem\">\n"
                ));
                markup.push_str(&format!(
                    "{indent}  <span class=\"icon\" data-icon=\"folder\"></span>\n"
                ));
                markup.push_str(&format!("{indent}  {label}\n"));
                for &child in &node.children {
                    self.write_node(markup, child, depth + 1);
                }
                markup.push_str(&format!("{indent}</div>\n"));
            }
        }
    }

    /// Renders the tree with directories as collapsing headers and files as selectable labels.
    ///
    /// ### Returns
    /// The file node clicked during this frame, if any.
    pub fn render(&self, ui: &mut Ui, selected: Option<NodeId>) -> Option<NodeId> {
        let mut clicked = None;
        for &id in &self.roots {
            self.render_node(ui, id, selected, &mut clicked);
        }
        clicked
    }

    fn render_node(
        &self,
        ui: &mut Ui,
        id: NodeId,
        selected: Option<NodeId>,
        clicked: &mut Option<NodeId>,
    ) {
        let node = &self.nodes[id.0];
        match node.kind {
            NodeKind::Directory => {
                CollapsingHeader::new(format!("{FOLDER_ICON} {}", node.label))
                    .id_salt(("tree_item", id.0))
                    .show(ui, |ui| {
                        for &child in &node.children {
                            self.render_node(ui, child, selected, clicked);
                        }
                    });
            }
            NodeKind::File => {
                let response = ui
                    .selectable_label(selected == Some(id), node.label.as_str())
                    .on_hover_text(node.path.to_string());
                if response.clicked() {
                    *clicked = Some(id);
                }
            }
        }
    }
}
