//! First-writer-wins construction of picker trees from flat records.
//!
//! The backend hands out flat lists (directory paths, assays with inline
//! ancestor fields) while the pickers want a hierarchy. Records are folded
//! into uniquely-keyed nodes with parent pointers; whichever record first
//! introduces a key fixes that node's text and parent for good, so records
//! that disagree about an ancestor's name cannot relabel it mid-build.

use std::collections::{HashMap, HashSet};

use crate::model::{Assay, DirectoryEntry, Study};
use crate::paths;

/// Sentinel parent identifier of top-level nodes.
pub const ROOT: &str = "#";

/// One level of a record's hierarchy chain, outer to inner. The key is
/// used verbatim as the node identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub key: String,
    pub text: String,
    pub icon: Option<String>,
    pub open: bool,
    pub disabled: bool,
}

impl Level {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            icon: None,
            open: false,
            disabled: false,
        }
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn opened(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// A node as handed to a tree-display widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Unique within the tree; a path or a URL.
    pub id: String,
    /// Identifier of the parent node, or [`ROOT`].
    pub parent: String,
    /// Display text.
    pub text: String,
    /// Icon hint for the widget.
    pub icon: Option<String>,
    /// Whether the widget should render the node expanded.
    pub open: bool,
    /// Whether the widget should refuse to activate the node.
    pub disabled: bool,
}

/// A deduplicated node set plus the identifiers of its selectable leaves.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    index: HashMap<String, usize>,
    leaves: HashSet<String>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one record's hierarchy chain, outer level first. Absent
    /// levels fall back to the nearest defined ancestor, so the leaf always
    /// attaches somewhere. The leaf, when given, joins the selectable set.
    pub fn add_record(&mut self, levels: Vec<Option<Level>>, leaf: Option<Level>) {
        let mut parent = ROOT.to_string();

        for level in levels.into_iter().flatten() {
            let key = level.key.clone();
            self.put(level, &parent);
            parent = key;
        }

        if let Some(leaf) = leaf {
            self.leaves.insert(leaf.key.clone());
            self.put(leaf, &parent);
        }
    }

    /// First-writer-wins insertion; an existing key keeps its original
    /// text and parent. Returns whether the node was new.
    fn put(&mut self, level: Level, parent: &str) -> bool {
        if self.index.contains_key(&level.key) {
            return false;
        }

        self.index.insert(level.key.clone(), self.nodes.len());
        self.nodes.push(TreeNode {
            id: level.key,
            parent: parent.to_string(),
            text: level.text,
            icon: level.icon,
            open: level.open,
            disabled: level.disabled,
        });

        true
    }

    /// Reorder nodes ascending by display text, case-sensitive. Call once
    /// after a batch of insertions.
    pub fn sort(&mut self) {
        self.nodes.sort_by(|a, b| a.text.cmp(&b.text));
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id.clone(), position))
            .collect();
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.index.get(id).map(|&position| &self.nodes[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Whether this identifier belongs to the selectable-leaf set.
    pub fn is_leaf(&self, id: &str) -> bool {
        self.leaves.contains(id)
    }

    /// Whether activating this node should count as a usable choice: a
    /// known leaf that the widget isn't refusing.
    pub fn is_selectable(&self, id: &str) -> bool {
        self.is_leaf(id) && self.get(id).is_none_or(|node| !node.disabled)
    }

    /// All nodes, in display order once [`Tree::sort`] has run.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Merge the directory listing into the source picker tree. Instrument and
/// experimenter prefixes become branch nodes keyed by their path prefix;
/// the full path is the selectable leaf. Listing entries that point at
/// plain files show up but cannot be activated.
pub fn merge_directories(tree: &mut Tree, entries: &[DirectoryEntry]) {
    for entry in entries {
        let info = paths::classify(&entry.name);
        let segments: Vec<&str> = entry.name.split('/').collect();

        let instrument = info.instrument.as_ref().map(|name| {
            Level::new(segments[..3].join("/"), format!("Instrument: {name}"))
                .icon("folder")
                .opened()
        });

        let experimenter = info.experimenter.as_ref().map(|name| {
            Level::new(segments[..4].join("/"), format!("Experimenter: {name}")).icon("folder")
        });

        let leaf = info.data_label.as_ref().map(|label| {
            let leaf = Level::new(entry.name.clone(), label.clone());
            match entry.kind.as_deref() {
                Some("file") => leaf.icon("file").disabled(),
                _ => leaf.icon("folder"),
            }
        });

        tree.add_record(vec![instrument, experimenter], leaf);
    }

    tree.sort();
}

/// Merge assay and study records into the target picker tree. Level keys
/// are the ancestor URLs verbatim; a study reachable both as an assay's
/// ancestor and as a record of its own stays one node, selectable in its
/// own right.
pub fn merge_targets(tree: &mut Tree, assays: &[Assay], studies: &[Study]) {
    for assay in assays {
        let Some(url) = &assay.url else { continue };

        tree.add_record(
            vec![
                ancestor(&assay.project_url, &assay.project_name).map(Level::opened),
                ancestor(&assay.investigation_url, &assay.investigation_name),
                ancestor(&assay.study_url, &assay.study_name),
            ],
            Some(Level::new(url.as_str(), display_name(&assay.name, url)).icon("file")),
        );
    }

    for study in studies {
        let Some(url) = &study.url else { continue };

        tree.add_record(
            vec![
                ancestor(&study.project_url, &study.project_name).map(Level::opened),
                ancestor(&study.investigation_url, &study.investigation_name),
            ],
            Some(Level::new(url.as_str(), display_name(&study.name, url)).icon("folder")),
        );
    }

    tree.sort();
}

fn ancestor(url: &Option<String>, name: &Option<String>) -> Option<Level> {
    url.as_ref()
        .map(|url| Level::new(url.as_str(), display_name(name, url)).icon("folder"))
}

fn display_name(name: &Option<String>, fallback: &str) -> String {
    name.clone().unwrap_or_else(|| fallback.to_string())
}
