// src/core/tree_builder.rs
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::repository::RepositoryFile;
use super::subsystem_catalog::SubsystemType;
use super::subsystems::SubsystemInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    // Declared first so directories sort ahead of files
    Directory,
    File,
}

/// A node in the project tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Parent path + "/" + name; empty for the root
    pub path: String,

    /// Present for directories only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem_type: Option<SubsystemType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl TreeNode {
    fn directory(name: &str, path: String, subsystem_type: Option<SubsystemType>) -> Self {
        Self {
            name: name.to_string(),
            node_type: NodeType::Directory,
            path,
            children: Some(Vec::new()),
            subsystem_type,
            file_type: None,
            size: None,
        }
    }

    fn file(name: &str, path: String, subsystem_type: Option<SubsystemType>, source: &RepositoryFile) -> Self {
        Self {
            name: name.to_string(),
            node_type: NodeType::File,
            path,
            children: None,
            subsystem_type,
            file_type: Some(source.file_type.clone()),
            size: Some(source.size),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.node_type == NodeType::Directory
    }

    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    fn sort_recursive(&mut self) {
        if let Some(children) = self.children.as_mut() {
            children.sort_by(|a, b| a.node_type.cmp(&b.node_type).then_with(|| a.name.cmp(&b.name)));
            for child in children.iter_mut() {
                child.sort_recursive();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTree {
    pub root: TreeNode,
    pub total_files: usize,
    pub total_directories: usize,
    pub max_depth: usize,
}

impl ProjectTree {
    pub fn empty() -> Self {
        Self {
            root: TreeNode::directory("root", String::new(), None),
            total_files: 0,
            total_directories: 0,
            max_depth: 0,
        }
    }
}

/// Build a sorted directory tree from a flat file list
pub fn build_project_tree(files: &[RepositoryFile], subsystems: &[SubsystemInfo]) -> ProjectTree {
    let mut subsystem_by_path: HashMap<&str, SubsystemType> = HashMap::new();
    for subsystem in subsystems {
        for path in &subsystem.files {
            subsystem_by_path.insert(path.as_str(), subsystem.subsystem_type);
        }
    }

    let mut ordered: Vec<&RepositoryFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    let mut tree = ProjectTree::empty();

    for file in ordered {
        let segments: Vec<&str> = file.path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            continue;
        }
        tree.max_depth = tree.max_depth.max(segments.len());

        let mut current = &mut tree.root;
        let mut current_path = String::new();

        for (index, segment) in segments.iter().enumerate() {
            let is_leaf = index + 1 == segments.len();
            let kind = if is_leaf { NodeType::File } else { NodeType::Directory };

            if !current_path.is_empty() {
                current_path.push('/');
            }
            current_path.push_str(segment);

            let children = current.children.get_or_insert_with(Vec::new);
            let position = children
                .iter()
                .position(|child| child.name == *segment && child.node_type == kind);

            let position = match position {
                Some(position) => position,
                None => {
                    let annotation = subsystem_by_path.get(current_path.as_str()).copied();
                    let node = if is_leaf {
                        tree.total_files += 1;
                        TreeNode::file(segment, current_path.clone(), annotation, file)
                    } else {
                        tree.total_directories += 1;
                        TreeNode::directory(segment, current_path.clone(), annotation)
                    };
                    children.push(node);
                    children.len() - 1
                }
            };

            current = &mut children[position];
        }
    }

    tree.root.sort_recursive();
    tree
}
