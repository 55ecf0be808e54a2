use crate::error::{AppError, Result};
use crate::manifest::ManifestEntry;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Directory,
    File,
}

/// Line-count tree of merged files; a directory's `lines` is the sum of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    fn directory(name: &str) -> Self {
        TreeNode {
            name: name.to_string(),
            node_type: NodeType::Directory,
            lines: 0,
            children: Some(Vec::new()),
        }
    }

    fn file(name: &str, lines: usize) -> Self {
        TreeNode {
            name: name.to_string(),
            node_type: NodeType::File,
            lines,
            children: None,
        }
    }
}

/// Builds the tree from manifest entries. Display paths keep their root folder
/// segment, so a normal manifest yields a single top-level directory node.
pub fn build_size_tree(entries: &[ManifestEntry]) -> Result<Vec<TreeNode>> {
    log::debug!("Building size tree from {} manifest entries...", entries.len());
    let mut roots: Vec<TreeNode> = Vec::new();
    for entry in entries {
        let components: Vec<&str> = entry
            .display_path
            .split('/')
            .filter(|c| !c.is_empty())
            .collect();
        if components.is_empty() {
            continue;
        }
        insert_node(&mut roots, &components, entry.line_count())?;
    }
    Ok(roots)
}

fn insert_node(level: &mut Vec<TreeNode>, components: &[&str], lines: usize) -> Result<()> {
    let Some((name, rest)) = components.split_first() else {
        return Ok(());
    };

    let position = match level.binary_search_by(|node| node.name.as_str().cmp(name)) {
        Ok(found) => found,
        Err(insertion_point) => {
            let node = if rest.is_empty() {
                TreeNode::file(name, 0)
            } else {
                TreeNode::directory(name)
            };
            level.insert(insertion_point, node);
            insertion_point
        }
    };

    let node = &mut level[position];
    if rest.is_empty() {
        if node.node_type == NodeType::Directory {
            return Err(AppError::Manifest(format!(
                "Tree conflict: '{}' is both a directory and a file",
                name
            )));
        }
        node.lines += lines;
        return Ok(());
    }

    let Some(children) = node.children.as_mut() else {
        return Err(AppError::Manifest(format!(
            "Tree conflict: trying to create children within file component '{}'",
            name
        )));
    };
    insert_node(children, rest, lines)?;
    node.lines += lines;
    Ok(())
}

pub fn size_tree_to_json(tree: &[TreeNode]) -> Result<String> {
    crate::output_formats::serialize_to_json(tree, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, start: usize, end: usize) -> ManifestEntry {
        ManifestEntry {
            display_path: path.to_string(),
            start_line: start,
            end_line: end,
        }
    }

    #[test]
    fn sums_lines_into_sorted_directories() {
        let tree = build_size_tree(&[
            entry("/app/src/b.ts", 2, 11),
            entry("/app/src/a.ts", 15, 17),
            entry("/app/main.ts", 21, 21),
        ])
        .unwrap();

        assert_eq!(tree.len(), 1);
        let app = &tree[0];
        assert_eq!(app.name, "app");
        assert_eq!(app.lines, 14);
        let children = app.children.as_ref().unwrap();
        assert_eq!(children[0].name, "main.ts");
        assert_eq!(children[1].name, "src");
        assert_eq!(children[1].lines, 13);
        let src = children[1].children.as_ref().unwrap();
        assert_eq!(
            src.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            vec!["a.ts", "b.ts"]
        );
    }

    #[test]
    fn file_and_directory_with_same_path_conflict() {
        let result = build_size_tree(&[entry("/app/src", 1, 1), entry("/app/src/a.ts", 3, 3)]);
        assert!(matches!(result, Err(AppError::Manifest(_))));
    }

    #[test]
    fn serializes_type_field() {
        let tree = build_size_tree(&[entry("/app/a.ts", 2, 3)]).unwrap();
        let json = size_tree_to_json(&tree).unwrap();
        assert!(json.contains("\"type\": \"directory\""));
        assert!(json.contains("\"type\": \"file\""));
        assert!(json.contains("\"lines\": 2"));
    }
}
