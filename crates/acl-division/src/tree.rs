use acl_error::{AclError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 群组层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Root,
    Project,
    Parent,
    Leaf,
}

/// 群组节点
///
/// `ancestors` 自权限根起、根先序、以自身结尾；全路径即
/// `ancestors` 以 `.` 连接，树内唯一。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivisionNode {
    pub id: String,
    pub name: String,
    pub level: Level,
    pub parent_id: Option<String>,
    pub ancestors: Vec<String>,
    pub child_ids: Vec<String>,
    pub device_count: u32,
}

/// 群组树
///
/// 以 id 为键的节点仓，迭代遍历，不做递归。根节点是当前用户的
/// 权限根，树随会话加载、群组增删后整树重取。
///
/// 只进不出：构造必须走 from_nodes 的完整性校验，因此不提供
/// Deserialize。
#[derive(Debug, Clone, Serialize)]
pub struct DivisionTree {
    root_id: String,
    nodes: HashMap<String, DivisionNode>,
}

impl DivisionTree {
    /// 构建并校验引用完整性：任何悬空引用直接拒绝（fail closed）
    pub fn from_nodes(root_id: impl Into<String>, nodes: Vec<DivisionNode>) -> Result<Self> {
        let root_id = root_id.into();
        let map: HashMap<String, DivisionNode> = nodes
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect();

        if !map.contains_key(&root_id) {
            return Err(AclError::InvalidRequest {
                reason: format!("division tree: root {} missing", root_id),
            });
        }

        for node in map.values() {
            for child in &node.child_ids {
                if !map.contains_key(child) {
                    return Err(AclError::InvalidRequest {
                        reason: format!("division tree: {} -> dangling child {}", node.id, child),
                    });
                }
            }
            for ancestor in &node.ancestors {
                if !map.contains_key(ancestor) {
                    return Err(AclError::InvalidRequest {
                        reason: format!(
                            "division tree: {} -> dangling ancestor {}",
                            node.id, ancestor
                        ),
                    });
                }
            }
            if let Some(parent) = &node.parent_id {
                if !map.contains_key(parent) {
                    return Err(AclError::InvalidRequest {
                        reason: format!("division tree: {} -> dangling parent {}", node.id, parent),
                    });
                }
            }
        }

        // 祖先链必须与父链接一致，否则全路径失去唯一性，
        // resolve(build_path(n)) == n 不再成立
        for node in map.values() {
            if node.id == root_id {
                if node.ancestors != [root_id.clone()] {
                    return Err(AclError::InvalidRequest {
                        reason: format!("division tree: root {} has bad ancestors", node.id),
                    });
                }
                continue;
            }
            let parent_id = node.parent_id.as_ref().ok_or_else(|| AclError::InvalidRequest {
                reason: format!("division tree: non-root {} has no parent", node.id),
            })?;
            // 父节点存在性上面已校验
            let parent = &map[parent_id];
            let consistent = node.ancestors.len() == parent.ancestors.len() + 1
                && node.ancestors[..parent.ancestors.len()] == parent.ancestors[..]
                && node.ancestors.last() == Some(&node.id);
            if !consistent {
                return Err(AclError::InvalidRequest {
                    reason: format!(
                        "division tree: {} ancestors inconsistent with parent {}",
                        node.id, parent_id
                    ),
                });
            }
        }

        Ok(Self {
            root_id,
            nodes: map,
        })
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root(&self) -> &DivisionNode {
        // 构建时已校验根存在
        &self.nodes[&self.root_id]
    }

    pub fn get(&self, id: &str) -> Option<&DivisionNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 按 child_ids 原序返回子节点
    pub fn children(&self, id: &str) -> Vec<&DivisionNode> {
        self.nodes
            .get(id)
            .map(|node| {
                node.child_ids
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 节点的全路径 id：祖先 id 根先序以 `.` 连接
    pub fn build_path(&self, id: &str) -> Option<String> {
        let node = self.nodes.get(id)?;
        Some(node.ancestors.join("."))
    }

    /// 解析点分路径
    ///
    /// 自根逐段下行，每段必须是前一段的直接子节点；任何一段缺失
    /// 或越级即整体失败，返回 None，绝不部分匹配、绝不抛错。
    pub fn resolve(&self, path: &str) -> Option<&DivisionNode> {
        let mut segments = path.split('.');

        let first = segments.next()?;
        if first != self.root_id {
            return None;
        }
        let mut current = self.nodes.get(first)?;

        for segment in segments {
            if !current.child_ids.iter().any(|c| c == segment) {
                return None;
            }
            current = self.nodes.get(segment)?;
        }
        Some(current)
    }
}

/// 测试与演示用的树构造器
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<DivisionNode>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(
        mut self,
        id: &str,
        name: &str,
        level: Level,
        parent_id: Option<&str>,
        ancestors: &[&str],
        child_ids: &[&str],
    ) -> Self {
        self.nodes.push(DivisionNode {
            id: id.to_string(),
            name: name.to_string(),
            level,
            parent_id: parent_id.map(str::to_string),
            ancestors: ancestors.iter().map(|s| s.to_string()).collect(),
            child_ids: child_ids.iter().map(|s| s.to_string()).collect(),
            device_count: 0,
        });
        self
    }

    pub fn build(self, root_id: &str) -> Result<DivisionTree> {
        DivisionTree::from_nodes(root_id, self.nodes)
    }
}

#[cfg(test)]
pub(crate) fn sample_tree() -> DivisionTree {
    // R
    // ├── A ── A1
    // └── B
    TreeBuilder::new()
        .node("R", "总部", Level::Root, None, &["R"], &["A", "B"])
        .node("A", "园区A", Level::Parent, Some("R"), &["R", "A"], &["A1"])
        .node(
            "A1",
            "园区A一楼",
            Level::Leaf,
            Some("A"),
            &["R", "A", "A1"],
            &[],
        )
        .node("B", "园区B", Level::Leaf, Some("R"), &["R", "B"], &[])
        .build("R")
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_path() {
        let tree = sample_tree();
        assert_eq!(tree.build_path("A1").as_deref(), Some("R.A.A1"));
        assert_eq!(tree.build_path("R").as_deref(), Some("R"));
        assert_eq!(tree.build_path("missing"), None);
    }

    #[test]
    fn test_resolve_roundtrip() {
        // 良构树上 resolve(build_path(n)) == n 对每个节点成立
        let tree = sample_tree();
        for id in ["R", "A", "A1", "B"] {
            let path = tree.build_path(id).unwrap();
            let node = tree.resolve(&path).unwrap();
            assert_eq!(node.id, id);
        }
    }

    #[test]
    fn test_resolve_fails_closed() {
        let tree = sample_tree();
        // 缺段、越级、根不符，一律 None
        assert!(tree.resolve("R.A1").is_none()); // A1 不是 R 的直接子节点
        assert!(tree.resolve("A.A1").is_none()); // 不从根出发
        assert!(tree.resolve("R.X").is_none());
        assert!(tree.resolve("").is_none());
        assert!(tree.resolve("R.A.A1.extra").is_none());
    }

    #[test]
    fn test_inconsistent_ancestors_rejected() {
        // B 挂在 R 下却自称 ancestors = ["R"]：全路径 "R" 与根撞车，
        // 这样的树必须在构建期拒绝
        let result = TreeBuilder::new()
            .node("R", "总部", Level::Root, None, &["R"], &["B"])
            .node("B", "园区B", Level::Leaf, Some("R"), &["R"], &[])
            .build("R");
        assert!(result.is_err());

        // 祖先链末尾不是自身同样拒绝
        let result = TreeBuilder::new()
            .node("R", "总部", Level::Root, None, &["R"], &["B"])
            .node("B", "园区B", Level::Leaf, Some("R"), &["R", "R"], &[])
            .build("R");
        assert!(result.is_err());

        // 根的祖先链只能是自身
        let result = TreeBuilder::new()
            .node("R", "总部", Level::Root, None, &["R", "R"], &[])
            .build("R");
        assert!(result.is_err());
    }

    #[test]
    fn test_non_root_without_parent_rejected() {
        let result = TreeBuilder::new()
            .node("R", "总部", Level::Root, None, &["R"], &["B"])
            .node("B", "园区B", Level::Leaf, None, &["R", "B"], &[])
            .build("R");
        assert!(result.is_err());
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let result = TreeBuilder::new()
            .node("R", "总部", Level::Root, None, &["R"], &["ghost"])
            .build("R");
        assert!(result.is_err());

        let result = TreeBuilder::new()
            .node("R", "总部", Level::Root, None, &["R"], &[])
            .build("other-root");
        assert!(result.is_err());
    }

    #[test]
    fn test_children_order_preserved() {
        let tree = sample_tree();
        let children: Vec<&str> = tree.children("R").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(children, vec!["A", "B"]);
    }
}
