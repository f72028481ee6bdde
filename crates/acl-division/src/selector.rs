use crate::tree::{DivisionNode, DivisionTree};
use tracing::debug;

/// 选择器中的一列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub options: Vec<ColumnOption>,
    /// 本列当前选中的 id；末尾新展开的列可以尚未选中
    pub selected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOption {
    pub id: String,
    pub name: String,
    pub has_children: bool,
}

/// 级联路径选择器
///
/// 打开即对当前路径打快照作为回滚点。每层一列，列内是该层当前
/// 选中节点的同级节点。只有 apply 会把结果交给调用方；cancel 或
/// 直接关闭恢复快照，调用方不会收到任何通知。
#[derive(Debug)]
pub struct CascadingSelector<'a> {
    tree: &'a DivisionTree,
    snapshot: Vec<String>,
    path: Vec<String>,
}

impl<'a> CascadingSelector<'a> {
    /// 以当前生效路径打开选择器
    ///
    /// 传入的路径可能已经失效（例如外部重置了群组树），此处不拒绝，
    /// 由 normalize 在逐层解析时自愈。
    pub fn open(tree: &'a DivisionTree, current_path: Option<&str>) -> Self {
        let path: Vec<String> = match current_path {
            Some(p) if !p.is_empty() => p.split('.').map(str::to_string).collect(),
            _ => vec![tree.root_id().to_string()],
        };
        let mut selector = Self {
            tree,
            snapshot: path.clone(),
            path,
        };
        selector.normalize();
        selector
    }

    /// 当前编辑中的点分路径
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// 逐层修复路径：某层无法解析时自动落到该层第一个同级节点，
    /// 其后各层在修复结果上继续解析
    fn normalize(&mut self) {
        let root_id = self.tree.root_id().to_string();
        if self.path.first() != Some(&root_id) {
            debug!(stale = %self.path.join("."), "路径根不符，回落到权限根");
            self.path = vec![root_id];
            return;
        }

        let mut repaired = vec![root_id];
        for depth in 1..self.path.len() {
            let parent = &repaired[depth - 1];
            let siblings = self.tree.children(parent);
            if siblings.is_empty() {
                // 上层已是叶节点，余下的段全部丢弃
                break;
            }
            let wanted = &self.path[depth];
            let chosen = if siblings.iter().any(|n| &n.id == wanted) {
                wanted.clone()
            } else {
                debug!(depth, wanted = %wanted, "路径段失效，自愈为第一个同级节点");
                siblings[0].id.clone()
            };
            repaired.push(chosen);
        }
        self.path = repaired;
    }

    /// 渲染列：每层一列，末尾若选中节点仍有子节点则多出一列待选
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = Vec::new();

        // 根列只有权限根自身
        let root = self.tree.root();
        columns.push(Column {
            options: vec![option_of(root)],
            selected: Some(root.id.clone()),
        });

        for depth in 1..self.path.len() {
            let options: Vec<ColumnOption> = self
                .tree
                .children(&self.path[depth - 1])
                .into_iter()
                .map(option_of)
                .collect();
            columns.push(Column {
                options,
                selected: Some(self.path[depth].clone()),
            });
        }

        // 最深选中节点仍有子节点时展开下一列
        if let Some(last) = self.path.last() {
            let further: Vec<ColumnOption> = self
                .tree
                .children(last)
                .into_iter()
                .map(option_of)
                .collect();
            if !further.is_empty() {
                columns.push(Column {
                    options: further,
                    selected: None,
                });
            }
        }

        columns
    }

    /// 在第 depth 层选中 id：路径自该层起的后缀被替换
    ///
    /// id 不是该层合法选项时不做任何修改（fail closed）。
    pub fn select(&mut self, depth: usize, id: &str) {
        if depth == 0 || depth > self.path.len() {
            return;
        }
        let parent = &self.path[depth - 1];
        if !self.tree.children(parent).iter().any(|n| n.id == id) {
            return;
        }
        self.path.truncate(depth);
        self.path.push(id.to_string());
    }

    /// 提交当前路径：唯一通知调用方的时刻
    ///
    /// 返回提交的路径与解析出的节点；提交后快照推进到新路径。
    pub fn apply(&mut self) -> Option<(String, &DivisionNode)> {
        let joined = self.path();
        let node = self.tree.resolve(&joined)?;
        self.snapshot = self.path.clone();
        Some((joined, node))
    }

    /// 放弃全部未提交的编辑，恢复到打开（或上次 apply）时的路径
    pub fn cancel(&mut self) {
        self.path = self.snapshot.clone();
    }
}

fn option_of(node: &DivisionNode) -> ColumnOption {
    ColumnOption {
        id: node.id.clone(),
        name: node.name.clone(),
        has_children: !node.child_ids.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::sample_tree;

    #[test]
    fn test_breadcrumb_apply_keeps_subtree_reachable() {
        // 根 R，子节点 A、B，A 有子节点 A1
        let tree = sample_tree();
        assert_eq!(tree.build_path("A1").as_deref(), Some("R.A.A1"));

        let mut selector = CascadingSelector::open(&tree, Some("R.A"));
        let (path, node) = selector.apply().unwrap();
        assert_eq!(path, "R.A");
        assert_eq!(node.id, "A");
        // 提交后 A 的子树仍然可达
        assert!(tree.resolve("R.A.A1").is_some());
    }

    #[test]
    fn test_select_replaces_suffix_and_reveals_column() {
        let tree = sample_tree();
        let mut selector = CascadingSelector::open(&tree, Some("R.A.A1"));

        // 第 1 层改选 B：A.A1 后缀整体被替换
        selector.select(1, "B");
        assert_eq!(selector.path(), "R.B");

        // B 无子节点，不再展开新列
        let columns = selector.columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].selected.as_deref(), Some("B"));

        // 改回 A：A 有子节点，出现待选列
        selector.select(1, "A");
        let columns = selector.columns();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[2].selected, None);
        assert_eq!(columns[2].options[0].id, "A1");
    }

    #[test]
    fn test_self_healing_default() {
        let tree = sample_tree();
        // X 不存在：该层自愈为第一个同级节点 A，下游继续解析
        let selector = CascadingSelector::open(&tree, Some("R.X.A1"));
        assert_eq!(selector.path(), "R.A.A1");

        // 根都不符时整体回落到权限根
        let selector = CascadingSelector::open(&tree, Some("Z.A"));
        assert_eq!(selector.path(), "R");
    }

    #[test]
    fn test_cancel_restores_snapshot_without_notify() {
        let tree = sample_tree();
        let mut selector = CascadingSelector::open(&tree, Some("R.A"));

        selector.select(1, "B");
        assert_eq!(selector.path(), "R.B");

        selector.cancel();
        assert_eq!(selector.path(), "R.A");
    }

    #[test]
    fn test_apply_advances_snapshot() {
        let tree = sample_tree();
        let mut selector = CascadingSelector::open(&tree, None);
        assert_eq!(selector.path(), "R");

        selector.select(1, "A");
        selector.select(2, "A1");
        let (path, node) = selector.apply().unwrap();
        assert_eq!(path, "R.A.A1");
        assert_eq!(node.id, "A1");

        // 再编辑再取消，回到的是上次 apply 的路径
        selector.select(1, "B");
        selector.cancel();
        assert_eq!(selector.path(), "R.A.A1");
    }

    #[test]
    fn test_invalid_select_ignored() {
        let tree = sample_tree();
        let mut selector = CascadingSelector::open(&tree, Some("R.A"));
        selector.select(1, "A1"); // A1 不是 R 的直接子节点
        assert_eq!(selector.path(), "R.A");
        selector.select(5, "B"); // 越界层
        assert_eq!(selector.path(), "R.A");
    }
}
