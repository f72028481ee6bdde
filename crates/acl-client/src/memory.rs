use crate::{AdminGateway, GroupHit, RemoteUser, RoleTemplate};
use acl_core::{AclError, Result, RuleSet};
use acl_division::{DivisionNode, Level};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// 单组织可保存的角色模板上限
pub const ROLE_TEMPLATE_LIMIT: usize = 20;

/// 群组树最大层级：ROOT → PROJECT → PARENT → LEAF
const GROUP_LEVEL_LIMIT: usize = 4;

#[derive(Debug, Default)]
struct MemoryState {
    templates: Vec<RoleTemplate>,
    root_id: String,
    nodes: HashMap<String, DivisionNode>,
    users: HashMap<(String, String), RuleSet>,
}

/// 内存版协作方网关
///
/// 与远端实现同一套冲突语义（DUPLICATE_NAME / LIMIT_REACHED /
/// GROUP_LEVEL_LIMIT_REACH），供测试与本地演示使用。
pub struct MemoryAdminGateway {
    state: RwLock<MemoryState>,
}

impl MemoryAdminGateway {
    /// 创建只有权限根节点的网关
    pub fn new(root_id: &str, root_name: &str) -> Self {
        let root = DivisionNode {
            id: root_id.to_string(),
            name: root_name.to_string(),
            level: Level::Root,
            parent_id: None,
            ancestors: vec![root_id.to_string()],
            child_ids: vec![],
            device_count: 0,
        };
        let mut nodes = HashMap::new();
        nodes.insert(root.id.clone(), root);
        Self {
            state: RwLock::new(MemoryState {
                templates: Vec::new(),
                root_id: root_id.to_string(),
                nodes,
                users: HashMap::new(),
            }),
        }
    }

    /// 以现成的节点集合作为群组树
    pub fn with_divisions(root_id: &str, nodes: Vec<DivisionNode>) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                templates: Vec::new(),
                root_id: root_id.to_string(),
                nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
                users: HashMap::new(),
            }),
        }
    }

    /// 预置一个模板（测试用）
    pub async fn seed_template(&self, name: &str, rules: RuleSet) -> RoleTemplate {
        let template = RoleTemplate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            rules,
            created_at: Utc::now(),
        };
        self.state.write().await.templates.push(template.clone());
        template
    }

    fn level_for_depth(depth: usize) -> Level {
        match depth {
            1 => Level::Root,
            2 => Level::Project,
            3 => Level::Parent,
            _ => Level::Leaf,
        }
    }
}

#[async_trait]
impl AdminGateway for MemoryAdminGateway {
    async fn fetch_divisions(&self) -> Result<(String, Vec<DivisionNode>)> {
        let state = self.state.read().await;
        Ok((
            state.root_id.clone(),
            state.nodes.values().cloned().collect(),
        ))
    }

    async fn create_role_template(&self, name: &str, rules: &RuleSet) -> Result<RoleTemplate> {
        let mut state = self.state.write().await;
        // 名称冲突区分大小写，按组织范围判定
        if state.templates.iter().any(|t| t.name == name) {
            return Err(AclError::conflict("DUPLICATE_NAME"));
        }
        if state.templates.len() >= ROLE_TEMPLATE_LIMIT {
            return Err(AclError::conflict("LIMIT_REACHED"));
        }
        let template = RoleTemplate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            rules: rules.clone(),
            created_at: Utc::now(),
        };
        state.templates.push(template.clone());
        Ok(template)
    }

    async fn edit_role_template(
        &self,
        id: Uuid,
        name: Option<&str>,
        rules: Option<&RuleSet>,
    ) -> Result<RoleTemplate> {
        let mut state = self.state.write().await;
        if let Some(new_name) = name {
            if state.templates.iter().any(|t| t.name == new_name && t.id != id) {
                return Err(AclError::conflict("DUPLICATE_NAME"));
            }
        }
        let template = state
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| AclError::NotFound {
                resource: format!("role_template:{}", id),
            })?;
        if let Some(new_name) = name {
            template.name = new_name.to_string();
        }
        if let Some(new_rules) = rules {
            template.rules = new_rules.clone();
        }
        Ok(template.clone())
    }

    async fn delete_role_template(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.templates.len();
        state.templates.retain(|t| t.id != id);
        // 非幂等：重复删除报 NotFound
        if state.templates.len() == before {
            return Err(AclError::NotFound {
                resource: format!("role_template:{}", id),
            });
        }
        Ok(())
    }

    async fn list_role_templates(&self) -> Result<Vec<RoleTemplate>> {
        Ok(self.state.read().await.templates.clone())
    }

    async fn edit_user(&self, email: &str, group_id: &str, rules: &RuleSet) -> Result<RemoteUser> {
        let mut state = self.state.write().await;
        if !state.nodes.contains_key(group_id) {
            return Err(AclError::NotFound {
                resource: format!("group:{}", group_id),
            });
        }
        state
            .users
            .insert((email.to_string(), group_id.to_string()), rules.clone());
        Ok(RemoteUser {
            email: email.to_string(),
            group_id: group_id.to_string(),
            rules: rules.clone(),
        })
    }

    async fn create_group(&self, parent_id: &str, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let parent = state
            .nodes
            .get(parent_id)
            .ok_or_else(|| AclError::NotFound {
                resource: format!("group:{}", parent_id),
            })?;

        let depth = parent.ancestors.len();
        if depth >= GROUP_LEVEL_LIMIT {
            return Err(AclError::conflict("GROUP_LEVEL_LIMIT_REACH"));
        }

        let id = format!("g-{}", Uuid::new_v4());
        let mut ancestors = parent.ancestors.clone();
        ancestors.push(id.clone());
        let node = DivisionNode {
            id: id.clone(),
            name: name.to_string(),
            level: Self::level_for_depth(depth + 1),
            parent_id: Some(parent_id.to_string()),
            ancestors,
            child_ids: vec![],
            device_count: 0,
        };

        if let Some(parent) = state.nodes.get_mut(parent_id) {
            parent.child_ids.push(id.clone());
        }
        state.nodes.insert(id.clone(), node);
        debug!(parent = parent_id, id = %id, "创建群组");
        Ok(())
    }

    async fn delete_group(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if id == state.root_id {
            return Err(AclError::conflict("FORBIDDEN"));
        }
        if !state.nodes.contains_key(id) {
            return Err(AclError::NotFound {
                resource: format!("group:{}", id),
            });
        }

        // 迭代收集子树后整体摘除
        let mut doomed = vec![id.to_string()];
        let mut queue = vec![id.to_string()];
        while let Some(current) = queue.pop() {
            if let Some(node) = state.nodes.get(&current) {
                for child in &node.child_ids {
                    doomed.push(child.clone());
                    queue.push(child.clone());
                }
            }
        }
        for dead in &doomed {
            state.nodes.remove(dead);
        }
        for node in state.nodes.values_mut() {
            node.child_ids.retain(|c| c != id);
        }
        Ok(())
    }

    async fn search_groups(&self, keyword: &str) -> Result<Vec<GroupHit>> {
        let needle = keyword.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.name.to_lowercase().contains(&needle))
            .map(|n| GroupHit {
                id: n.id.clone(),
                name: n.name.clone(),
            })
            .collect())
    }
}
