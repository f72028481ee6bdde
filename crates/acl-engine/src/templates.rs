use crate::editor::PermissionEditor;
use acl_client::{AdminGateway, RoleTemplate};
use acl_core::{Result, RuleSet, CATALOG};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// 角色模板仓库
///
/// 远端网关之上的本地缓存。所有变更先过目录校验、再走网关，
/// 网关失败时本地列表保持原样。
pub struct RoleTemplateStore {
    gateway: Arc<dyn AdminGateway>,
    cache: RwLock<Vec<RoleTemplate>>,
}

impl RoleTemplateStore {
    pub fn new(gateway: Arc<dyn AdminGateway>) -> Self {
        Self {
            gateway,
            cache: RwLock::new(Vec::new()),
        }
    }

    /// 本地缓存快照（不触发远端调用）
    pub async fn cached(&self) -> Vec<RoleTemplate> {
        self.cache.read().await.clone()
    }

    /// 刷新并返回当前可见的全部模板
    pub async fn list(&self) -> Result<Vec<RoleTemplate>> {
        let templates = self.gateway.list_role_templates().await?;
        *self.cache.write().await = templates.clone();
        Ok(templates)
    }

    /// 新建模板
    ///
    /// 目录外的规则在代数边界就地拒绝，不会发往协作方；
    /// DUPLICATE_NAME / LIMIT_REACHED 原样透传，缓存不动。
    pub async fn create(&self, name: &str, rules: &RuleSet) -> Result<RoleTemplate> {
        for rule in rules {
            CATALOG.validate(*rule)?;
        }
        let template = self.gateway.create_role_template(name, rules).await?;
        info!(name, id = %template.id, "创建角色模板");
        self.cache.write().await.push(template.clone());
        Ok(template)
    }

    /// 部分更新
    pub async fn edit(
        &self,
        id: Uuid,
        name: Option<&str>,
        rules: Option<&RuleSet>,
    ) -> Result<RoleTemplate> {
        if let Some(rules) = rules {
            for rule in rules {
                CATALOG.validate(*rule)?;
            }
        }
        let updated = self.gateway.edit_role_template(id, name, rules).await?;
        let mut cache = self.cache.write().await;
        if let Some(slot) = cache.iter_mut().find(|t| t.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    /// 删除（非幂等，不存在时报 NotFound）
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.gateway.delete_role_template(id).await?;
        self.cache.write().await.retain(|t| t.id != id);
        Ok(())
    }

    /// 把模板套用到编辑器
    ///
    /// 模板规则先裁剪到目录内，再裁剪到操作者授权上限，最后并回
    /// 编辑器当前的只读余量——套用模板永远不会静默撤销操作者
    /// 管不到的规则。返回合并后的规则集。
    pub fn apply_to(&self, template: &RoleTemplate, editor: &mut PermissionEditor) -> RuleSet {
        let clamped = template
            .rules
            .intersect(Some(&CATALOG.all_rules()))
            .intersect(editor.accepted());
        let merged = clamped.union(&editor.read_only_remainder());

        debug!(
            template = %template.name,
            clamped = clamped.len(),
            merged = merged.len(),
            "套用角色模板"
        );

        editor.reconcile(&merged);
        merged
    }
}
