pub mod http;
pub mod memory;
pub mod search;

use acl_core::{Result, RuleSet};
use acl_division::DivisionNode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use http::{GatewayConfig, HttpAdminGateway};
pub use memory::{MemoryAdminGateway, ROLE_TEMPLATE_LIMIT};
pub use search::SearchSession;

/// 角色模板：组织内按名称唯一的可复用规则集
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTemplate {
    pub id: Uuid,
    pub name: String,
    pub rules: RuleSet,
    pub created_at: DateTime<Utc>,
}

/// editUser 的返回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteUser {
    pub email: String,
    pub group_id: String,
    pub rules: RuleSet,
}

/// 群组搜索命中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHit {
    pub id: String,
    pub name: String,
}

/// 协作方抽象接口
///
/// 模板/群组/用户的增删改查都是远端过程，本引擎只消费其
/// 载荷与错误码；冲突码经 AclError::RemoteConflict 原样透传。
#[async_trait]
pub trait AdminGateway: Send + Sync {
    /// 拉取当前用户权限根下的整棵群组树，返回 (根 id, 节点列表)
    async fn fetch_divisions(&self) -> Result<(String, Vec<DivisionNode>)>;

    async fn create_role_template(&self, name: &str, rules: &RuleSet) -> Result<RoleTemplate>;

    /// 部分更新：None 字段保持原值
    async fn edit_role_template(
        &self,
        id: Uuid,
        name: Option<&str>,
        rules: Option<&RuleSet>,
    ) -> Result<RoleTemplate>;

    /// 非幂等：目标不存在时返回 NotFound
    async fn delete_role_template(&self, id: Uuid) -> Result<()>;

    async fn list_role_templates(&self) -> Result<Vec<RoleTemplate>>;

    async fn edit_user(&self, email: &str, group_id: &str, rules: &RuleSet) -> Result<RemoteUser>;

    async fn create_group(&self, parent_id: &str, name: &str) -> Result<()>;

    async fn delete_group(&self, id: &str) -> Result<()>;

    async fn search_groups(&self, keyword: &str) -> Result<Vec<GroupHit>>;
}
