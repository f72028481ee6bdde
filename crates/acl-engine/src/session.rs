use acl_client::AdminGateway;
use acl_core::Result;
use acl_division::DivisionTree;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 会话级状态仓
///
/// 取代散落的全局可变状态：群组树缓存与当前选中的群组路径都挂在
/// 这里，由调用方显式传引用。唯一的进程级单例是只读的规则目录。
pub struct SessionStore {
    gateway: Arc<dyn AdminGateway>,
    tree: RwLock<Option<Arc<DivisionTree>>>,
    selected_path: RwLock<Option<String>>,
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn AdminGateway>) -> Self {
        Self {
            gateway,
            tree: RwLock::new(None),
            selected_path: RwLock::new(None),
        }
    }

    /// 群组树：首次访问时拉取并缓存，之后复用缓存
    pub async fn division_tree(&self) -> Result<Arc<DivisionTree>> {
        if let Some(tree) = self.tree.read().await.as_ref() {
            return Ok(tree.clone());
        }

        let (root_id, nodes) = self.gateway.fetch_divisions().await?;
        let tree = Arc::new(DivisionTree::from_nodes(root_id, nodes)?);
        info!(nodes = tree.len(), "加载群组树");

        *self.tree.write().await = Some(tree.clone());
        Ok(tree)
    }

    /// 群组增删后整树失效，下次访问重新拉取
    async fn invalidate_tree(&self) {
        debug!("群组树缓存失效");
        *self.tree.write().await = None;
    }

    pub async fn create_group(&self, parent_id: &str, name: &str) -> Result<()> {
        self.gateway.create_group(parent_id, name).await?;
        self.invalidate_tree().await;
        Ok(())
    }

    pub async fn delete_group(&self, id: &str) -> Result<()> {
        self.gateway.delete_group(id).await?;
        self.invalidate_tree().await;
        Ok(())
    }

    /// 当前选中的群组路径（点分、根先序）
    pub async fn selected_path(&self) -> Option<String> {
        self.selected_path.read().await.clone()
    }

    pub async fn select_path(&self, path: &str) {
        *self.selected_path.write().await = Some(path.to_string());
    }

    /// 解析当前选中路径；路径失效时返回 None（fail closed）
    pub async fn selected_division(&self) -> Result<Option<String>> {
        let tree = self.division_tree().await?;
        let path = self.selected_path().await;
        Ok(path
            .as_deref()
            .and_then(|p| tree.resolve(p))
            .map(|node| node.id.clone()))
    }
}
