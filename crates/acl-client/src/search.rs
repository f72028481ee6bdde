use crate::{AdminGateway, GroupHit};
use acl_core::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 增量搜索会话
///
/// 输入快速变化时远端响应可能乱序到达。每次发起搜索领取一个
/// 递增的请求代号，响应返回时若代号已不是最新，整个结果作废
/// （返回 None），调用方据此丢弃过期数据。
pub struct SearchSession {
    gateway: Arc<dyn AdminGateway>,
    generation: AtomicU64,
}

impl SearchSession {
    pub fn new(gateway: Arc<dyn AdminGateway>) -> Self {
        Self {
            gateway,
            generation: AtomicU64::new(0),
        }
    }

    /// 发起一次搜索；过期响应返回 Ok(None)
    pub async fn search(&self, keyword: &str) -> Result<Option<Vec<GroupHit>>> {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let hits = self.gateway.search_groups(keyword).await?;

        if self.generation.load(Ordering::SeqCst) == my_generation {
            Ok(Some(hits))
        } else {
            debug!(keyword, generation = my_generation, "丢弃过期搜索响应");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RemoteUser;
    use crate::RoleTemplate;
    use acl_core::RuleSet;
    use acl_division::DivisionNode;
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use uuid::Uuid;

    /// 关键词为 "slow" 的搜索先宣告已在途，再挂起等待放行信号
    struct GatedGateway {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl AdminGateway for GatedGateway {
        async fn fetch_divisions(&self) -> Result<(String, Vec<DivisionNode>)> {
            unimplemented!()
        }
        async fn create_role_template(&self, _: &str, _: &RuleSet) -> Result<RoleTemplate> {
            unimplemented!()
        }
        async fn edit_role_template(
            &self,
            _: Uuid,
            _: Option<&str>,
            _: Option<&RuleSet>,
        ) -> Result<RoleTemplate> {
            unimplemented!()
        }
        async fn delete_role_template(&self, _: Uuid) -> Result<()> {
            unimplemented!()
        }
        async fn list_role_templates(&self) -> Result<Vec<RoleTemplate>> {
            unimplemented!()
        }
        async fn edit_user(&self, _: &str, _: &str, _: &RuleSet) -> Result<RemoteUser> {
            unimplemented!()
        }
        async fn create_group(&self, _: &str, _: &str) -> Result<()> {
            unimplemented!()
        }
        async fn delete_group(&self, _: &str) -> Result<()> {
            unimplemented!()
        }
        async fn search_groups(&self, keyword: &str) -> Result<Vec<GroupHit>> {
            if keyword == "slow" {
                self.started.notify_one();
                self.release.notified().await;
            }
            Ok(vec![GroupHit {
                id: format!("hit-{}", keyword),
                name: keyword.to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn test_stale_response_discarded() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let session = Arc::new(SearchSession::new(Arc::new(GatedGateway {
            started: started.clone(),
            release: release.clone(),
        })));

        // 先发出慢请求，等它确认在途（代号已领取）后再发新请求使其过期
        let slow = {
            let session = session.clone();
            tokio::spawn(async move { session.search("slow").await })
        };
        started.notified().await;

        let fresh = session.search("fresh").await.unwrap();
        assert_eq!(fresh.unwrap()[0].id, "hit-fresh");

        release.notify_one();
        let stale = slow.await.unwrap().unwrap();
        assert!(stale.is_none());
    }

    #[tokio::test]
    async fn test_latest_response_kept() {
        let session = SearchSession::new(Arc::new(GatedGateway {
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }));
        let hits = session.search("fast").await.unwrap().unwrap();
        assert_eq!(hits[0].name, "fast");
    }
}
