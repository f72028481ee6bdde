use crate::{AdminGateway, GroupHit, RemoteUser, RoleTemplate};
use acl_core::{AclError, Result, RuleSet};
use acl_division::DivisionNode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// 管理后台网关配置
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            token: None,
            timeout_ms: 30000,
        }
    }
}

impl GatewayConfig {
    /// 从环境变量创建配置
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("ADMIN_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            token: std::env::var("ADMIN_API_TOKEN").ok(),
            timeout_ms: std::env::var("ADMIN_API_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
        }
    }
}

/// 基于 HTTP 的协作方网关实现
pub struct HttpAdminGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

/// 远端错误响应体
#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    code: Option<String>,
    #[allow(dead_code)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DivisionsResponse {
    root_id: String,
    nodes: Vec<DivisionNode>,
}

#[derive(Debug, Serialize)]
struct EditTemplateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rules: Option<&'a RuleSet>,
}

impl HttpAdminGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AclError::Configuration {
                key: "admin_api".to_string(),
                reason: format!("failed to build http client: {}", e),
            })?;

        info!(base_url = %config.base_url, "创建管理后台网关");

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// 统一处理响应：非 2xx 时解析错误体并映射冲突码
    async fn take<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(operation, status = status.as_u16(), body = %body, "远端调用失败");

        if status.as_u16() == 404 {
            return Err(AclError::NotFound {
                resource: operation.to_string(),
            });
        }
        if let Ok(parsed) = serde_json::from_str::<RemoteErrorBody>(&body) {
            if let Some(code) = parsed.code {
                return Err(AclError::conflict(&code));
            }
        }
        Err(AclError::Network {
            operation: operation.to_string(),
            message: format!("unexpected status {}", status),
        })
    }
}

#[async_trait]
impl AdminGateway for HttpAdminGateway {
    #[instrument(skip(self))]
    async fn fetch_divisions(&self) -> Result<(String, Vec<DivisionNode>)> {
        let response = self
            .request(reqwest::Method::GET, "/api/v1/divisions")
            .send()
            .await?;
        let body: DivisionsResponse = self.take("fetch_divisions", response).await?;
        Ok((body.root_id, body.nodes))
    }

    #[instrument(skip(self, rules))]
    async fn create_role_template(&self, name: &str, rules: &RuleSet) -> Result<RoleTemplate> {
        let response = self
            .request(reqwest::Method::POST, "/api/v1/role-templates")
            .json(&serde_json::json!({ "name": name, "rules": rules }))
            .send()
            .await?;
        self.take("create_role_template", response).await
    }

    #[instrument(skip(self, rules))]
    async fn edit_role_template(
        &self,
        id: Uuid,
        name: Option<&str>,
        rules: Option<&RuleSet>,
    ) -> Result<RoleTemplate> {
        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("/api/v1/role-templates/{}", id),
            )
            .json(&EditTemplateBody { name, rules })
            .send()
            .await?;
        self.take("edit_role_template", response).await
    }

    #[instrument(skip(self))]
    async fn delete_role_template(&self, id: Uuid) -> Result<()> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/api/v1/role-templates/{}", id),
            )
            .send()
            .await?;
        let _: serde_json::Value = self.take("delete_role_template", response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_role_templates(&self) -> Result<Vec<RoleTemplate>> {
        let response = self
            .request(reqwest::Method::GET, "/api/v1/role-templates")
            .send()
            .await?;
        self.take("list_role_templates", response).await
    }

    #[instrument(skip(self, rules))]
    async fn edit_user(&self, email: &str, group_id: &str, rules: &RuleSet) -> Result<RemoteUser> {
        let response = self
            .request(reqwest::Method::PUT, "/api/v1/users/permissions")
            .json(&serde_json::json!({
                "email": email,
                "group_id": group_id,
                "rules": rules,
            }))
            .send()
            .await?;
        self.take("edit_user", response).await
    }

    #[instrument(skip(self))]
    async fn create_group(&self, parent_id: &str, name: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, "/api/v1/groups")
            .json(&serde_json::json!({ "parent_id": parent_id, "name": name }))
            .send()
            .await?;
        let _: serde_json::Value = self.take("create_group", response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_group(&self, id: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/api/v1/groups/{}", id))
            .send()
            .await?;
        let _: serde_json::Value = self.take("delete_group", response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_groups(&self, keyword: &str) -> Result<Vec<GroupHit>> {
        let response = self
            .request(reqwest::Method::GET, "/api/v1/groups/search")
            .query(&[("keyword", keyword)])
            .send()
            .await?;
        self.take("search_groups", response).await
    }
}
