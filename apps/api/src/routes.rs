use acl_client::{AdminGateway, GroupHit, RoleTemplate, SearchSession};
use acl_core::{Action, Result, RuleSet, Subject};
use acl_division::CascadingSelector;
use acl_engine::{CellState, PermissionEditor, RoleTemplateStore, SessionStore};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionStore>,
    pub templates: Arc<RoleTemplateStore>,
    pub gateway: Arc<dyn AdminGateway>,
    pub search: Arc<SearchSession>,
}

// ===============
// 群组树
// ===============

#[derive(Serialize)]
pub struct DivisionView {
    pub id: String,
    pub name: String,
    pub path: Option<String>,
    pub device_count: u32,
}

#[derive(Deserialize)]
pub struct PathQuery {
    pub path: String,
}

pub async fn divisions_tree(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let tree = state.session.division_tree().await?;
    Ok(Json(serde_json::to_value(&*tree)?))
}

pub async fn divisions_resolve(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse> {
    let tree = state.session.division_tree().await?;
    // 解析失败不是错误，是"无选中"
    let view = tree.resolve(&query.path).map(|node| DivisionView {
        id: node.id.clone(),
        name: node.name.clone(),
        path: tree.build_path(&node.id),
        device_count: node.device_count,
    });
    Ok(Json(view))
}

/// 级联选择器一次交互的无状态模拟：打开、逐层选择、提交
#[derive(Deserialize)]
pub struct CascadeRequest {
    pub current_path: Option<String>,
    /// (层, 选中 id) 的顺序操作
    #[serde(default)]
    pub selections: Vec<(usize, String)>,
}

#[derive(Serialize)]
pub struct CascadeResponse {
    pub path: String,
    pub division: String,
}

pub async fn divisions_cascade(
    State(state): State<AppState>,
    Json(request): Json<CascadeRequest>,
) -> Result<impl IntoResponse> {
    let tree = state.session.division_tree().await?;
    let mut selector = CascadingSelector::open(&tree, request.current_path.as_deref());
    for (depth, id) in &request.selections {
        selector.select(*depth, id);
    }
    match selector.apply() {
        Some((path, node)) => {
            let division = node.id.clone();
            state.session.select_path(&path).await;
            Ok(Json(Some(CascadeResponse { path, division })))
        }
        None => Ok(Json(None)),
    }
}

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub parent_id: String,
    pub name: String,
}

pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse> {
    state
        .session
        .create_group(&request.parent_id, &request.name)
        .await?;
    Ok(StatusCode::CREATED)
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.session.delete_group(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
}

pub async fn search_groups(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<GroupHit>>> {
    // 过期响应（None）返回空列表，调用方的新请求随后就到
    let hits = state.search.search(&query.keyword).await?.unwrap_or_default();
    Ok(Json(hits))
}

// ===============
// 角色模板
// ===============

#[derive(Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub rules: RuleSet,
}

#[derive(Deserialize)]
pub struct EditTemplateRequest {
    pub name: Option<String>,
    pub rules: Option<RuleSet>,
}

pub async fn list_templates(State(state): State<AppState>) -> Result<Json<Vec<RoleTemplate>>> {
    Ok(Json(state.templates.list().await?))
}

pub async fn create_template(
    State(state): State<AppState>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<Json<RoleTemplate>> {
    let template = state.templates.create(&request.name, &request.rules).await?;
    Ok(Json(template))
}

pub async fn edit_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EditTemplateRequest>,
) -> Result<Json<RoleTemplate>> {
    let template = state
        .templates
        .edit(id, request.name.as_deref(), request.rules.as_ref())
        .await?;
    Ok(Json(template))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.templates.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===============
// 权限矩阵
// ===============

#[derive(Deserialize)]
pub struct MatrixRequest {
    pub current: RuleSet,
    pub accepted: Option<RuleSet>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Serialize)]
pub struct MatrixRow {
    pub subject: Subject,
    pub cells: Vec<MatrixCell>,
}

#[derive(Serialize)]
pub struct MatrixCell {
    pub action: Action,
    pub state: CellState,
}

pub async fn permissions_matrix(
    Json(request): Json<MatrixRequest>,
) -> Result<Json<Vec<MatrixRow>>> {
    let editor = PermissionEditor::new(request.current, request.accepted, request.disabled);
    let rows = editor
        .matrix()
        .into_iter()
        .map(|(subject, cells)| MatrixRow {
            subject,
            cells: cells
                .into_iter()
                .map(|(action, state)| MatrixCell { action, state })
                .collect(),
        })
        .collect();
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub current: RuleSet,
    pub accepted: Option<RuleSet>,
    pub subject: Subject,
    pub action: Action,
}

pub async fn permissions_toggle(
    Json(request): Json<ToggleRequest>,
) -> Result<Json<RuleSet>> {
    let mut editor = PermissionEditor::new(request.current, request.accepted, false);
    let next = editor.toggle(request.subject, request.action);
    Ok(Json(next))
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub email: String,
    pub group_id: String,
    pub current: RuleSet,
    pub accepted: Option<RuleSet>,
}

/// 保存目标用户的权限：提交前强制与授权上限求交（纵深防御）
pub async fn permissions_submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse> {
    let editor = PermissionEditor::new(request.current, request.accepted, false);
    let payload = editor.sanitized_for_submit();
    let user = state
        .gateway
        .edit_user(&request.email, &request.group_id, &payload)
        .await?;
    Ok(Json(user))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
