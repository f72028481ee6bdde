use acl_client::{
    AdminGateway, GatewayConfig, HttpAdminGateway, MemoryAdminGateway, SearchSession,
};
use acl_engine::{RoleTemplateStore, SessionStore};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

mod routes;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("acl-api starting");

    // 配置了 ADMIN_API_URL 时走远端协作方，否则用内存网关本地演示
    let gateway: Arc<dyn AdminGateway> = match std::env::var("ADMIN_API_URL") {
        Ok(_) => Arc::new(HttpAdminGateway::new(GatewayConfig::from_env())?),
        Err(_) => Arc::new(MemoryAdminGateway::new("g-root", "总部")),
    };

    let state = AppState {
        session: Arc::new(SessionStore::new(gateway.clone())),
        templates: Arc::new(RoleTemplateStore::new(gateway.clone())),
        search: Arc::new(SearchSession::new(gateway.clone())),
        gateway,
    };

    let app = Router::new()
        .route("/api/v1/health", get(routes::health))
        .route("/api/v1/divisions/tree", get(routes::divisions_tree))
        .route("/api/v1/divisions/resolve", get(routes::divisions_resolve))
        .route("/api/v1/divisions/cascade", post(routes::divisions_cascade))
        .route("/api/v1/divisions/search", get(routes::search_groups))
        .route(
            "/api/v1/divisions",
            post(routes::create_group),
        )
        .route(
            "/api/v1/divisions/:id",
            axum::routing::delete(routes::delete_group),
        )
        .route(
            "/api/v1/role-templates",
            get(routes::list_templates).post(routes::create_template),
        )
        .route(
            "/api/v1/role-templates/:id",
            axum::routing::patch(routes::edit_template).delete(routes::delete_template),
        )
        .route("/api/v1/permissions/matrix", post(routes::permissions_matrix))
        .route("/api/v1/permissions/toggle", post(routes::permissions_toggle))
        .route("/api/v1/permissions/submit", post(routes::permissions_submit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8090);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let fmt_layer = fmt::layer().with_target(false);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).ok();
}
