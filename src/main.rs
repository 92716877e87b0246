use axum::{
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use exam_portal_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::auth::{require_admin, require_bearer_auth},
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let auth_routes = Router::new()
        .route(
            "/api/candidate/login",
            post(routes::candidate_routes::login),
        )
        .route("/api/admin/register", post(routes::admin_routes::register_admin))
        .route("/api/admin/login", post(routes::admin_routes::admin_login));

    let candidate_api = Router::new()
        .route(
            "/api/candidate/profile",
            get(routes::candidate_routes::profile),
        )
        .route(
            "/api/candidate/mcqs",
            get(routes::candidate_routes::assigned_mcqs),
        )
        .route(
            "/api/candidate/exam/start",
            post(routes::candidate_routes::start_exam),
        )
        .route(
            "/api/candidate/exam/answer",
            patch(routes::candidate_routes::save_answer),
        )
        .route(
            "/api/candidate/exam/answers",
            get(routes::candidate_routes::saved_answers),
        )
        .route(
            "/api/candidate/exam/submit",
            post(routes::candidate_routes::submit_exam),
        )
        .layer(from_fn(require_bearer_auth));

    let admin_api = Router::new()
        .route("/api/admin/batches", post(routes::admin_routes::create_batch))
        .route(
            "/api/admin/questions/import",
            post(routes::admin_routes::import_questions),
        )
        .route(
            "/api/admin/batches/:batch_id/candidates",
            get(routes::admin_routes::batch_candidates),
        )
        .route(
            "/api/admin/batches/:batch_id/assign",
            post(routes::admin_routes::assign_questions),
        )
        .route(
            "/api/admin/batches/:batch_id/results",
            get(routes::admin_routes::batch_results),
        )
        .layer(from_fn(require_admin));

    let app = base_routes
        .merge(auth_routes)
        .merge(candidate_api)
        .merge(admin_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
