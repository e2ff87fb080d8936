use anyhow::Context;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use storage::Database;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod middleware;
mod state;

#[cfg(test)]
mod test_support;

use config::Config;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::participants::handlers::list_participants,
        features::participants::handlers::get_participant,
        features::participants::handlers::list_nisn,
        features::participants::handlers::create_participant,
        features::participants::handlers::import_participants,
        features::participants::handlers::import_participants_file,
        features::participants::handlers::update_participant,
        features::participants::handlers::delete_participant,
        features::participants::handlers::record_exam_result,
        features::statistics::handlers::get_statistics,
        features::auth::handlers::login,
        features::auth::handlers::logout,
        features::auth::handlers::me,
        features::health::handlers::health,
    ),
    components(
        schemas(
            storage::dto::participant::CreateParticipantRequest,
            storage::dto::participant::UpdateParticipantRequest,
            storage::dto::participant::CreateParticipantResponse,
            storage::dto::participant::GeneratedCredentials,
            storage::dto::participant::ParticipantDetailResponse,
            storage::dto::participant::ImportParticipantsRequest,
            storage::dto::participant::ImportRowStatus,
            storage::dto::participant::ImportRowResult,
            storage::dto::participant::ImportSummary,
            features::participants::handlers::ImportFileForm,
            storage::dto::exam_result::CreateExamResultRequest,
            storage::dto::statistics::StatisticsResponse,
            storage::dto::auth::LoginRequest,
            storage::dto::auth::LoginResponse,
            storage::dto::auth::SessionInfo,
            storage::dto::auth::AdminInfo,
            storage::dto::common::PaginationMeta,
            storage::dto::common::MessageResponse,
            storage::dto::common::FieldError,
            storage::dto::common::ErrorResponse,
            storage::models::Participant,
            storage::models::ParticipantStatus,
            storage::models::ExamResult,
            storage::models::AdminRole,
            features::health::handlers::HealthResponse,
        )
    ),
    tags(
        (name = "participants", description = "Exam participant administration"),
        (name = "statistics", description = "Dashboard counters"),
        (name = "auth", description = "Admin sessions"),
        (name = "health", description = "Liveness probe"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("Session token")
                        .build(),
                ),
            )
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting TKA13 API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    let sessions = config.session_settings()?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Opening database at: {}", config.database_url);
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    match (&config.admin_username, &config.admin_password) {
        (Some(username), Some(password)) => {
            features::auth::services::ensure_bootstrap_admin(db.pool(), username, password)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create bootstrap admin: {e}"))?;
        }
        _ => tracing::debug!("ADMIN_USERNAME/ADMIN_PASSWORD not set, skipping admin bootstrap"),
    }

    let state = AppState { db, sessions };

    let app = features::router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
