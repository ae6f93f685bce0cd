use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::audit::AuditLog;
use crate::auth::middleware::throttle;
use crate::auth::{create_admin, DbCredentialVerifier, LoginGuard, LoginService, RateLimiter};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::controllers::AppState;
use crate::migrations::Migrator;
use crate::openapi::ApiDoc;
use crate::parking::ParkingService;
use crate::routing;

const ADMIN_PASSWORD_VAR: &str = "TUPARK_ADMIN_PASSWORD";

/// Scalar UI path; the raw document is served at `{API_DOCS_PATH}/openapi.json`.
const API_DOCS_PATH: &str = "/api-docs";

/// The TUPark application.
pub struct App {
    pub config: Config,
    pub db: DatabaseConnection,
    pub audit: AuditLog,
    pub guard: Arc<LoginGuard>,
    throttle: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Create the application from environment configuration.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::from_env()?;
        Self::with_config(config).await
    }

    /// Create the application with a given config.
    pub async fn with_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = crate::db::connect(&config).await?;

        // Check for CLI operations (--migrate, --rollback, --create-admin) and exit if present
        Self::handle_cli_args(&db).await?;

        tracing::info!("Running pending database migrations...");
        Migrator::up(&db, None).await?;
        tracing::info!("Migrations complete.");

        let security = &config.security;
        let audit = AuditLog::database(db.clone(), security.audit_max_entries);
        let guard = Arc::new(LoginGuard::in_memory(
            security.lockout_policy(),
            security.attempt_cache_capacity,
        ));
        let throttle = Arc::new(RateLimiter::new(
            security.rate_limit_max_requests,
            security.rate_limit_window_secs,
        ));

        ParkingService::new(db.clone(), audit.clone())
            .ensure_slots(&config.parking_slots)
            .await?;

        Ok(App {
            config,
            db,
            audit,
            guard,
            throttle,
            clock: Arc::new(SystemClock),
        })
    }

    /// Handle CLI operations passed as command-line arguments.
    /// If one is detected, perform it and exit the process.
    async fn handle_cli_args(db: &DatabaseConnection) -> Result<(), Box<dyn std::error::Error>> {
        let args: Vec<String> = std::env::args().collect();

        if args.contains(&"--migrate".to_string()) {
            tracing::info!("Running pending database migrations...");
            Migrator::up(db, None).await?;
            tracing::info!("Migrations complete.");
            std::process::exit(0);
        }

        if let Some(pos) = args.iter().position(|arg| arg == "--rollback") {
            let steps = args
                .get(pos + 1)
                .and_then(|raw| raw.parse::<u32>().ok())
                .unwrap_or(1);
            tracing::info!("Rolling back {} migration(s)...", steps);
            Migrator::down(db, Some(steps)).await?;
            tracing::info!("Rollback complete.");
            std::process::exit(0);
        }

        if let Some(pos) = args.iter().position(|arg| arg == "--create-admin") {
            let username = args
                .get(pos + 1)
                .ok_or("--create-admin requires a username")?;
            let password = std::env::var(ADMIN_PASSWORD_VAR)
                .map_err(|_| format!("{} must be set to create an administrator", ADMIN_PASSWORD_VAR))?;
            Migrator::up(db, None).await?;
            let admin = create_admin(db, username, &password).await?;
            tracing::info!(username = %admin.username, "Administrator created");
            std::process::exit(0);
        }

        Ok(())
    }

    /// Replace the clock used for lockout decisions.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Login flow wired to this application's guard, audit log and user table.
    pub fn login_service(&self) -> LoginService {
        LoginService::new(
            self.guard.clone(),
            Arc::new(DbCredentialVerifier::new(self.db.clone())),
            self.audit.clone(),
            self.clock.clone(),
        )
    }

    /// Build the Axum router.
    pub fn router(&self) -> Router {
        let config = Arc::new(self.config.clone());

        let state = AppState {
            config: config.clone(),
            login: self.login_service(),
            audit: self.audit.clone(),
            parking: ParkingService::new(self.db.clone(), self.audit.clone()),
        };

        let openapi_spec = ApiDoc::openapi();
        let openapi_json = openapi_spec.clone();
        let json_path = format!("{}/openapi.json", API_DOCS_PATH);

        let mut router = Router::new()
            .route("/", get(welcome))
            .merge(routing::build_routes().with_state(state))
            .merge(Scalar::with_url(API_DOCS_PATH, openapi_spec))
            .route(
                &json_path,
                get(move || {
                    let spec = openapi_json.clone();
                    async move { axum::Json(spec) }
                }),
            );

        if self.config.security.enable_rate_limit {
            router = router.layer(axum::middleware::from_fn_with_state(
                self.throttle.clone(),
                throttle,
            ));
        }

        let x_request_id = axum::http::HeaderName::from_static("x-request-id");
        router
            .layer(axum::Extension(config))
            .layer(CorsLayer::permissive())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::DEBUG))
                    .on_response(
                        DefaultOnResponse::new()
                            .level(tracing::Level::INFO)
                            .latency_unit(LatencyUnit::Millis),
                    ),
            )
    }

    /// Run the application server until Ctrl+C.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.server_addr();
        let router = self.router();

        if self.config.security.enable_rate_limit {
            let limiter = self.throttle.clone();
            let period = limiter.window().max(Duration::from_secs(1));
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    limiter.cleanup();
                }
            });
        }

        println!("\n🅿️  TUPark server is running!");
        println!("   → Server:   http://{}", addr);
        println!("   → API docs: http://{}{}", addr, API_DOCS_PATH);
        println!();

        tracing::info!("TUPark server running on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutting down TUPark server...");
}

#[derive(Serialize)]
struct WelcomeMessage {
    message: &'static str,
    docs: &'static str,
    status: &'static str,
}

/// Welcome page at `/`.
async fn welcome() -> impl IntoResponse {
    axum::Json(WelcomeMessage {
        message: "Welcome to TUPark",
        docs: API_DOCS_PATH,
        status: "running",
    })
}
