//! sim-leaderboard — ranked results for completed life-simulation runs
//!
//! Usage:
//!   sim-leaderboard serve --port 3001              — Launch the leaderboard API
//!   sim-leaderboard top --starting-point rural     — Print the leaderboard
//!   sim-leaderboard import runs.json               — Bulk-load recorded runs

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use engine::{
    get_leaderboard, import_entries, leaderboard_stats, submit_entry, InMemoryStore,
    LeaderboardEntry, LeaderboardError, LeaderboardQuery, LeaderboardStore, NewEntry,
    SqliteStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

const DEFAULT_DB_PATH: &str = "data/leaderboard.db";

#[derive(Parser)]
#[command(name = "sim-leaderboard")]
#[command(about = "Leaderboard service for completed simulation runs", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the leaderboard web server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 3001)]
        port: u16,
        /// Keep entries in memory only (nothing survives a restart)
        #[arg(long)]
        memory: bool,
        /// Evaluate filters, ordering and limit inside the store instead of a full scan
        #[arg(long)]
        pushdown: bool,
    },
    /// Print the leaderboard from the database
    Top {
        /// Only runs with this starting point ("all" for every one)
        #[arg(long)]
        starting_point: Option<String>,
        /// Only runs with this parental income tier ("all" for every one)
        #[arg(long)]
        tier: Option<String>,
        /// Number of entries (0 or absent = 100)
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Import a JSON array of runs (all or nothing)
    Import {
        /// Path to the JSON file
        file: String,
    },
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn LeaderboardStore>,
    pushdown: bool,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "debug,engine=debug,persistence=debug,sim_leaderboard=debug"
    } else {
        "info,engine=info,persistence=info,sim_leaderboard=info,sqlx=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn db_path() -> String {
    std::env::var("LEADERBOARD_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())
}

async fn open_sqlite(db_path: &str) -> anyhow::Result<SqliteStore> {
    let db = persistence::Database::new(db_path).await.map_err(|e| {
        error!("Failed to initialize database: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;
    info!("Database initialized: {}", db_path);
    Ok(SqliteStore::new(db))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve {
            host,
            port,
            memory,
            pushdown,
        } => {
            cmd_serve(&host, port, memory, pushdown).await?;
        }
        Commands::Top {
            starting_point,
            tier,
            limit,
            json,
        } => {
            let query = LeaderboardQuery {
                starting_point,
                parental_income_tier: tier,
                limit,
            };
            cmd_top(query, json).await?;
        }
        Commands::Import { file } => {
            cmd_import(&file).await?;
        }
    }

    Ok(())
}

// ============================================================================
// Serve command — Axum web server
// ============================================================================

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(api_health))
        .route("/leaderboard", get(api_leaderboard).post(api_submit_entry))
        .route("/leaderboard/stats", get(api_leaderboard_stats))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}

async fn cmd_serve(host: &str, port: u16, memory: bool, pushdown: bool) -> anyhow::Result<()> {
    info!("sim-leaderboard v{} starting...", APP_VERSION);

    let db_path = db_path();
    let store: Arc<dyn LeaderboardStore> = if memory {
        warn!("In-memory store: entries are lost on shutdown");
        Arc::new(InMemoryStore::new())
    } else {
        Arc::new(open_sqlite(&db_path).await?)
    };

    let state = AppState { store, pushdown };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Front-end bundle, if one was built next to the binary or in the cwd
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let dist_dir = exe_dir.join("dist");
    let static_dir = if dist_dir.exists() {
        dist_dir
    } else {
        std::path::PathBuf::from("dist")
    };

    let app = build_router(state)
        .fallback_service(ServeDir::new(&static_dir))
        .layer(cors);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== sim-leaderboard v{} ===", APP_VERSION);
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET  /api/health              - Health check");
    println!("  GET  /api/leaderboard         - Ranked entries (startingPoint, parentalIncomeTier, limit)");
    println!("  POST /api/leaderboard         - Record a completed run");
    println!("  GET  /api/leaderboard/stats   - Entry count, filter values, score range");
    if memory {
        println!("\n  Store: in-memory");
    } else {
        println!("\n  Database: {}", db_path);
    }
    if pushdown {
        println!("  Query mode: pushdown");
    }
    println!("\nPress Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Ctrl+C received, shutting down");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Top command — print the leaderboard
// ============================================================================

async fn cmd_top(query: LeaderboardQuery, json: bool) -> anyhow::Result<()> {
    let store = open_sqlite(&db_path()).await?;
    let entries = get_leaderboard(&store, &query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("\n=== sim-leaderboard v{} ===", APP_VERSION);
    println!(
        "Starting point: {} | Income tier: {} | Limit: {}",
        query.starting_point_filter().unwrap_or("all"),
        query.parental_income_tier_filter().unwrap_or("all"),
        query.effective_limit()
    );
    if entries.is_empty() {
        println!("\nNo entries found.");
        return Ok(());
    }
    print_entries(&entries);
    Ok(())
}

fn print_entries(entries: &[LeaderboardEntry]) {
    println!(
        "\n  {:>3}  {:<20} {:<16} {:<12} {:>10}",
        "#", "Player", "Starting point", "Income tier", "Score"
    );
    println!("  {}", "-".repeat(66));
    for (i, e) in entries.iter().enumerate() {
        println!(
            "  {:>3}  {:<20} {:<16} {:<12} {:>10.1}",
            i + 1,
            e.player_name.as_deref().unwrap_or("-"),
            e.starting_point,
            e.parental_income_tier,
            e.final_score,
        );
    }
}

// ============================================================================
// Import command — bulk-load runs from JSON
// ============================================================================

async fn cmd_import(file: &str) -> anyhow::Result<()> {
    let store = open_sqlite(&db_path()).await?;
    let written = import_file(&store, file).await?;
    let total = store.count().await?;
    println!("Imported {} entries from {} ({} total)", written, file, total);
    Ok(())
}

/// Parse `file` as a JSON array of runs and store them all, or none
async fn import_file<S>(store: &S, file: &str) -> anyhow::Result<usize>
where
    S: LeaderboardStore + ?Sized,
{
    let raw = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", file, e))?;
    let entries: Vec<NewEntry> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("{} is not a JSON array of entries: {}", file, e))?;

    Ok(import_entries(store, entries).await?)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health
async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "sim-leaderboard",
        "version": APP_VERSION,
    }))
}

/// Query-string → query. An unparsable limit counts as absent.
fn parse_leaderboard_query(params: &HashMap<String, String>) -> LeaderboardQuery {
    LeaderboardQuery {
        starting_point: params.get("startingPoint").cloned(),
        parental_income_tier: params.get("parentalIncomeTier").cloned(),
        limit: params.get("limit").and_then(|s| s.trim().parse().ok()),
    }
}

fn error_status(e: &LeaderboardError) -> StatusCode {
    match e {
        LeaderboardError::InvalidEntry(_) => StatusCode::BAD_REQUEST,
        LeaderboardError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// GET /api/leaderboard — ranked entries
async fn api_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let query = parse_leaderboard_query(&params);

    let result = if state.pushdown {
        state.store.top_entries(&query).await
    } else {
        get_leaderboard(state.store.as_ref(), &query).await
    };

    match result {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "data": entries,
                "total": entries.len(),
                "limit": query.effective_limit(),
            })),
        ),
        Err(e) => {
            error!("Leaderboard query failed: {}", e);
            (
                error_status(&e),
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("Failed to query leaderboard: {}", e),
                    "data": [],
                    "total": 0,
                })),
            )
        }
    }
}

/// POST /api/leaderboard — record a completed run
async fn api_submit_entry(
    State(state): State<AppState>,
    body: Result<Json<NewEntry>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let entry = match body {
        Ok(Json(entry)) => entry,
        Err(rejection) => {
            warn!("Rejected leaderboard entry body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "error": rejection.body_text(),
                })),
            );
        }
    };

    match submit_entry(state.store.as_ref(), entry).await {
        Ok(stored) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "success": true,
                "entry": stored,
            })),
        ),
        Err(e) => {
            warn!("Rejected leaderboard entry: {}", e);
            (
                error_status(&e),
                Json(serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                })),
            )
        }
    }
}

/// GET /api/leaderboard/stats — aggregates for the filter pickers
async fn api_leaderboard_stats(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match leaderboard_stats(state.store.as_ref()).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "stats": stats,
                "generatedAt": Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => (
            error_status(&e),
            Json(serde_json::json!({
                "success": false,
                "error": format!("Failed to get leaderboard stats: {}", e),
            })),
        ),
    }
}
