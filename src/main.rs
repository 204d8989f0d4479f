use calendar_app::ai::GeminiClient;
use calendar_app::db;
use calendar_app::routes::{app, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://calendar.db?mode=rwc".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(3000);

    let pool = db::connect(&database_url).await?;
    db::init(&pool).await?;
    log::info!("Connected to {database_url}");

    let ai = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => Some(GeminiClient::new(key)),
        _ => {
            log::warn!("GEMINI_API_KEY not set; smart add is disabled");
            None
        }
    };

    let state = AppState { db: pool, ai };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("Calendar server listening on port {port}");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
