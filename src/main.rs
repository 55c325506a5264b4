//! Singlend demo server.
//!
//! Serves a small profile API behind one endpoint:
//!
//! ```text
//!   POST /api/singlend {"type": "getIcon",            "query": {}}
//!   POST /api/singlend {"type": "setIcon",            "query": {"id": "@123", "iconUrl": "a.png"}}
//!   POST /api/singlend {"type": "setBackgroundColor", "query": {"backgroundColor": "#ffffff"}}
//! ```
//!
//! `setIcon` lives in a group that checks the `id` before the route runs.

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use singlend::config::{load_config, ServerConfig};
use singlend::lifecycle::startup;
use singlend::observability::logging;
use singlend::{Schema, Singlend, SinglendOptions};

#[derive(Parser)]
#[command(name = "singlend")]
#[command(about = "Multiple operations on a single endpoint", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "singlend starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        path = %config.endpoint.path,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let api = profile_api(config.endpoint.strict_schema);
    startup::run(config, api).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn profile_api(strict_schema: bool) -> Singlend {
    let icons = Singlend::with_options(SinglendOptions { strict_schema }).on(
        "getIcon",
        Schema::object(json!({})),
        |_query, r| async move { r.ok(json!({ "iconUrl": "default.png" })) },
    );

    Singlend::with_options(SinglendOptions { strict_schema })
        .group(
            Schema::object(json!({ "id": { "type": "string" } })),
            |query, g| async move {
                match query["id"].as_str().and_then(|id| id.strip_prefix('@')) {
                    Some(id) => g.next(id.to_string()),
                    None => g.error(json!({ "message": "Invalid id" })),
                }
            },
            |scope| {
                scope.on(
                    "setIcon",
                    Schema::object(json!({ "iconUrl": { "type": "string" } })),
                    |query, id: String, r| async move {
                        let icon = query["iconUrl"].as_str().unwrap_or_default();
                        r.ok(json!({ "message": format!("Set icon of {id} to {icon}") }))
                    },
                )
            },
        )
        .on(
            "setBackgroundColor",
            Schema::object(json!({
                "backgroundColor": { "type": "string", "minLength": 7, "maxLength": 7 }
            })),
            |query, r| async move {
                let color = query["backgroundColor"].as_str().unwrap_or_default();
                if !color.starts_with('#') {
                    return r.error(json!({ "message": "Invalid background color" }));
                }
                r.ok(json!({ "message": format!("Set background color to {color}") }))
            },
        )
        .mount([icons])
}
