//! # TUPark server
//!
//! ## Run
//!
//! ```bash
//! cargo run -p tupark-server
//! ```
//!
//! ## Administration
//!
//! ```bash
//! # Apply migrations and exit
//! tupark --migrate
//!
//! # Create an administrator
//! TUPARK_ADMIN_PASSWORD=... tupark --create-admin admin
//! ```
//!
//! `LOG_FORMAT=compact|pretty|json` selects the log output.

use tupark_core::logging::{init_logging_as, LogFormat};
use tupark_core::App;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse::<LogFormat>().ok())
        .unwrap_or_default();
    init_logging_as(format);

    let app = App::new().await?;
    tracing::info!(
        lockout_max_attempts = app.config.security.lockout_max_attempts,
        audit_max_entries = app.config.security.audit_max_entries,
        "Configuration loaded"
    );
    app.run().await?;

    Ok(())
}
