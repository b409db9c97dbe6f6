use dotenvy::dotenv;
use stockroom::{
    config::{database, settings},
    core::catalog,
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Load .env file (non-fatal, env vars can be set externally)
    let dotenv_loaded = dotenv().is_ok();

    // 2. Load settings; the log filter comes from them unless RUST_LOG is set
    let settings = settings::load_default_settings()?;

    // 3. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter)),
        )
        .init();
    info!(dotenv_loaded, audit_strict = settings.audit.strict, "Startup: settings loaded");

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&settings.database.url)
        .await
        .inspect_err(|e| error!(error = %e, "Startup: database connection failed"))?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!(error = %e, "Startup: schema creation failed"))?;

    let products = catalog::get_all_active_products(&db).await?;
    info!(active_products = products.len(), "Startup: ready");

    Ok(())
}
