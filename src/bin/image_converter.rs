use anyhow::{Context, Result};
use tracing::info;

use imagegram::db::{self, SqliteImageStore};
use imagegram::{config, job};

/// Convert every pending upload once and exit.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cfg = config::load(None)?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;
    let store = SqliteImageStore::new(pool.clone());

    info!("starting image conversion");
    let report = job::run_conversion(
        &store,
        &cfg.image_dir(),
        cfg.conversion.width,
        cfg.conversion.height,
    )
    .await
    .context("image conversion failed")?;

    pool.close().await;
    info!(
        converted = report.converted,
        failed = report.failed,
        skipped = report.skipped,
        "image conversion finished"
    );
    Ok(())
}
