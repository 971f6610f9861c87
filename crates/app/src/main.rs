mod seed;

use anyhow::Context;
use tracing::{error, info};

use crazyzoo_infra::{AnimalRepository, SqliteAnimalRepository, ZooConfig};
use crazyzoo_runtime::{RuntimeConfig, ZooRuntime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crazyzoo_observability::init();

    let config = ZooConfig::from_env().context("invalid configuration")?;
    info!(database = %config.database_url, log_format = %config.log_format, "starting crazy zoo");

    let database_path = config.database_path();
    if let Some(parent) = database_path.as_deref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let repo = SqliteAnimalRepository::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    let zoo = ZooRuntime::spawn(
        config.log_format.open_sink(),
        RuntimeConfig::default().with_night_interval(config.night_interval),
    );

    let mut feed = zoo.narrations();
    tokio::spawn(async move {
        while let Some(narration) = feed.recv().await {
            println!("{}", narration.line);
        }
    });

    zoo.narrate("🎉 Welcome to the Crazy Zoo!").await?;

    let stored = repo.get_all_enclosures().await.context("failed to read the store")?;
    if stored.is_empty() {
        seed::populate(&zoo).await.context("failed to seed the demo zoo")?;
    } else {
        zoo.load_from(&repo).await.context("failed to load the zoo")?;
    }

    zoo.start_cycle().await?;
    let snapshot = zoo.snapshot().await?;
    for enclosure in snapshot.enclosures() {
        zoo.drop_food(enclosure.name(), "fresh food").await?;
    }

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    info!("shutting down");

    if let Err(e) = zoo.save_to(&repo).await {
        error!(error = %e, "saving the zoo failed");
    }
    zoo.save_logs(&config.log_path)
        .await
        .with_context(|| format!("failed to write {}", config.log_path.display()))?;
    zoo.shutdown().await?;
    Ok(())
}
