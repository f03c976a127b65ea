use std::net::SocketAddr;

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "homeledger={level},server={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let server = settings.server;
    let db = parse_database(&server.database).await?;

    let mut builder = engine::Engine::builder().database(db);
    if let Some(invitations) = settings.invitations {
        let ttl = chrono::Duration::try_days(invitations.ttl_days)
            .ok_or_else(|| format!("invitations.ttl_days out of range: {}", invitations.ttl_days))?;
        builder = builder.invitation_ttl(ttl);
    }
    let engine = builder.build().await?;
    tracing::debug!(
        ttl_days = engine.invitation_ttl().num_days(),
        "engine ready"
    );

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, server.port).parse()?;
    tracing::info!("starting homeledger on {addr}");
    server::run(engine, addr).await;

    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    tracing::debug!("database migrated");
    Ok(database)
}
