use crate::config::{Config, DatabaseType};
use log::info;
use self::migration::Migrator;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use std::io;
use std::path::Path;
use tokio::fs::{create_dir_all, File};

pub mod entities;
pub mod migration;

pub type DbResult<T> = Result<T, sea_orm::DbErr>;

/// Connects to the durable store selected by the configuration and
/// brings the schema up to date
pub async fn connect(config: &Config) -> io::Result<DatabaseConnection> {
    info!("Connecting to database..");

    let con_str = match config.database_type {
        DatabaseType::Sqlite => {
            // Ensure the backing file exists before sqlite opens it
            let db_file = config.database_url.trim_start_matches("sqlite:");
            let file_path = Path::new(db_file);
            if let Some(parent) = file_path.parent() {
                if !parent.exists() {
                    create_dir_all(parent).await?;
                }
            }
            if !file_path.exists() {
                File::create(file_path).await?;
            }
            format!("sqlite:{db_file}")
        }
        DatabaseType::Postgresql => config.database_url.clone(),
    };

    let mut options = sea_orm::ConnectOptions::new(con_str.clone());
    // Bounded pool shared by the read path at startup and the write worker
    options.min_connections(2).max_connections(15);

    let connection = sea_orm::Database::connect(options).await.map_err(|err| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Unable to create database connection: {err:?}"),
        )
    })?;

    info!("Running migrations...");

    Migrator::up(&connection, None).await.map_err(|err| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Unable to run database migrations: {err:?}"),
        )
    })?;

    info!("Migrations complete.");

    Ok(connection)
}
