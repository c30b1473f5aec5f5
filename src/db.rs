use crate::config::AppConfig;
use crate::errors::ServiceError;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement,
};
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

/// Establishes a connection pool to the database
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    info!(
        max_connections = config.max_connections,
        "Connecting to database"
    );

    let db_pool = Database::connect(opt)
        .await
        .map_err(ServiceError::DatabaseError)?;

    Ok(db_pool)
}

/// Establishes a connection using the application configuration.
pub async fn establish_connection_from_app_config(
    config: &AppConfig,
) -> Result<DbPool, ServiceError> {
    let db_config = DbConfig {
        url: config.database_url.clone(),
        max_connections: config.db_max_connections,
        min_connections: config.db_min_connections,
        connect_timeout: Duration::from_secs(config.db_connect_timeout_secs),
        idle_timeout: Duration::from_secs(config.db_idle_timeout_secs),
        acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
    };

    establish_connection_with_config(&db_config).await
}

/// Bootstraps the schema on an SQLite connection (tests and development).
///
/// Production deployments own their migrations; this helper only covers the
/// tables the engine reads and writes.
pub async fn ensure_schema(db: &DbPool) -> Result<(), ServiceError> {
    if db.get_database_backend() != DatabaseBackend::Sqlite {
        return Err(ServiceError::InternalError(
            "schema bootstrap is only supported on SQLite; use migrations".to_string(),
        ));
    }

    let ddl = [
        r#"CREATE TABLE IF NOT EXISTS products (
            id blob PRIMARY KEY NOT NULL,
            sku text NOT NULL UNIQUE,
            name text NOT NULL,
            barcode text,
            unit_of_measure text NOT NULL,
            warehouse text NOT NULL,
            stock_max integer NOT NULL,
            stock_min integer NOT NULL,
            reorder_point integer NOT NULL,
            created_at text NOT NULL,
            updated_at text
        );"#,
        r#"CREATE TABLE IF NOT EXISTS lots (
            id blob PRIMARY KEY NOT NULL,
            product_id blob NOT NULL REFERENCES products (id),
            lot_number text NOT NULL,
            quantity integer NOT NULL,
            expiration_date text,
            received_date text NOT NULL,
            created_at text NOT NULL,
            updated_at text NOT NULL
        );"#,
        r#"CREATE TABLE IF NOT EXISTS stock_movements (
            id blob PRIMARY KEY NOT NULL,
            product_id blob NOT NULL REFERENCES products (id),
            lot_id blob,
            kind text NOT NULL,
            occurred_at text NOT NULL,
            quantity integer NOT NULL,
            unit_value real,
            total_value real,
            note text,
            created_at text NOT NULL
        );"#,
        r#"CREATE TABLE IF NOT EXISTS purchase_orders (
            id blob PRIMARY KEY NOT NULL,
            status text NOT NULL,
            value real NOT NULL,
            order_date text NOT NULL,
            expected_date text NOT NULL,
            delivery_date text NOT NULL,
            notes text,
            created_at text NOT NULL,
            updated_at text,
            version integer NOT NULL
        );"#,
        r#"CREATE TABLE IF NOT EXISTS purchase_order_items (
            id blob PRIMARY KEY NOT NULL,
            order_id blob NOT NULL REFERENCES purchase_orders (id) ON DELETE CASCADE,
            product_id blob NOT NULL REFERENCES products (id),
            lot_id blob NOT NULL,
            quantity integer NOT NULL,
            unit_price real NOT NULL,
            created_at text NOT NULL
        );"#,
    ];

    for statement in ddl {
        db.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            statement.to_string(),
        ))
        .await
        .map_err(ServiceError::DatabaseError)?;
    }

    debug!("Schema bootstrap complete");
    Ok(())
}
