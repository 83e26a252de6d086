use log::info;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

pub async fn migrate(pool: &MySqlPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Applying database migrations");
    sqlx::migrate!("./migrations").run(pool).await
}

/// A pool that never connects until used; for tests of paths that stop before the database.
#[cfg(test)]
pub fn lazy_pool() -> MySqlPool {
    MySqlPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&Config::for_tests().database_url)
        .unwrap()
}

/// A migrated pool on `TEST_DATABASE_URL`, or `None` when no test database is configured.
#[cfg(test)]
pub async fn test_database() -> Option<MySqlPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = MySqlPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    Some(pool)
}
