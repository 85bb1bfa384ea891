//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
///
/// The schema holds several statements, so it goes through the simple query
/// protocol; a prepared statement accepts only one.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
///
/// `top_factors` is `JSON`, not `JSONB`, so the rank order of its keys survives.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    username VARCHAR(255) NOT NULL,
    doc_id VARCHAR(32) NOT NULL,
    pregnancies BIGINT,
    glucose DOUBLE PRECISION,
    blood_pressure DOUBLE PRECISION,
    skin_thickness DOUBLE PRECISION,
    insulin DOUBLE PRECISION,
    bmi DOUBLE PRECISION,
    diabetes_pedigree_function DOUBLE PRECISION,
    age BIGINT,
    prediction_class SMALLINT NOT NULL,
    top_factors JSON NOT NULL,
    score DOUBLE PRECISION NOT NULL,
    report_date VARCHAR(10),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (username, doc_id)
);

CREATE INDEX IF NOT EXISTS idx_predictions_username_created
    ON predictions(username, created_at);
"#;
