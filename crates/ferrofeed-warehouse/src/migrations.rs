//! Schema migrations, tracked in `schema_migrations`.

use ::duckdb::{params, Connection};
use tracing::debug;

/// Ordered `(version, sql)` pairs; never edit an applied entry.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    r"
CREATE TABLE IF NOT EXISTS cache_entries (
    kind VARCHAR NOT NULL,
    symbol VARCHAR NOT NULL,
    payload VARCHAR NOT NULL,
    record_count BIGINT NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (kind, symbol)
);
",
)];

/// Apply every migration newer than the recorded schema version.
///
/// # Errors
/// Returns an error if a migration statement fails; the failing migration
/// is rolled back and later ones are not attempted.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version BIGINT PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )?;

    let current = schema_version(connection)?;

    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
        connection.execute_batch("BEGIN TRANSACTION")?;
        let applied = connection.execute_batch(sql).and_then(|()| {
            connection
                .execute(
                    "INSERT INTO schema_migrations (version) VALUES (?)",
                    params![version],
                )
                .map(|_| ())
        });

        match applied {
            Ok(()) => {
                connection.execute_batch("COMMIT")?;
                debug!(version, "applied warehouse migration");
            }
            Err(error) => {
                let _ = connection.execute_batch("ROLLBACK");
                return Err(error);
            }
        }
    }

    Ok(())
}

/// Highest applied migration version, `0` for a fresh database.
///
/// # Errors
/// Returns an error if `schema_migrations` cannot be read.
pub fn schema_version(connection: &Connection) -> Result<i64, ::duckdb::Error> {
    let version: Option<i64> =
        connection.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}
