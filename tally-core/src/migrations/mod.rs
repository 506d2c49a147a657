//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary at build time using include_str!.
//! Each migration is a tuple of (name, sql_content), applied in order and
//! recorded in the database's own `sys_migrations` table.
//!
//! IMPORTANT: When adding a new migration:
//! 1. Create the SQL file: NNN_description.sql
//! 2. Add an entry to the matching list in order

/// Name of the bootstrap migration that creates `sys_migrations`
pub const BOOTSTRAP: &str = "000_migrations.sql";

/// Migrations for the main data database (tally.duckdb)
pub const MIGRATIONS: &[(&str, &str)] = &[
    (BOOTSTRAP, include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
    ("002_seed_currencies.sql", include_str!("002_seed_currencies.sql")),
];

/// Migrations for the event log database (logs.duckdb)
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    (BOOTSTRAP, include_str!("logs/000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("logs/001_initial_schema.sql")),
];
