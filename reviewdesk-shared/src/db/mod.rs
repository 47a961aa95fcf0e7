/// Database layer
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded schema migrations
///
/// Query functions live on the models in the crate's `models` module.

pub mod migrations;
pub mod pool;
