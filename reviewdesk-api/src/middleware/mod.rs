/// Middleware modules for the API server
///
/// - `auth`: request authorization (user, account, admin, cron)
/// - `security`: security response headers

pub mod auth;
pub mod security;
