/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `me`: The verified user
/// - `account`: The resolved account
/// - `members`: Account member listing and management
/// - `admin`: Platform admin account inspection
/// - `cron`: Scheduled maintenance jobs
/// - `webhooks`: Inbound provider webhooks

pub mod account;
pub mod admin;
pub mod cron;
pub mod health;
pub mod me;
pub mod members;
pub mod webhooks;
