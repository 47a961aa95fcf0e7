/// Database models
///
/// - [`account`]: accounts (tenants)
/// - [`membership`]: user-account links with roles
/// - [`admin`]: platform administrators
/// - [`audit`]: append-only security audit trail

pub mod account;
pub mod admin;
pub mod audit;
pub mod membership;
