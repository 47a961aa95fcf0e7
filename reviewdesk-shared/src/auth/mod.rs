/// Request authorization
///
/// Everything needed to decide who is calling, which account they act on,
/// and whether that is allowed.
///
/// # Modules
///
/// - [`credentials`]: bearer and session-cookie extraction
/// - [`identity`]: identity verification and the fixed-field [`identity::User`]
/// - [`jwt`]: local HS256 verification of identity-service tokens
/// - [`remote`]: verification through the identity service's user endpoint
/// - [`tenant`]: account resolution from the `X-Selected-Account` hint
/// - [`authorization`]: membership, owner, admin and member-management checks
/// - [`side_channel`]: cron secret and webhook signature gates
/// - [`audit`]: fire-and-forget audit sink
/// - [`resolver`]: the composed pipeline
/// - [`error`]: the failure taxonomy and its HTTP statuses

pub mod audit;
pub mod authorization;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod remote;
pub mod resolver;
pub mod side_channel;
pub mod tenant;
