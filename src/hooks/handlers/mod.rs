//! Hook handler implementations
//!
//! One handler per policy:
//! - language set registration
//! - password requirements for watched users
//! - failed login logging for watched users
//! - ACP login notification

mod admin_login;
mod failed_login;
mod language;
mod password;

pub use self::admin_login::{format_login_time, AdminLoginHandler};
pub use self::failed_login::{FailedLoginHandler, LOG_TEAM_AUTH_FAIL, USER_LOG};
pub use self::language::LanguageSetupHandler;
pub use self::password::PasswordPolicyHandler;
