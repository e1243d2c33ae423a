//! Team security policy for forum hosts
//!
//! Watched team members get stricter password requirements, their failed
//! logins are written to the user log, and every administration panel login
//! is reported by email. The host drives everything through lifecycle hooks
//! dispatched to a [`PolicyGateway`].

pub mod gateway;
pub mod hooks;

pub use gateway::{GatewayRequest, PolicyGateway};
