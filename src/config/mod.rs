//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, DatabaseConfig)
//! - [`security`]: Signing secret, token lifetime and rate limiting
//! - [`session`]: Session cookie settings
//! - [`routes`]: Blocked paths and the route protection table
//! - [`notify`]: Approval-link delivery and seeded admin accounts
//! - [`validation`]: Startup checks returning every problem at once

mod defaults;
mod notify;
mod routes;
mod security;
mod session;
mod types;
mod validation;

pub use notify::{AdminAccount, NotifyConfig};
pub use routes::RoutesConfig;
pub use security::{MIN_SECRET_LEN, RateLimitConfig, SecurityConfig, SigningSecret};
pub use session::SessionConfig;
pub use types::{Config, ConfigError, DatabaseConfig, SIGNING_SECRET_ENV, ServerConfig};
pub use validation::{ValidationError, validate};
