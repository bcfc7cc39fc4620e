//! steelgate - request gateway and admin approval service.
//!
//! Every request passes the [`filter`] chain (path block, rate limit, session
//! resolution, route authorization) before reaching the [`http`] router.
//! Pending accounts are approved through signed, expiring links minted by
//! [`security::TokenCodec`].

pub mod accounts;
pub mod boq;
pub mod caps;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod metrics;
pub mod notify;
pub mod security;
pub mod session;
pub mod telemetry;
