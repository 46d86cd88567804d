//! Client for the METT Data Portal API.
//!
//! [`DataPortalClient`] wraps the portal's typed endpoints and hands back
//! [`PaginatedResult`]s regardless of whether the server answered with JSON or
//! TSV. Generic requests go through [`DataPortalClient::request`] and
//! [`negotiate`](negotiate::negotiate) decides how their bodies are shown.

pub mod aliases;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod negotiate;
pub mod output;
pub mod params;
pub mod request;
pub mod transport;
pub mod unify;

pub use client::DataPortalClient;
pub use config::{ClientConfig, ConfigLoader, ConfigOverrides};
pub use error::{ErrorKind, PortalError};
pub use params::{Filters, Params};
pub use request::{Format, RequestSpec};
pub use unify::PaginatedResult;
