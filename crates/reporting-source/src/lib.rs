//! Seams between the report engine and the outside world.
//!
//! [`AuthProvider`] turns credentials into a [`Session`], and [`DataSource`] turns an endpoint
//! into records. HTTP-backed implementations live in the host application; this crate ships
//! in-memory ones ([`StaticAuthProvider`], [`StaticDataSource`]) plus the pieces that do not
//! need a network: configuration, the endpoint catalog and the built-in sample data.

#![forbid(unsafe_code)]

mod auth;
mod catalog;
mod config;
mod data;

pub use auth::{authenticate, AuthProvider, Session, StaticAuthProvider};
pub use catalog::{display_name, list_endpoints, list_endpoints_from_str, Endpoint, EXCLUDED_KEYWORDS};
pub use config::{SourceConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_TITLE};
pub use data::{load_table, records_from_json, sample_table, DataSource, StaticDataSource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("username and password are required")]
    MissingCredentials,

    #[error("{0} is not configured")]
    MissingConfig(&'static str),

    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] reporting_model::ModelError),
}

pub type Result<T> = std::result::Result<T, SourceError>;
