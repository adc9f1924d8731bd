//! Clients for third-party HTTP data services.

pub mod data_api;

pub use data_api::DataApiClient;
