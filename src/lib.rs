pub mod axum_http;
pub mod config;
pub mod domain;
pub mod infra;
pub mod payments;
pub mod usecases;
