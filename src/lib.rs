// Library exports for vidtube
// The binary and the integration tests both build on these modules

pub mod assets;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod views;
