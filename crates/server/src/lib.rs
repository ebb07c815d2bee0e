pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ratings;
pub mod routes;
pub mod store;
