pub mod auth;
pub mod config;
pub mod errors;
pub mod form;
pub mod handlers;
pub mod models;
pub mod submission;
pub mod templates_structs;
