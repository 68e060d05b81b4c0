pub mod error;
pub mod handlers;
pub mod message;
pub mod models;
pub mod service;
