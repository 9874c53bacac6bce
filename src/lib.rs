pub mod backend;
pub mod config;
pub mod http;
pub mod models;
pub mod services;
pub mod session;
pub mod state;
pub mod utils;
