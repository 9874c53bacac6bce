pub mod auth;
pub mod dashboard;
pub mod intake;
pub mod results;
pub mod settings;
pub mod upload;
pub mod user_searches;
