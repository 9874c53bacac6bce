pub mod admin;
pub mod allotment;
pub mod intake;
