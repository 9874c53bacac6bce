pub mod logging;
pub mod respond;
