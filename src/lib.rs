pub mod cli;
pub mod config;
pub mod errors;
pub mod permissions;
pub mod salesforce;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
