pub mod client;
pub mod config;
pub mod protocol;

pub use client::{ClientError, DbClient};
pub use config::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use protocol::{Action, Command, Connection, Credentials, Request, Response};
