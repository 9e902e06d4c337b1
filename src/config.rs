//! Client configuration.
//!
//! Every connection parameter is carried explicitly; nothing is
//! baked into constructors or shared between instances.

/// Conventional endpoint of a locally running server. Callers opt in
/// explicitly; these are never applied silently.
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9000;

/// Connection endpoint and credentials for one client.
///
/// Credentials are sent exactly once, during the LOGIN exchange that
/// follows connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}
