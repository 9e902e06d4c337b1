//! High-level client for the Permafrost database server.
//!
//! [`DbClient`] exposes one method per protocol action, holds the
//! session's auth token, and converts ERROR envelopes into
//! [`ClientError::Server`]. A session moves through four states:
//! disconnected, connected, authenticated (LOGIN runs immediately
//! after connect), closed.
//!
//! Exchanges are strictly synchronous: each call sends one request
//! and blocks until its one response arrives. There are no timeouts
//! and no automatic retries; closing the connection is the only way
//! to unblock a pending read, and reconnecting after a failure is
//! the caller's decision.

use log::{info, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::protocol::envelope::EnvelopeError;
use crate::protocol::transport::TransportError;
use crate::protocol::{Command, Connection, Credentials, ErrorPayload, Response};

/// Row field holding the primary key.
const PK_FIELD: &str = "pk";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("server error {code}: {message}")]
    Server {
        message: String,
        code: Value,
        ref_data: Option<Value>,
    },
    #[error("connection closed by server mid-exchange")]
    ConnectionClosed,
}

/// PING responses carry the server greeting under `message`.
#[derive(Deserialize)]
struct Greeting {
    message: String,
}

pub struct DbClient {
    config: ClientConfig,
    connection: Connection,
    auth_token: Option<Value>,
}

impl DbClient {
    /// Build a disconnected client. Nothing is dialed until
    /// [`connect`](Self::connect).
    pub fn new(config: ClientConfig) -> Self {
        let connection = Connection::new(config.host.clone(), config.port);
        Self {
            config,
            connection,
            auth_token: None,
        }
    }

    /// Dial the server and authenticate.
    ///
    /// LOGIN is always the first request on the wire. On a LOGIN
    /// error the session is left open but unusable; the caller still
    /// owns [`close`](Self::close).
    pub fn connect(&mut self) -> Result<(), ClientError> {
        self.connection.connect()?;
        self.login()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Token issued by LOGIN, valid for this connection only.
    pub fn auth_token(&self) -> Option<&Value> {
        self.auth_token.as_ref()
    }

    /// Liveness check. Returns the server's greeting message.
    pub fn ping(&mut self) -> Result<String, ClientError> {
        let payload = self.call(Command::Ping)?;
        let greeting: Greeting =
            serde_json::from_value(payload).map_err(EnvelopeError::MalformedResponse)?;
        info!("{}", greeting.message);
        Ok(greeting.message)
    }

    /// Insert a row. A missing primary key is minted client-side as
    /// a fresh UUID, never negotiated with the server.
    pub fn create(&mut self, table: &str, mut row: Map<String, Value>) -> Result<Value, ClientError> {
        row.entry(PK_FIELD)
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));

        self.call(Command::Create {
            table: table.to_string(),
            row,
        })
    }

    /// Query rows matching a filter. The filter grammar is
    /// server-interpreted and forwarded untouched.
    pub fn find(&mut self, table: &str, filter: Map<String, Value>) -> Result<Value, ClientError> {
        self.call(Command::Select {
            table: table.to_string(),
            filter,
        })
    }

    /// Apply changes to rows matching a filter.
    pub fn update(
        &mut self,
        table: &str,
        filter: Map<String, Value>,
        changes: Map<String, Value>,
    ) -> Result<Value, ClientError> {
        self.call(Command::Update {
            table: table.to_string(),
            filter,
            changes,
        })
    }

    /// Delete rows matching a filter.
    pub fn delete(&mut self, table: &str, filter: Map<String, Value>) -> Result<Value, ClientError> {
        self.call(Command::Delete {
            table: table.to_string(),
            filter,
        })
    }

    /// Define a new table. The schema is server-interpreted data
    /// passed through the envelope unchanged.
    pub fn create_table(
        &mut self,
        table: &str,
        schema: Map<String, Value>,
    ) -> Result<Value, ClientError> {
        self.call(Command::CreateTable {
            table: table.to_string(),
            schema,
        })
    }

    /// Remove a table definition.
    pub fn drop_table(&mut self, table: &str) -> Result<Value, ClientError> {
        self.call(Command::DropTable {
            table: table.to_string(),
        })
    }

    /// Close the session. The auth token dies with the connection.
    /// Not idempotent: a second close fails with
    /// [`TransportError::NotConnected`].
    pub fn close(&mut self) -> Result<(), ClientError> {
        self.auth_token = None;
        Ok(self.connection.close()?)
    }

    fn login(&mut self) -> Result<(), ClientError> {
        let credentials = Credentials {
            user: self.config.username.clone(),
            password: self.config.password.clone(),
            database: self.config.database.clone(),
        };

        let response = self.exchange(Command::Login(credentials))?;
        if response.is_error() {
            return Err(server_error(response.payload));
        }

        info!("authenticated against database '{}'", self.config.database);
        self.auth_token = Some(response.payload);
        Ok(())
    }

    /// Send one request and surface its one response payload. Any
    /// ERROR envelope is fatal to the session: the connection is
    /// forced closed before the error is returned.
    fn call(&mut self, command: Command) -> Result<Value, ClientError> {
        let response = self.exchange(command)?;
        if response.is_error() {
            warn!("server reported an error, closing session");
            let _ = self.connection.close();
            self.auth_token = None;
            return Err(server_error(response.payload));
        }
        Ok(response.payload)
    }

    fn exchange(&mut self, command: Command) -> Result<Response, ClientError> {
        let request = command.into_request(self.auth_token.clone());
        self.connection.send(&request.to_bytes()?)?;

        let body = self
            .connection
            .receive()?
            .ok_or(ClientError::ConnectionClosed)?;
        Ok(Response::from_bytes(&body)?)
    }
}

fn server_error(payload: Value) -> ClientError {
    match ErrorPayload::from_value(payload) {
        Ok(details) => ClientError::Server {
            message: details.message,
            code: details.code,
            ref_data: details.ref_data,
        },
        Err(e) => ClientError::Envelope(e),
    }
}
