//! Request/response envelope schema.
//!
//! Every frame body is one JSON envelope. Requests carry five fixed
//! keys (`table`, `query`, `action`, `payload`, `auth`); absent
//! optionals are serialized as `null`. Responses carry `action_type`
//! and `payload`.
//!
//! Query filters are server-interpreted and pass through the client
//! untouched: a mapping whose values are either literal equality or
//! an operator object keyed by `$eq`, `$ne`, `$gt`, `$gte`, `$lt`,
//! `$lte`, `$in`, `$nin`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to encode request: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("malformed response: {0}")]
    MalformedResponse(#[source] serde_json::Error),
}

/// Operation tag selecting server behavior. `Error` only ever
/// appears in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Ping,
    Create,
    Update,
    Delete,
    Select,
    CreateTable,
    DropTable,
    Login,
    Error,
}

/// Credentials sent once in the LOGIN payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub database: String,
}

/// One request, typed by action.
///
/// Each variant carries exactly the fields its action uses; the
/// conversion into the fixed-key wire envelope happens in
/// [`into_request`](Command::into_request).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping,
    Create {
        table: String,
        row: Map<String, Value>,
    },
    Select {
        table: String,
        filter: Map<String, Value>,
    },
    Update {
        table: String,
        filter: Map<String, Value>,
        changes: Map<String, Value>,
    },
    Delete {
        table: String,
        filter: Map<String, Value>,
    },
    CreateTable {
        table: String,
        schema: Map<String, Value>,
    },
    DropTable {
        table: String,
    },
    Login(Credentials),
}

impl Command {
    pub fn action(&self) -> Action {
        match self {
            Command::Ping => Action::Ping,
            Command::Create { .. } => Action::Create,
            Command::Select { .. } => Action::Select,
            Command::Update { .. } => Action::Update,
            Command::Delete { .. } => Action::Delete,
            Command::CreateTable { .. } => Action::CreateTable,
            Command::DropTable { .. } => Action::DropTable,
            Command::Login(_) => Action::Login,
        }
    }

    /// Lower the command into the wire envelope, attaching whatever
    /// auth value the session currently holds.
    pub fn into_request(self, auth: Option<Value>) -> Request {
        let action = self.action();
        let (table, query, payload) = match self {
            Command::Ping => (None, None, None),
            Command::Create { table, row } => (Some(table), None, Some(Value::Object(row))),
            Command::Select { table, filter } => (Some(table), Some(Value::Object(filter)), None),
            Command::Update {
                table,
                filter,
                changes,
            } => (
                Some(table),
                Some(Value::Object(filter)),
                Some(Value::Object(changes)),
            ),
            Command::Delete { table, filter } => (Some(table), Some(Value::Object(filter)), None),
            Command::CreateTable { table, schema } => {
                (Some(table), None, Some(Value::Object(schema)))
            }
            Command::DropTable { table } => (Some(table), None, None),
            Command::Login(credentials) => (
                None,
                None,
                Some(json!({
                    "user": credentials.user,
                    "password": credentials.password,
                    "database": credentials.database,
                })),
            ),
        };

        Request {
            table,
            query,
            action,
            payload,
            auth,
        }
    }
}

/// Wire request envelope. Field order is the on-wire key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub table: Option<String>,
    pub query: Option<Value>,
    pub action: Action,
    pub payload: Option<Value>,
    pub auth: Option<Value>,
}

impl Request {
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(EnvelopeError::Serialize)
    }
}

/// Wire response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub action_type: Action,
    pub payload: Value,
}

impl Response {
    /// Decode a response body. Invalid JSON and missing required
    /// keys both surface as [`EnvelopeError::MalformedResponse`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(EnvelopeError::MalformedResponse)
    }

    pub fn is_error(&self) -> bool {
        self.action_type == Action::Error
    }
}

/// Payload of an ERROR envelope. `code` and `ref_data` are
/// server-defined and stay opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: Value,
    #[serde(default)]
    pub ref_data: Option<Value>,
}

impl ErrorPayload {
    pub fn from_value(payload: Value) -> Result<Self, EnvelopeError> {
        serde_json::from_value(payload).map_err(EnvelopeError::MalformedResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn action_wire_names() {
        let cases = [
            (Action::Ping, "\"PING\""),
            (Action::Create, "\"CREATE\""),
            (Action::CreateTable, "\"CREATE_TABLE\""),
            (Action::DropTable, "\"DROP_TABLE\""),
            (Action::Login, "\"LOGIN\""),
            (Action::Error, "\"ERROR\""),
        ];

        for (action, expected) in cases {
            assert_eq!(serde_json::to_string(&action).unwrap(), expected);
        }
    }

    #[test]
    fn ping_request_serializes_fixed_keys() {
        let request = Command::Ping.into_request(None);
        assert_eq!(
            String::from_utf8(request.to_bytes().unwrap()).unwrap(),
            r#"{"table":null,"query":null,"action":"PING","payload":null,"auth":null}"#
        );
    }

    #[test]
    fn select_request_carries_filter_and_auth() {
        let command = Command::Select {
            table: "user".to_string(),
            filter: map(&[("age", json!({"$gte": 18}))]),
        };
        let request = command.into_request(Some(json!("token-1")));

        assert_eq!(request.action, Action::Select);
        assert_eq!(request.table.as_deref(), Some("user"));
        assert_eq!(request.query, Some(json!({"age": {"$gte": 18}})));
        assert_eq!(request.payload, None);
        assert_eq!(request.auth, Some(json!("token-1")));
    }

    #[test]
    fn update_request_carries_filter_and_changes() {
        let command = Command::Update {
            table: "user".to_string(),
            filter: map(&[("pk", json!("abc"))]),
            changes: map(&[("first_name", json!("B"))]),
        };
        let request = command.into_request(None);

        assert_eq!(request.query, Some(json!({"pk": "abc"})));
        assert_eq!(request.payload, Some(json!({"first_name": "B"})));
    }

    #[test]
    fn login_request_payload_shape() {
        let command = Command::Login(Credentials {
            user: "root".to_string(),
            password: "root@123".to_string(),
            database: "main".to_string(),
        });
        let request = command.into_request(None);

        assert_eq!(request.action, Action::Login);
        assert_eq!(request.table, None);
        assert_eq!(
            request.payload,
            Some(json!({
                "user": "root",
                "password": "root@123",
                "database": "main",
            }))
        );
    }

    #[test]
    fn drop_table_request_only_names_the_table() {
        let command = Command::DropTable {
            table: "user".to_string(),
        };
        let request = command.into_request(Some(json!({"token": "t"})));

        assert_eq!(request.table.as_deref(), Some("user"));
        assert_eq!(request.query, None);
        assert_eq!(request.payload, None);
    }

    #[test]
    fn response_parses() {
        let response =
            Response::from_bytes(br#"{"action_type": "SELECT", "payload": [{"pk": "1"}]}"#)
                .unwrap();
        assert_eq!(response.action_type, Action::Select);
        assert!(!response.is_error());
    }

    #[test]
    fn response_rejects_missing_action_type() {
        let err = Response::from_bytes(br#"{"payload": {}}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::MalformedResponse(_)));
    }

    #[test]
    fn response_rejects_missing_payload() {
        let err = Response::from_bytes(br#"{"action_type": "PING"}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::MalformedResponse(_)));
    }

    #[test]
    fn response_rejects_invalid_json() {
        let err = Response::from_bytes(b"not json").unwrap_err();
        assert!(matches!(err, EnvelopeError::MalformedResponse(_)));
    }

    #[test]
    fn error_payload_with_ref_data() {
        let payload = ErrorPayload::from_value(json!({
            "message": "table missing",
            "code": 404,
            "ref_data": {"table": "user"},
        }))
        .unwrap();

        assert_eq!(payload.message, "table missing");
        assert_eq!(payload.code, json!(404));
        assert_eq!(payload.ref_data, Some(json!({"table": "user"})));
    }

    #[test]
    fn error_payload_without_ref_data() {
        let payload = ErrorPayload::from_value(json!({
            "message": "denied",
            "code": "E_AUTH",
        }))
        .unwrap();
        assert_eq!(payload.ref_data, None);
    }

    #[test]
    fn error_payload_requires_message() {
        let err = ErrorPayload::from_value(json!({"code": 1})).unwrap_err();
        assert!(matches!(err, EnvelopeError::MalformedResponse(_)));
    }
}
