//! Federated message envelope.
//!
//! A [`FederatedMessage`] carries one [`ModerationAction`] between processes,
//! together with the identity of the surface it originated on and a unique
//! message id.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::action::{ModerationAction, decode_timestamp, encode_timestamp};
use crate::error::{ActionError, ActionResult};

/// The envelope used for cross-process federation.
///
/// Fields are private: an envelope cannot be altered once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedMessage {
    action: ModerationAction,
    action_guild_id: String,
    message_id: Uuid,
    message_timestamp: DateTime<Utc>,
}

impl FederatedMessage {
    /// Wraps an action with a fresh message id and the current time.
    pub fn new(action: ModerationAction, action_guild_id: impl Into<String>) -> Self {
        Self {
            action,
            action_guild_id: action_guild_id.into(),
            message_id: Uuid::new_v4(),
            message_timestamp: Utc::now(),
        }
    }

    pub fn action(&self) -> &ModerationAction {
        &self.action
    }

    /// Consumes the envelope, returning the wrapped action.
    pub fn into_action(self) -> ModerationAction {
        self.action
    }

    /// Identity of the surface the action originated on.
    pub fn action_guild_id(&self) -> &str {
        &self.action_guild_id
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn message_timestamp(&self) -> DateTime<Utc> {
        self.message_timestamp
    }

    /// Encodes the envelope as a JSON value with the action nested under `action`.
    pub fn to_value(&self) -> Value {
        json!({
            "action": self.action.to_value(),
            "action_guild_id": self.action_guild_id,
            "message_id": self.message_id.to_string(),
            "message_timestamp": encode_timestamp(&self.message_timestamp),
        })
    }

    /// Encodes the envelope as JSON text.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Decodes an envelope from raw bytes (UTF-8 JSON).
    pub fn from_slice(raw: &[u8]) -> ActionResult<Self> {
        let value: Value = serde_json::from_slice(raw)?;
        Self::from_value(value)
    }

    /// Decodes an envelope from JSON text.
    pub fn from_json(text: &str) -> ActionResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decodes an envelope from a JSON value.
    ///
    /// A nested action that fails to decode is reported as
    /// [`ActionError::MalformedPayload`], whatever the underlying cause.
    pub fn from_value(value: Value) -> ActionResult<Self> {
        let Value::Object(mut object) = value else {
            return Err(ActionError::malformed("envelope must be a JSON object"));
        };

        let action = object
            .remove("action")
            .ok_or(ActionError::MissingField("action"))?;
        let action = ModerationAction::from_value(action)
            .map_err(|e| ActionError::malformed(format!("nested action: {e}")))?;

        let action_guild_id = take_string(&mut object, "action_guild_id")?;
        let message_id = take_string(&mut object, "message_id")?;
        let message_id = Uuid::parse_str(&message_id)
            .map_err(|e| ActionError::malformed(format!("invalid message_id: {e}")))?;
        let message_timestamp = decode_timestamp(&take_string(&mut object, "message_timestamp")?)?;

        Ok(Self {
            action,
            action_guild_id,
            message_id,
            message_timestamp,
        })
    }
}

impl fmt::Display for FederatedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} from {}] {}",
            self.message_id, self.action_guild_id, self.action
        )
    }
}

fn take_string(object: &mut Map<String, Value>, field: &'static str) -> ActionResult<String> {
    match object.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Null) | None => Err(ActionError::MissingField(field)),
        Some(_) => Err(ActionError::malformed(format!("'{field}' must be a string"))),
    }
}
