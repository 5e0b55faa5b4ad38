//! Moderation action model.
//!
//! A [`ModerationAction`] is a single enforcement decision taken against a
//! user on some moderation surface. The five kinds share a set of common
//! fields; the kind-specific part lives in [`ActionPayload`], so the kind of an
//! action is fixed by its payload variant and cannot drift after construction.
//!
//! # Wire Format
//!
//! Actions are encoded as a flat JSON object. Enum fields are written by name,
//! timestamps as RFC 3339 strings in UTC:
//!
//! ```json
//! {
//!   "kind": "TIMEOUT",
//!   "target_user_id": "U1",
//!   "moderator_id": "M1",
//!   "reason": "flooding",
//!   "reason_type": "DISRUPTIVE_BEHAVIOR",
//!   "context": null,
//!   "timestamp": "2026-10-15T08:00:00.123456789Z",
//!   "timeout_duration": 600
//! }
//! ```
//!
//! Decoding reads `kind` first and then dispatches to
//! [`ModerationAction::from_kind`], so every decoded action went through the
//! same validation as one built locally.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ActionError, ActionResult};

// =============================================================================
// Action Kind
// =============================================================================

/// The five recognised kinds of moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Ban,
    Kick,
    Warn,
    Timeout,
    Trust,
}

impl ActionKind {
    /// All kinds, in declaration order.
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Ban,
        ActionKind::Kick,
        ActionKind::Warn,
        ActionKind::Timeout,
        ActionKind::Trust,
    ];

    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ban => "BAN",
            Self::Kick => "KICK",
            Self::Warn => "WARN",
            Self::Timeout => "TIMEOUT",
            Self::Trust => "TRUST",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    /// Parses a kind name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ActionError::UnknownActionKind(s.to_string()))
    }
}

// =============================================================================
// Action Reason
// =============================================================================

/// Classification of why an action was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionReason {
    Spam,
    Harassment,
    InappropriateContent,
    RuleViolation,
    Abuse,
    DisruptiveBehavior,
    #[default]
    Other,
}

impl ActionReason {
    /// All reasons, in declaration order.
    pub const ALL: [ActionReason; 7] = [
        ActionReason::Spam,
        ActionReason::Harassment,
        ActionReason::InappropriateContent,
        ActionReason::RuleViolation,
        ActionReason::Abuse,
        ActionReason::DisruptiveBehavior,
        ActionReason::Other,
    ];

    /// Returns the wire name of this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spam => "SPAM",
            Self::Harassment => "HARASSMENT",
            Self::InappropriateContent => "INAPPROPRIATE_CONTENT",
            Self::RuleViolation => "RULE_VIOLATION",
            Self::Abuse => "ABUSE",
            Self::DisruptiveBehavior => "DISRUPTIVE_BEHAVIOR",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for ActionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionReason {
    type Err = ActionError;

    /// Parses a reason name, ignoring ASCII case and accepting `-` for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|reason| reason.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ActionError::malformed(format!("unknown reason type: '{s}'")))
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Kind-specific part of a moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPayload {
    Ban {
        /// Whether the user may appeal the ban.
        can_appeal: bool,
    },
    Kick,
    Warn,
    Timeout {
        /// Duration in seconds.
        timeout_duration: u64,
    },
    Trust,
}

impl ActionPayload {
    /// Returns the kind this payload belongs to.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Ban { .. } => ActionKind::Ban,
            Self::Kick => ActionKind::Kick,
            Self::Warn => ActionKind::Warn,
            Self::Timeout { .. } => ActionKind::Timeout,
            Self::Trust => ActionKind::Trust,
        }
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Fields supplied when constructing an action.
///
/// Kind-specific fields are optional here; [`ModerationAction::from_kind`]
/// decides which of them are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionDraft {
    pub target_user_id: String,
    pub moderator_id: String,
    pub reason: String,
    pub reason_type: ActionReason,
    pub context: Option<String>,
    pub can_appeal: Option<bool>,
    pub timeout_duration: Option<u64>,
}

impl ActionDraft {
    /// Creates a draft with the common fields set.
    pub fn new(
        target_user_id: impl Into<String>,
        moderator_id: impl Into<String>,
        reason: impl Into<String>,
        reason_type: ActionReason,
    ) -> Self {
        Self {
            target_user_id: target_user_id.into(),
            moderator_id: moderator_id.into(),
            reason: reason.into(),
            reason_type,
            ..Default::default()
        }
    }

    /// Sets the free-text context that caused the action.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Sets whether a ban can be appealed.
    pub fn with_can_appeal(mut self, can_appeal: bool) -> Self {
        self.can_appeal = Some(can_appeal);
        self
    }

    /// Sets the timeout duration in seconds.
    pub fn with_timeout_duration(mut self, seconds: u64) -> Self {
        self.timeout_duration = Some(seconds);
        self
    }
}

// =============================================================================
// ModerationAction
// =============================================================================

/// A single moderation decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationAction {
    target_user_id: String,
    moderator_id: String,
    reason: String,
    reason_type: ActionReason,
    context: Option<String>,
    timestamp: DateTime<Utc>,
    payload: ActionPayload,
}

impl ModerationAction {
    /// Creates an action from a kind name.
    ///
    /// # Errors
    ///
    /// - [`ActionError::UnknownActionKind`] if `kind` is not recognised
    /// - [`ActionError::MissingField`] if a field required by the kind is absent
    pub fn create(kind: &str, draft: ActionDraft) -> ActionResult<Self> {
        Self::from_kind(kind.parse()?, draft)
    }

    /// Creates an action of the given kind, stamped with the current time.
    pub fn from_kind(kind: ActionKind, draft: ActionDraft) -> ActionResult<Self> {
        Self::build(kind, draft, Utc::now())
    }

    fn build(kind: ActionKind, draft: ActionDraft, timestamp: DateTime<Utc>) -> ActionResult<Self> {
        let payload = match kind {
            ActionKind::Ban => ActionPayload::Ban {
                can_appeal: draft.can_appeal.unwrap_or(true),
            },
            ActionKind::Kick => ActionPayload::Kick,
            ActionKind::Warn => ActionPayload::Warn,
            ActionKind::Timeout => ActionPayload::Timeout {
                timeout_duration: draft
                    .timeout_duration
                    .ok_or(ActionError::MissingField("timeout_duration"))?,
            },
            ActionKind::Trust => ActionPayload::Trust,
        };

        Ok(Self {
            target_user_id: draft.target_user_id,
            moderator_id: draft.moderator_id,
            reason: draft.reason,
            reason_type: draft.reason_type,
            context: draft.context,
            timestamp,
            payload,
        })
    }

    /// Returns the action kind.
    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    /// Returns the kind-specific payload.
    pub fn payload(&self) -> &ActionPayload {
        &self.payload
    }

    pub fn target_user_id(&self) -> &str {
        &self.target_user_id
    }

    pub fn moderator_id(&self) -> &str {
        &self.moderator_id
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn reason_type(&self) -> ActionReason {
        self.reason_type
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Returns when the action was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encodes the action as a JSON value.
    pub fn to_value(&self) -> Value {
        let (can_appeal, timeout_duration) = match self.payload {
            ActionPayload::Ban { can_appeal } => (Some(can_appeal), None),
            ActionPayload::Timeout { timeout_duration } => (None, Some(timeout_duration)),
            _ => (None, None),
        };

        let wire = WireActionRef {
            kind: self.kind(),
            target_user_id: &self.target_user_id,
            moderator_id: &self.moderator_id,
            reason: &self.reason,
            reason_type: self.reason_type,
            context: self.context.as_deref(),
            timestamp: encode_timestamp(&self.timestamp),
            can_appeal,
            timeout_duration,
        };

        // Every field of WireActionRef serializes infallibly into a Value.
        serde_json::to_value(wire).unwrap_or(Value::Null)
    }

    /// Encodes the action as canonical JSON text.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Decodes an action from JSON text.
    pub fn from_json(text: &str) -> ActionResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decodes an action from a JSON value.
    ///
    /// # Errors
    ///
    /// - [`ActionError::MalformedPayload`] if the value is not an object or a
    ///   field has the wrong type
    /// - [`ActionError::UnknownActionKind`] if `kind` is not recognised
    /// - [`ActionError::MissingField`] if a required field is absent
    pub fn from_value(value: Value) -> ActionResult<Self> {
        let Value::Object(ref object) = value else {
            return Err(ActionError::malformed("action must be a JSON object"));
        };

        let kind: ActionKind = match object.get("kind") {
            Some(Value::String(kind)) => kind.parse()?,
            Some(Value::Null) | None => return Err(ActionError::MissingField("kind")),
            Some(_) => return Err(ActionError::malformed("'kind' must be a string")),
        };

        let wire: WireAction = serde_json::from_value(value)?;

        let reason_type = wire
            .reason_type
            .ok_or(ActionError::MissingField("reason_type"))?
            .parse()?;
        let timestamp = decode_timestamp(
            &wire
                .timestamp
                .ok_or(ActionError::MissingField("timestamp"))?,
        )?;

        let draft = ActionDraft {
            target_user_id: wire
                .target_user_id
                .ok_or(ActionError::MissingField("target_user_id"))?,
            moderator_id: wire
                .moderator_id
                .ok_or(ActionError::MissingField("moderator_id"))?,
            reason: wire.reason.ok_or(ActionError::MissingField("reason"))?,
            reason_type,
            context: wire.context,
            can_appeal: wire.can_appeal,
            timeout_duration: wire.timeout_duration,
        };

        Self::build(kind, draft, timestamp)
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} target={} moderator={} reason_type={}",
            self.kind(),
            self.target_user_id,
            self.moderator_id,
            self.reason_type
        )?;
        if let ActionPayload::Timeout { timeout_duration } = self.payload {
            write!(f, " duration={timeout_duration}s")?;
        }
        Ok(())
    }
}

// =============================================================================
// Wire Structures
// =============================================================================

#[derive(Serialize)]
struct WireActionRef<'a> {
    kind: ActionKind,
    target_user_id: &'a str,
    moderator_id: &'a str,
    reason: &'a str,
    reason_type: ActionReason,
    context: Option<&'a str>,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    can_appeal: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_duration: Option<u64>,
}

#[derive(Deserialize)]
struct WireAction {
    target_user_id: Option<String>,
    moderator_id: Option<String>,
    reason: Option<String>,
    reason_type: Option<String>,
    context: Option<String>,
    timestamp: Option<String>,
    can_appeal: Option<bool>,
    timeout_duration: Option<u64>,
}

/// Encodes a timestamp as RFC 3339 with as many sub-second digits as needed.
pub(crate) fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn decode_timestamp(text: &str) -> ActionResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ActionError::malformed(format!("invalid timestamp '{text}': {e}")))
}
