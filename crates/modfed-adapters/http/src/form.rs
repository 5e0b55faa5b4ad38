//! Form-encoded action submissions.

use serde::Deserialize;
use thiserror::Error;

use modfed_core::{ActionDraft, ActionError, ActionReason, ModerationAction};

/// Errors turning a submitted form into an action.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Missing form field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// The fields of a `POST /action` body.
///
/// Every field is optional at this level so that a missing field is reported
/// by name rather than as a generic decoding failure. Empty values count as
/// missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionForm {
    pub action_type: Option<String>,
    pub target_user_id: Option<String>,
    pub action_moderator_id: Option<String>,
    pub action_reason: Option<String>,
    pub action_reason_type: Option<String>,
    pub action_context: Option<String>,
    pub can_appeal: Option<String>,
    pub timeout_duration: Option<String>,
}

impl ActionForm {
    /// Validates the form and builds the action it describes.
    pub fn into_action(self) -> Result<ModerationAction, FormError> {
        let kind = required(self.action_type, "action_type")?;
        let reason_type: ActionReason = required(self.action_reason_type, "action_reason_type")?
            .parse()?;

        let mut draft = ActionDraft::new(
            required(self.target_user_id, "target_user_id")?,
            required(self.action_moderator_id, "action_moderator_id")?,
            required(self.action_reason, "action_reason")?,
            reason_type,
        );
        if let Some(context) = optional(self.action_context) {
            draft = draft.with_context(context);
        }
        if let Some(value) = optional(self.can_appeal) {
            draft = draft.with_can_appeal(parse_flag(&value)?);
        }
        if let Some(value) = optional(self.timeout_duration) {
            let seconds = value.parse().map_err(|_| FormError::InvalidField {
                field: "timeout_duration",
                value,
            })?;
            draft = draft.with_timeout_duration(seconds);
        }

        Ok(ModerationAction::create(&kind, draft)?)
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, FormError> {
    optional(value).ok_or(FormError::MissingField(field))
}

/// Accepts what HTML checkboxes and hand-written bodies commonly send.
fn parse_flag(value: &str) -> Result<bool, FormError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(FormError::InvalidField {
            field: "can_appeal",
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modfed_core::{ActionKind, ActionPayload};

    fn form(kind: &str) -> ActionForm {
        ActionForm {
            action_type: Some(kind.into()),
            target_user_id: Some("U1".into()),
            action_moderator_id: Some("M1".into()),
            action_reason: Some("posting links".into()),
            action_reason_type: Some("spam".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_ban() {
        let action = form("ban").into_action().unwrap();
        assert_eq!(action.kind(), ActionKind::Ban);
        assert_eq!(action.target_user_id(), "U1");
        assert_eq!(action.reason_type(), ActionReason::Spam);
        assert_eq!(action.context(), None);
        assert_eq!(action.payload(), &ActionPayload::Ban { can_appeal: true });
    }

    #[test]
    fn test_optional_fields() {
        let mut submitted = form("BAN");
        submitted.action_context = Some("#general".into());
        submitted.can_appeal = Some("off".into());
        let action = submitted.into_action().unwrap();
        assert_eq!(action.context(), Some("#general"));
        assert_eq!(action.payload(), &ActionPayload::Ban { can_appeal: false });

        let mut submitted = form("timeout");
        submitted.timeout_duration = Some("600".into());
        submitted.action_context = Some("".into());
        let action = submitted.into_action().unwrap();
        assert_eq!(action.payload(), &ActionPayload::Timeout { timeout_duration: 600 });
        assert_eq!(action.context(), None);
    }

    #[test]
    fn test_rejections() {
        let mut submitted = form("ban");
        submitted.target_user_id = Some("  ".into());
        assert!(matches!(
            submitted.into_action(),
            Err(FormError::MissingField("target_user_id"))
        ));

        assert!(matches!(
            form("mute").into_action(),
            Err(FormError::Action(ActionError::UnknownActionKind(_)))
        ));

        let mut submitted = form("timeout");
        submitted.timeout_duration = Some("ten minutes".into());
        assert!(matches!(
            submitted.into_action(),
            Err(FormError::InvalidField { field: "timeout_duration", .. })
        ));

        let mut submitted = form("ban");
        submitted.can_appeal = Some("maybe".into());
        assert!(submitted.into_action().is_err());

        let mut submitted = form("ban");
        submitted.action_reason_type = Some("boredom".into());
        assert!(matches!(submitted.into_action(), Err(FormError::Action(_))));
    }
}
