use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::action::ModerationAction;

/// Where a routed action entered the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOrigin {
    /// Taken on the bot with this identity.
    Bot(String),
    /// Received from the transport with this name.
    Transport(String),
}

impl fmt::Display for ActionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bot(identity) => write!(f, "bot:{identity}"),
            Self::Transport(name) => write!(f, "transport:{name}"),
        }
    }
}

/// One routed action.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub action: ModerationAction,
    pub origin: ActionOrigin,
    pub routed_at: DateTime<Utc>,
}

/// Ring buffer of the most recently routed actions.
#[derive(Debug)]
pub struct ActionHistory {
    entries: VecDeque<ActionRecord>,
    capacity: usize,
}

impl ActionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, action: ModerationAction, origin: ActionOrigin) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ActionRecord {
            action,
            origin,
            routed_at: Utc::now(),
        });
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<ActionRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionDraft, ActionReason};

    fn warn(target: &str) -> ModerationAction {
        ModerationAction::create("warn", ActionDraft::new(target, "M1", "rude", ActionReason::Harassment))
            .unwrap()
    }

    #[test]
    fn test_bounded() {
        let mut history = ActionHistory::new(2);
        for target in ["U1", "U2", "U3"] {
            history.record(warn(target), ActionOrigin::Bot("bot-a".into()));
        }

        let targets: Vec<_> = history
            .snapshot()
            .into_iter()
            .map(|record| record.action.target_user_id().to_string())
            .collect();
        assert_eq!(targets, ["U2", "U3"]);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let mut history = ActionHistory::new(0);
        history.record(warn("U1"), ActionOrigin::Transport("bus".into()));
        assert!(history.is_empty());
    }
}
