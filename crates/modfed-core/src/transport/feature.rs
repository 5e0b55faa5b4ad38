//! Transport capability flags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single transport capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    /// Publish federated messages.
    Send,
    /// Deliver inbound federated messages.
    Receive,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Receive => write!(f, "receive"),
        }
    }
}

/// A set of transport capabilities.
///
/// Serialized as a list, e.g. `["send", "receive"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Feature>", into = "Vec<Feature>")]
pub struct FeatureSet {
    send: bool,
    receive: bool,
}

impl FeatureSet {
    pub const NONE: Self = Self {
        send: false,
        receive: false,
    };

    pub const SEND: Self = Self {
        send: true,
        receive: false,
    };

    pub const RECEIVE: Self = Self {
        send: false,
        receive: true,
    };

    pub const SEND_RECEIVE: Self = Self {
        send: true,
        receive: true,
    };

    /// Returns whether `feature` is a member of this set.
    pub fn allows(self, feature: Feature) -> bool {
        match feature {
            Feature::Send => self.send,
            Feature::Receive => self.receive,
        }
    }

    /// Returns whether every member of `other` is also a member of this set.
    pub fn contains(self, other: FeatureSet) -> bool {
        other.first_missing_from(self).is_none()
    }

    /// Returns the first member of this set that `other` lacks.
    pub fn first_missing_from(self, other: FeatureSet) -> Option<Feature> {
        self.iter().find(|feature| !other.allows(*feature))
    }

    pub fn union(self, other: FeatureSet) -> FeatureSet {
        Self {
            send: self.send || other.send,
            receive: self.receive || other.receive,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }

    /// Iterates over the members of this set.
    pub fn iter(self) -> impl Iterator<Item = Feature> {
        [
            self.send.then_some(Feature::Send),
            self.receive.then_some(Feature::Receive),
        ]
        .into_iter()
        .flatten()
    }
}

impl From<Feature> for FeatureSet {
    fn from(feature: Feature) -> Self {
        match feature {
            Feature::Send => Self::SEND,
            Feature::Receive => Self::RECEIVE,
        }
    }
}

impl From<Vec<Feature>> for FeatureSet {
    fn from(features: Vec<Feature>) -> Self {
        features
            .into_iter()
            .fold(Self::NONE, |set, feature| set.union(feature.into()))
    }
}

impl From<FeatureSet> for Vec<Feature> {
    fn from(set: FeatureSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<String> = self.iter().map(|feature| feature.to_string()).collect();
        write!(f, "{}", names.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        assert!(FeatureSet::SEND_RECEIVE.contains(FeatureSet::SEND));
        assert!(FeatureSet::SEND_RECEIVE.contains(FeatureSet::NONE));
        assert!(!FeatureSet::RECEIVE.contains(FeatureSet::SEND));
        assert!(!FeatureSet::RECEIVE.allows(Feature::Send));
        assert_eq!(
            FeatureSet::SEND_RECEIVE.first_missing_from(FeatureSet::RECEIVE),
            Some(Feature::Send)
        );
    }

    #[test]
    fn test_serde_as_list() {
        let set: FeatureSet = serde_json::from_str(r#"["receive", "send"]"#).unwrap();
        assert_eq!(set, FeatureSet::SEND_RECEIVE);
        assert_eq!(
            serde_json::to_string(&FeatureSet::RECEIVE).unwrap(),
            r#"["receive"]"#
        );
        assert_eq!(serde_json::to_string(&FeatureSet::NONE).unwrap(), "[]");
    }

    #[test]
    fn test_display() {
        assert_eq!(FeatureSet::SEND_RECEIVE.to_string(), "send+receive");
        assert_eq!(FeatureSet::NONE.to_string(), "none");
    }
}
