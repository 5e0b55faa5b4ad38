use tracing::{debug, warn};

use super::{Feature, FeatureSet, ReceiveHandler, Transport};
use crate::envelope::FederatedMessage;
use crate::error::{TransportError, TransportResult};

/// A [`Transport`] gated by an administrative switch and a permitted feature set.
///
/// A feature is usable only while the transport is enabled and the feature is
/// permitted. The permitted set is always a subset of the advertised set.
#[derive(Debug)]
pub struct EnabledTransport {
    transport: Transport,
    enabled: bool,
    permitted: FeatureSet,
}

impl EnabledTransport {
    /// Wraps `transport`, initially disabled with no permitted features.
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            enabled: false,
            permitted: FeatureSet::NONE,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn name(&self) -> &str {
        self.transport.name()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn permitted_features(&self) -> FeatureSet {
        self.permitted
    }

    /// Returns whether `feature` may be used right now.
    pub fn permits(&self, feature: Feature) -> bool {
        self.enabled && self.permitted.allows(feature)
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disables the transport and stops it.
    pub async fn disable(&mut self) {
        self.enabled = false;
        if let Err(e) = self.transport.stop().await {
            warn!(transport = %self.name(), error = %e, "Failed to stop disabled transport");
        }
    }

    /// Adds `features` to the permitted set.
    ///
    /// Fails without changing anything if any of them is not advertised.
    pub fn enable_feature(&mut self, features: impl Into<FeatureSet>) -> TransportResult<()> {
        let features = features.into();
        if let Some(feature) = features.first_missing_from(self.transport.advertised_features()) {
            return Err(TransportError::FeatureUnavailable {
                transport: self.name().to_string(),
                feature,
            });
        }
        self.permitted = self.permitted.union(features);
        debug!(transport = %self.name(), permitted = %self.permitted, "Features enabled");
        Ok(())
    }

    /// Starts the transport if it is enabled.
    pub async fn start(&self) -> TransportResult<bool> {
        if !self.enabled {
            return Err(TransportError::Disabled {
                transport: self.name().to_string(),
            });
        }
        self.transport.start().await
    }

    pub async fn stop(&self) -> TransportResult<bool> {
        self.transport.stop().await
    }

    /// Sends `message` if [`Feature::Send`] is permitted.
    pub async fn send(&self, message: &FederatedMessage) -> TransportResult<()> {
        self.check(Feature::Send)?;
        self.transport.send(message).await
    }

    /// Installs `handler` if [`Feature::Receive`] is permitted.
    pub fn set_receive_handler(&self, handler: ReceiveHandler) -> TransportResult<()> {
        self.check(Feature::Receive)?;
        self.transport.set_receive_handler(handler);
        Ok(())
    }

    fn check(&self, feature: Feature) -> TransportResult<()> {
        if self.permits(feature) {
            Ok(())
        } else {
            Err(TransportError::FeatureNotPermitted {
                transport: self.name().to_string(),
                feature,
            })
        }
    }
}
