//! Process lifecycle.
//!
//! [`FederationRuntime`] owns the loaded configuration and a
//! [`FederationRouter`]. Adapters are built from their configuration sections
//! and registered with the router; [`run`](FederationRuntime::run) then starts
//! every transport and bot, dispatches until Ctrl+C or SIGTERM, and stops
//! everything again.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let mut runtime = FederationRuntime::builder()
//!     .config_file("modfed.toml")
//!     .build()?;
//!
//! runtime.register_configured_bots::<HttpBot>()?;
//! runtime.register_builtin_transports()?;
//! runtime.run().await?;
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use figment::value::Value;
use tokio::signal;
use tracing::{debug, error, info, warn};

use modfed_core::{
    Bot, BotAdapter, BotHandle, ConfigurableBot, ConfigurableTransport, FeatureSet,
    FederationRouter, TransportAdapter, TransportHandle,
};

use crate::config::{ConfigLoader, ConfigResult, ModfedConfig, section_features};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Owns the configuration and the router for one federation process.
pub struct FederationRuntime {
    config: ModfedConfig,
    router: FederationRouter,
    registered_bots: BTreeSet<String>,
    registered_transports: BTreeSet<String>,
}

impl FederationRuntime {
    /// Creates a runtime from `modfed.toml` / `modfed.yaml` in the current
    /// directory, falling back to defaults when loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                ModfedConfig::default()
            });

        Self::from_config(config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging from `config.logging` unless a subscriber is
    /// already installed.
    pub fn from_config(config: ModfedConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            bots = config.bots.len(),
            transports = config.transports.len(),
            "Runtime initialized from configuration"
        );

        let router = FederationRouter::new(config.router.clone());
        Self {
            config,
            router,
            registered_bots: BTreeSet::new(),
            registered_transports: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &ModfedConfig {
        &self.config
    }

    pub fn router(&self) -> &FederationRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut FederationRouter {
        &mut self.router
    }

    // =========================================================================
    // Bots
    // =========================================================================

    /// Builds a `B` from `bots.<identity>` and registers it.
    ///
    /// A missing section yields `B::Config::default()`.
    pub fn register_bot<B: ConfigurableBot>(&mut self, identity: &str) -> RuntimeResult<BotHandle> {
        let config: B::Config = section_config(self.config.bots.get(identity), "bot", identity)?;
        let adapter = B::from_config(config)?;
        debug!(bot = %identity, adapter = B::adapter_name(), "Built bot adapter");
        self.add_bot(identity, adapter)
    }

    /// Registers every bot whose section names `B`'s adapter type.
    pub fn register_configured_bots<B: ConfigurableBot>(&mut self) -> RuntimeResult<Vec<BotHandle>> {
        let identities: Vec<String> = self
            .config
            .bots_with_adapter(B::adapter_name())
            .map(str::to_string)
            .collect();

        identities
            .iter()
            .map(|identity| self.register_bot::<B>(identity))
            .collect()
    }

    /// Registers an already built bot adapter.
    pub fn add_bot(&mut self, identity: &str, adapter: impl BotAdapter) -> RuntimeResult<BotHandle> {
        let handle = self.router.register_bot(Bot::new(identity, adapter))?;
        self.registered_bots.insert(identity.to_string());
        Ok(handle)
    }

    // =========================================================================
    // Transports
    // =========================================================================

    /// Builds a `T` from `transports.<name>` and registers it with the
    /// section's `features`, or everything `T` advertises.
    pub fn register_transport<T: ConfigurableTransport>(
        &mut self,
        name: &str,
    ) -> RuntimeResult<TransportHandle> {
        let section = self.config.transports.get(name);
        let config: T::Config = section_config(section, "transport", name)?;
        let features = match section {
            Some(section) => section_features(section).map_err(|e| {
                RuntimeError::AdapterConfigDeserialize(format!(
                    "Invalid features for transport '{name}': {e}"
                ))
            })?,
            None => None,
        };

        let adapter = T::from_config(name, config)?;
        debug!(transport = %name, adapter = T::adapter_name(), "Built transport adapter");
        self.add_transport(adapter, features)
    }

    /// Registers every transport whose section names `T`'s adapter type.
    pub fn register_configured_transports<T: ConfigurableTransport>(
        &mut self,
    ) -> RuntimeResult<Vec<TransportHandle>> {
        let names: Vec<String> = self
            .config
            .transports_with_adapter(T::adapter_name())
            .map(str::to_string)
            .collect();

        names
            .iter()
            .map(|name| self.register_transport::<T>(name))
            .collect()
    }

    /// Registers every configured transport whose adapter type ships with
    /// `modfed-transport` under the enabled features.
    pub fn register_builtin_transports(&mut self) -> RuntimeResult<Vec<TransportHandle>> {
        let mut handles = self.register_configured_transports::<modfed_transport::LocalBus>()?;

        #[cfg(feature = "ws-client")]
        handles.extend(self.register_configured_transports::<modfed_transport::WsRelay>()?);

        Ok(handles)
    }

    /// Registers an already built transport adapter.
    pub fn add_transport(
        &mut self,
        adapter: impl TransportAdapter,
        features: Option<FeatureSet>,
    ) -> RuntimeResult<TransportHandle> {
        let name = adapter.name().to_string();
        let handle = self.router.register_transport(adapter, features)?;
        self.registered_transports.insert(name);
        Ok(handle)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` resolves.
    ///
    /// Fails with [`RouterError::StartupFailed`](modfed_core::RouterError::StartupFailed)
    /// if any component fails to start; whatever had started is stopped again.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.warn_unregistered();

        info!("Federation runtime is starting");
        if let Err(e) = self.router.run_until(shutdown).await {
            error!(error = %e, "Federation runtime failed to start");
            return Err(e.into());
        }
        info!("Federation runtime stopped");
        Ok(())
    }

    fn warn_unregistered(&self) {
        for identity in self.config.bots.keys() {
            if !self.registered_bots.contains(identity) {
                warn!(bot = %identity, "Configured bot was not registered with any adapter");
            }
        }
        for name in self.config.transports.keys() {
            if !self.registered_transports.contains(name) {
                warn!(transport = %name, "Configured transport was not registered with any adapter");
            }
        }
    }
}

impl Default for FederationRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserializes an adapter section, falling back to the default config.
fn section_config<C>(section: Option<&Value>, kind: &str, key: &str) -> RuntimeResult<C>
where
    C: serde::de::DeserializeOwned + Default,
{
    match section {
        Some(value) => value.deserialize().map_err(|e| {
            RuntimeError::AdapterConfigDeserialize(format!(
                "Failed to deserialize config for {kind} '{key}': {e}"
            ))
        }),
        None => {
            warn!(kind, key, "No configuration section found, using default");
            Ok(C::default())
        }
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal as unix_signal};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => report_ctrl_c(result).await,
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                report_ctrl_c(signal::ctrl_c().await).await;
            }
        }
    }

    #[cfg(not(unix))]
    report_ctrl_c(signal::ctrl_c().await).await;
}

async fn report_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`FederationRuntime`] with custom configuration sources.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile, e.g. `"production"`.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: ModfedConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<FederationRuntime> {
        let config = self.config_loader.load()?;
        Ok(FederationRuntime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modfed_core::mock::MockBot;
    use modfed_core::{ActionDraft, ActionReason, Feature, ModerationAction};

    fn config(yaml: &str) -> ModfedConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_registers_configured_adapters() {
        let mut runtime = FederationRuntime::from_config(config(
            r#"
bots:
  bot-a: { adapter: mock }
  bot-b: { adapter: mock }
  panel: { adapter: http }
transports:
  bus: { adapter: local, channel: runtime-test-registers, features: [send] }
"#,
        ));

        let bots = runtime.register_configured_bots::<MockBot>().unwrap();
        assert_eq!(bots.len(), 2);
        assert_eq!(bots[0].identity(), "bot-a");

        let transports = runtime.register_builtin_transports().unwrap();
        assert_eq!(transports.len(), 1);
        let bus = runtime.router().transport(&transports[0]).unwrap();
        assert!(bus.permits(Feature::Send));
        assert!(!bus.permits(Feature::Receive));

        runtime.run_until(async {}).await.unwrap();
        assert!(runtime.router().bots().all(|bot| !bot.is_running()));
    }

    #[tokio::test]
    async fn test_bad_section_is_reported() {
        let mut runtime = FederationRuntime::from_config(config(
            "transports:\n  bus: { adapter: local, capacity: lots }\n",
        ));

        assert!(matches!(
            runtime.register_builtin_transports(),
            Err(RuntimeError::AdapterConfigDeserialize(_))
        ));
    }

    #[tokio::test]
    async fn test_runtimes_federate_over_local_bus() {
        let yaml = |bot: &str| {
            format!(
                "bots:\n  {bot}: {{ adapter: mock }}\ntransports:\n  bus: {{ adapter: local, channel: runtime-test-federate }}\n"
            )
        };

        let mut west = FederationRuntime::from_config(config(&yaml("west")));
        let west_bot = MockBot::new();
        west.add_bot("west", west_bot.clone()).unwrap();
        west.register_builtin_transports().unwrap();

        let mut east = FederationRuntime::from_config(config(&yaml("east")));
        let east_bot = MockBot::new();
        east.add_bot("east", east_bot.clone()).unwrap();
        east.register_builtin_transports().unwrap();

        let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
        let until_stopped = |mut rx: tokio::sync::watch::Receiver<bool>| async move {
            let _ = rx.wait_for(|stop| *stop).await;
        };

        let driver = async {
            while west_bot.connect_count() == 0 || east_bot.connect_count() == 0 {
                tokio::task::yield_now().await;
            }
            let ban = ModerationAction::create(
                "ban",
                ActionDraft::new("U1", "M1", "spam", ActionReason::Spam),
            )
            .unwrap();
            west_bot.fake_action(ban);

            tokio::time::timeout(std::time::Duration::from_secs(5), async {
                while east_bot.performed().is_empty() {
                    tokio::task::yield_now().await;
                }
            })
            .await
            .unwrap();
            let _ = stop_tx.send(true);
        };

        let (west_result, east_result, ()) = tokio::join!(
            west.run_until(until_stopped(stop_rx.clone())),
            east.run_until(until_stopped(stop_rx)),
            driver
        );
        west_result.unwrap();
        east_result.unwrap();

        assert_eq!(east_bot.performed().len(), 1);
        assert!(west_bot.performed().is_empty());
    }
}
