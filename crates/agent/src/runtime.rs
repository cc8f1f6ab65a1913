//! Wiring a configured agent out of an [`AppConfig`].

use crate::gateway::ModelGateway;
use crate::loop_runner::AgentLoop;
use crate::recipe::{AutomationSwitch, RECIPES_FILE, RecipeBook, STOP_FILE};
use crate::stores::Stores;
use ember_config::AppConfig;
use ember_core::event::EventBus;
use ember_core::provider::Provider;
use ember_core::session::Session;
use ember_telemetry::{ModelPricing, PricingTable};
use ember_tools::{ToolSettings, UpgradePolicy, default_registry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A ready-to-run agent plus the state it shares with the CLI.
pub struct Runtime {
    pub agent: AgentLoop,
    pub stores: Arc<Stores>,
    pub recipes: RecipeBook,
    pub switch: AutomationSwitch,
    short_term_cap: usize,
}

impl Runtime {
    /// Open the stores under the configured data dir and build the registry,
    /// gateway and loop. Relative tool paths resolve against `workdir`.
    pub fn build(config: &AppConfig, provider: Arc<dyn Provider>, workdir: PathBuf) -> Self {
        let data_dir = config.data_dir();
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            warn!("Could not create data dir {}: {e}", data_dir.display());
        }

        let events = Arc::new(EventBus::default());
        let stores = Arc::new(Stores::open(&data_dir, &config.memory, events));

        let settings = tool_settings(config, &data_dir, workdir);
        let tools = Arc::new(default_registry(
            settings,
            stores.mood.clone(),
            stores.profile.clone(),
        ));
        debug!(tools = tools.len(), data_dir = %data_dir.display(), "Runtime assembled");

        let pricing = PricingTable::with_defaults().with_overrides(
            config
                .pricing
                .iter()
                .map(|(model, p)| (model.clone(), ModelPricing::new(p.input, p.output))),
        );
        let gateway = ModelGateway::new(provider, &config.default_model)
            .with_pricing(pricing)
            .with_aliases(config.models.clone())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens);

        let agent = AgentLoop::new(gateway, tools, stores.clone())
            .with_max_iterations(config.max_iterations)
            .with_recall_excerpts(config.memory.recall_excerpts);

        Self {
            agent,
            recipes: RecipeBook::open(data_dir.join(RECIPES_FILE)),
            switch: AutomationSwitch::new().with_stop_file(data_dir.join(STOP_FILE)),
            stores,
            short_term_cap: config.memory.short_term_cap,
        }
    }

    /// A fresh conversation, counted as a new session in the self-model.
    pub async fn new_session(&self) -> Session {
        if let Err(e) = self.stores.mood.start_session().await {
            warn!("Could not record session start: {e}");
        }
        Session::new(self.short_term_cap)
    }
}

pub fn tool_settings(config: &AppConfig, data_dir: &Path, workdir: PathBuf) -> ToolSettings {
    let mut protected_roots = vec![data_dir.to_path_buf()];
    if let Some(install_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        protected_roots.push(install_dir);
    }

    ToolSettings {
        timeout: Duration::from_secs(config.tools.timeout_secs),
        max_output_chars: config.tools.max_output_chars,
        max_read_chars: config.tools.max_read_chars,
        http_max_chars: config.tools.http_max_chars,
        workdir,
        forbidden_paths: config.tools.forbidden_paths.clone(),
        protected_roots,
        upgrade: Arc::new(UpgradePolicy::new(
            config.auto_upgrade,
            data_dir.to_path_buf(),
            config.tools.upgrade_targets.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;

    #[tokio::test]
    async fn build_wires_config_into_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: Some(dir.path().join("data")),
            max_iterations: 7,
            ..AppConfig::default()
        };
        let provider = Arc::new(ScriptedProvider::new(vec![]));

        let runtime = Runtime::build(&config, provider, dir.path().to_path_buf());
        assert_eq!(runtime.agent.tools().len(), 14);
        assert_eq!(runtime.agent.gateway().default_model(), "openai/gpt-4o-mini");
        assert!(dir.path().join("data").join("persona.toml").exists());

        let session = runtime.new_session().await;
        assert_eq!(session.short_term.cap(), config.memory.short_term_cap);
        assert_eq!(runtime.stores.mood.record().await.stats.sessions, 1);
    }

    #[test]
    fn settings_protect_the_data_dir() {
        let config = AppConfig::default();
        let settings = tool_settings(&config, Path::new("/srv/ember"), PathBuf::from("/work"));
        assert!(settings.protected_roots.contains(&PathBuf::from("/srv/ember")));
        assert_eq!(settings.timeout, Duration::from_secs(120));
        assert!(settings.upgrade.enabled());
    }
}
