use crate::Config;
use crate::catalog::{SharedRegistry, StaticCatalog};
use crate::claim::{SigningKey, TokenIssuer, TokenValidator};
use crate::clock::SharedClock;
use crate::gate::AccessGate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct AppState {
    pub issuer: TokenIssuer,
    pub gate: AccessGate,
    pub catalog: SharedRegistry,

    pub media_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &Config, clock: SharedClock) -> anyhow::Result<Self> {
        let key = match &config.signing_key {
            Some(material) => SigningKey::new(material)?,
            None => {
                warn!("No signing key configured, generated an ephemeral one");
                SigningKey::generate()?
            }
        };
        let key = Arc::new(key);

        let catalog = StaticCatalog::from_entries(&config.videos);
        info!(videos = catalog.len(), "Video catalog loaded");
        let catalog: SharedRegistry = Arc::new(catalog);

        let policy = config.exemption_policy()?;
        for rule in policy.rules() {
            info!(pattern = %rule.pattern, scope = ?rule.scope, rationale = %rule.rationale, "Exemption rule");
        }

        let issuer = TokenIssuer::new(key.clone(), catalog.clone(), clock.clone(), config.token_ttl());
        let gate = AccessGate::new(policy, TokenValidator::new(key, clock));

        Ok(Self {
            issuer,
            gate,
            catalog,

            media_dir: PathBuf::from(&config.media_dir),
            static_dir: PathBuf::from(&config.static_dir),
        })
    }

    pub fn media_dir(&self) -> &Path {
        self.media_dir.as_path()
    }

    pub fn static_dir(&self) -> &Path {
        self.static_dir.as_path()
    }
}
