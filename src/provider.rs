//! Ordered credential resolution.
//!
//! A [`CredentialResolver`] walks its providers in order and returns the first
//! credential one of them produces. A provider answers `Ok(None)` when its
//! source is simply absent; any `Err` aborts resolution without trying the
//! remaining providers.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::adc::ApplicationDefaultProvider;
use crate::config::FactoryConfig;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::installed::{InstalledAppProvider, LoopbackFlow};
use crate::prompt::ConsolePrompt;

/// A single source of credentials
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn try_resolve(&self, scopes: &[String]) -> Result<Option<Credential>>;
}

pub struct CredentialResolver {
    providers: Vec<Box<dyn CredentialProvider>>,
    scopes: Vec<String>,
}

impl CredentialResolver {
    /// An empty resolver; add providers with [`CredentialResolver::with_provider`]
    pub fn new<S: Into<String>>(scopes: impl IntoIterator<Item = S>) -> Self {
        Self {
            providers: Vec::new(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Application default credentials, then the installed-app flow using
    /// `client_secrets` (or the bundled file, or a console prompt)
    pub fn from_config(config: &FactoryConfig, client_secrets: Option<PathBuf>) -> Self {
        let flow = LoopbackFlow::new(config.redirect_port, config.open_browser);
        let installed = InstalledAppProvider::new(
            client_secrets,
            config.bundled_secrets_path.clone(),
            config.data_store_dir.clone(),
            config.user_key.clone(),
            Box::new(ConsolePrompt),
            Box::new(flow),
        );

        Self::new(config.scopes.clone())
            .with_provider(ApplicationDefaultProvider::from_env(
                config.metadata_probe_timeout,
            ))
            .with_provider(installed)
    }

    pub fn with_provider(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub async fn resolve(&self) -> Result<Credential> {
        for provider in &self.providers {
            match provider.try_resolve(&self.scopes).await? {
                Some(credential) => {
                    info!(provider = provider.name(), "resolved credentials");
                    return Ok(credential.with_scopes(&self.scopes));
                }
                None => debug!(provider = provider.name(), "no credentials available"),
            }
        }
        Err(Error::authorization("no credential provider produced a credential"))
    }
}
