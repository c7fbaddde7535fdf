use std::path::PathBuf;

use hyper::client::connect::Connect;
use hyper::Client;
use tracing::warn;

use crate::config::FactoryConfig;
use crate::credential::Credential;
use crate::error::Result;
use crate::initializer::TimeoutInitializer;
use crate::provider::CredentialResolver;
use crate::service::{https_client, DisplayVideoService};

/// Handles OAuth and service creation for the Display & Video 360 API samples
#[derive(Debug, Clone, Default)]
pub struct DisplayVideoFactory {
    config: FactoryConfig,
}

impl DisplayVideoFactory {
    pub fn new(config: FactoryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Performs all setup needed to run requests against the API.
    ///
    /// Credentials are resolved on every call: application default credentials
    /// when available, otherwise the installed-app flow with `client_secrets`,
    /// the bundled secrets file or a path entered on the console.
    pub async fn get_instance(
        &self,
        client_secrets: Option<PathBuf>,
    ) -> Result<DisplayVideoService> {
        let resolver = CredentialResolver::from_config(&self.config, client_secrets);
        let credential = resolver.resolve().await?;
        Ok(self.build(credential, https_client(self.config.connect_timeout)))
    }

    /// Same as [`DisplayVideoFactory::get_instance`] with a caller supplied resolver and transport
    pub async fn get_instance_with<C>(
        &self,
        resolver: &CredentialResolver,
        client: Client<C>,
    ) -> Result<DisplayVideoService<C>>
    where
        C: Connect + Clone + Send + Sync + 'static,
    {
        let credential = resolver.resolve().await?;
        Ok(self.build(credential, client))
    }

    fn build<C>(&self, credential: Credential, client: Client<C>) -> DisplayVideoService<C>
    where
        C: Connect + Clone + Send + Sync + 'static,
    {
        let application_name = self.config.effective_application_name();
        if application_name.trim().is_empty() {
            warn!("application name is not set, it should look like \"MyCompany-ProductName/1.0\"");
        }

        let initializer = TimeoutInitializer::wrap(
            credential,
            self.config.connect_timeout,
            self.config.read_timeout,
        );
        DisplayVideoService::new(
            client,
            initializer,
            application_name,
            self.config.base_url.clone(),
        )
    }
}
