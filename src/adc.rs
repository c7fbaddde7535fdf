//! Application default credentials.
//!
//! Discovery goes through the following steps, stopping at the first hit:
//! 1. `GOOGLE_APPLICATION_CREDENTIALS_JSON` holding a service account key
//! 2. `GOOGLE_APPLICATION_CREDENTIALS` pointing at a service account or authorized user file
//! 3. the gcloud well-known file, `~/.config/gcloud/application_default_credentials.json`
//! on linux and `%APPDATA%/gcloud/application_default_credentials.json` on windows
//! (run `gcloud auth application-default login` to create it)
//! 4. the metadata server, when a probe timeout is configured
//!
//! A source that is not there is skipped. A source that is there but can not be
//! read or parsed is an error; it is never treated as absent.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use yup_oauth2::authenticator::ApplicationDefaultCredentialsTypes;
use yup_oauth2::authorized_user::AuthorizedUserSecret;
use yup_oauth2::{
    ApplicationDefaultCredentialsAuthenticator, ApplicationDefaultCredentialsFlowOpts,
    AuthorizedUserAuthenticator, ServiceAccountAuthenticator, ServiceAccountKey,
};

use crate::credential::{Credential, CredentialOrigin, HttpsAuthenticator};
use crate::error::{Error, Result};
use crate::provider::CredentialProvider;

const DEFAULT_CREDENTIALS_FILE: &str = "application_default_credentials.json";
const ENV_CREDENTIALS_JSON: &str = "GOOGLE_APPLICATION_CREDENTIALS_JSON";
const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Where application default credentials may come from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdcSources {
    /// Inline service account key
    pub credentials_json: Option<String>,
    /// Explicitly configured credentials file, must exist when set
    pub credentials_file: Option<PathBuf>,
    /// gcloud well-known file, skipped when it does not exist
    pub well_known_file: Option<PathBuf>,
}

impl AdcSources {
    /// Blank environment variables count as unset
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        Self {
            credentials_json: non_blank(ENV_CREDENTIALS_JSON),
            credentials_file: non_blank(ENV_CREDENTIALS).map(PathBuf::from),
            well_known_file: well_known_file(),
        }
    }
}

fn well_known_file() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA").map(|app_data| {
            Path::new(&app_data)
                .join("gcloud")
                .join(DEFAULT_CREDENTIALS_FILE)
        })
    } else {
        home::home_dir().map(|s| {
            s.join(".config")
                .join("gcloud")
                .join(DEFAULT_CREDENTIALS_FILE)
        })
    }
}

pub struct ApplicationDefaultProvider {
    sources: AdcSources,
    metadata_probe_timeout: Option<Duration>,
}

impl ApplicationDefaultProvider {
    pub fn new(sources: AdcSources, metadata_probe_timeout: Option<Duration>) -> Self {
        Self {
            sources,
            metadata_probe_timeout,
        }
    }

    pub fn from_env(metadata_probe_timeout: Option<Duration>) -> Self {
        Self::new(AdcSources::from_env(), metadata_probe_timeout)
    }

    async fn discover(&self, scopes: &[String]) -> Result<Option<HttpsAuthenticator>> {
        if let Some(json) = &self.sources.credentials_json {
            debug!("using service account key from {ENV_CREDENTIALS_JSON}");
            let key = serde_json::from_str::<ServiceAccountKey>(json)
                .map_err(|e| Error::config(ENV_CREDENTIALS_JSON, e))?;
            let auth = ServiceAccountAuthenticator::builder(key)
                .build()
                .await
                .map_err(|e| Error::config(ENV_CREDENTIALS_JSON, e))?;
            return Ok(Some(auth));
        }

        if let Some(path) = &self.sources.credentials_file {
            debug!(path = %path.display(), "using credentials file from {ENV_CREDENTIALS}");
            return auth_with_file(path).await.map(Some);
        }

        if let Some(path) = self.sources.well_known_file.as_deref() {
            if path.exists() {
                debug!(path = %path.display(), "using gcloud application default credentials");
                return auth_with_file(path).await.map(Some);
            }
        }

        match self.metadata_probe_timeout {
            Some(timeout) => Ok(probe_metadata_server(scopes, timeout).await),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CredentialProvider for ApplicationDefaultProvider {
    fn name(&self) -> &'static str {
        "application default"
    }

    async fn try_resolve(&self, scopes: &[String]) -> Result<Option<Credential>> {
        Ok(self.discover(scopes).await?.map(|auth| {
            Credential::new(Arc::new(auth), CredentialOrigin::ApplicationDefault)
                .with_scopes(scopes)
        }))
    }
}

/// Builds an authenticator from a service account key or an authorized user file
async fn auth_with_file(path: &Path) -> Result<HttpsAuthenticator> {
    let location = path.display();
    let contents = tokio::fs::read(path)
        .await
        .map_err(|e| Error::config(&location, e))?;
    let value: serde_json::Value =
        serde_json::from_slice(&contents).map_err(|e| Error::config(&location, e))?;

    let auth = if value.get("type").and_then(|t| t.as_str()) == Some("authorized_user") {
        let secret = serde_json::from_value::<AuthorizedUserSecret>(value)
            .map_err(|e| Error::config(&location, e))?;
        AuthorizedUserAuthenticator::builder(secret).build().await
    } else {
        let key = serde_json::from_value::<ServiceAccountKey>(value)
            .map_err(|e| Error::config(&location, e))?;
        ServiceAccountAuthenticator::builder(key).build().await
    };
    auth.map_err(|e| Error::config(&location, e))
}

/// Asks the metadata server for a token; any failure means "not on GCP"
async fn probe_metadata_server(
    scopes: &[String],
    timeout: Duration,
) -> Option<HttpsAuthenticator> {
    let opts = ApplicationDefaultCredentialsFlowOpts::default();
    let auth = match ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
        ApplicationDefaultCredentialsTypes::ServiceAccount(auth) => auth.build().await,
        ApplicationDefaultCredentialsTypes::InstanceMetadata(auth) => auth.build().await,
    };
    let auth = match auth {
        Ok(auth) => auth,
        Err(err) => {
            debug!(%err, "could not build metadata server authenticator");
            return None;
        }
    };

    match tokio::time::timeout(timeout, auth.token(scopes)).await {
        Ok(Ok(_)) => Some(auth),
        Ok(Err(err)) => {
            debug!(%err, "metadata server did not provide a token");
            None
        }
        Err(_) => {
            debug!(?timeout, "metadata server probe timed out");
            None
        }
    }
}
