use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::header::{HeaderValue, AUTHORIZATION};
use hyper_rustls::HttpsConnector;
use yup_oauth2::authenticator::Authenticator;

use crate::error::{Error, Result};
use crate::initializer::{HttpRequest, RequestInitializer};

/// Authenticator type produced by every yup-oauth2 flow used in this crate
pub type HttpsAuthenticator = Authenticator<HttpsConnector<HttpConnector>>;

/// Anything able to hand out OAuth access tokens for a set of scopes
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self, scopes: &[&str]) -> Result<String>;
}

#[async_trait]
impl TokenSource for HttpsAuthenticator {
    async fn access_token(&self, scopes: &[&str]) -> Result<String> {
        let token = self.token(scopes).await.map_err(Error::authorization)?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| Error::authorization("token response carried no access token"))
    }
}

/// Where a [`Credential`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOrigin {
    ApplicationDefault,
    InstalledApp,
}

/// A resolved credential narrowed to the scopes it will request tokens for
#[derive(Clone)]
pub struct Credential {
    source: Arc<dyn TokenSource>,
    scopes: Vec<String>,
    origin: CredentialOrigin,
}

impl Credential {
    pub fn new(source: Arc<dyn TokenSource>, origin: CredentialOrigin) -> Self {
        Self {
            source,
            scopes: Vec::new(),
            origin,
        }
    }

    /// Replaces the scopes tokens are requested for
    pub fn with_scopes<S: AsRef<str>>(mut self, scopes: &[S]) -> Self {
        self.scopes = scopes.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn origin(&self) -> CredentialOrigin {
        self.origin
    }

    pub async fn access_token(&self) -> Result<String> {
        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        self.source.access_token(&scopes).await
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("scopes", &self.scopes)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Attaches an `Authorization: Bearer` header
#[async_trait]
impl RequestInitializer for Credential {
    async fn initialize(&self, request: &mut HttpRequest) -> Result<()> {
        let token = self.access_token().await?;
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::authorization("access token is not a valid header value"))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}
