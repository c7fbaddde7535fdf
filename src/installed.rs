//! Installed application OAuth flow backed by a client secrets file.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use yup_oauth2::authenticator_delegate::{DefaultInstalledFlowDelegate, InstalledFlowDelegate};
use yup_oauth2::{ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod};

use crate::credential::{Credential, CredentialOrigin, TokenSource};
use crate::error::{Error, Result};
use crate::prompt::SecretsPrompt;
use crate::provider::CredentialProvider;
use crate::store::FileDataStore;

/// Reads and parses a client secrets file (`{"installed": {...}}` or `{"web": {...}}`)
pub fn load_client_secrets(path: &Path) -> Result<ApplicationSecret> {
    let location = path.display();
    let contents = std::fs::read(path).map_err(|e| Error::config(&location, e))?;
    yup_oauth2::parse_application_secret(contents).map_err(|e| Error::config(&location, e))
}

/// Obtains user consent and a token, persisting it to `token_path`.
///
/// Implementations reuse a still valid token found at `token_path` instead of
/// asking the user again.
#[async_trait]
pub trait InstalledAppFlow: Send + Sync {
    async fn authorize(
        &self,
        secret: ApplicationSecret,
        token_path: &Path,
        scopes: &[String],
    ) -> Result<Arc<dyn TokenSource>>;
}

/// Browser consent with the redirect captured on a loopback listener
#[derive(Debug, Clone, Copy)]
pub struct LoopbackFlow {
    port: Option<u16>,
    open_browser: bool,
}

impl LoopbackFlow {
    pub fn new(port: Option<u16>, open_browser: bool) -> Self {
        Self { port, open_browser }
    }
}

#[async_trait]
impl InstalledAppFlow for LoopbackFlow {
    async fn authorize(
        &self,
        secret: ApplicationSecret,
        token_path: &Path,
        scopes: &[String],
    ) -> Result<Arc<dyn TokenSource>> {
        let method = match self.port {
            Some(port) => InstalledFlowReturnMethod::HTTPPortRedirect(port),
            None => InstalledFlowReturnMethod::HTTPRedirect,
        };
        let auth = InstalledFlowAuthenticator::builder(secret, method)
            .persist_tokens_to_disk(token_path)
            .flow_delegate(Box::new(BrowserDelegate {
                open_browser: self.open_browser,
            }))
            .build()
            .await
            .map_err(Error::authorization)?;

        // ask for a token now so consent happens during setup, not on the first API call
        auth.token(scopes).await.map_err(Error::authorization)?;
        Ok(Arc::new(auth))
    }
}

#[derive(Copy, Clone)]
struct BrowserDelegate {
    open_browser: bool,
}

async fn browser_user_url(
    url: &str,
    need_code: bool,
    open_browser: bool,
) -> Result<String, String> {
    if open_browser {
        if let Err(err) = open::that(url) {
            warn!(%err, "could not open a browser");
        }
    }
    DefaultInstalledFlowDelegate.present_user_url(url, need_code).await
}

impl InstalledFlowDelegate for BrowserDelegate {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(browser_user_url(url, need_code, self.open_browser))
    }
}

/// Credentials from a client secrets file, authorized once and kept in a [`FileDataStore`]
pub struct InstalledAppProvider {
    client_secrets: Option<PathBuf>,
    bundled_secrets: Option<PathBuf>,
    data_store_dir: PathBuf,
    user_key: String,
    prompt: Box<dyn SecretsPrompt>,
    flow: Box<dyn InstalledAppFlow>,
}

impl InstalledAppProvider {
    pub fn new(
        client_secrets: Option<PathBuf>,
        bundled_secrets: Option<PathBuf>,
        data_store_dir: PathBuf,
        user_key: String,
        prompt: Box<dyn SecretsPrompt>,
        flow: Box<dyn InstalledAppFlow>,
    ) -> Self {
        Self {
            client_secrets,
            bundled_secrets,
            data_store_dir,
            user_key,
            prompt,
            flow,
        }
    }

    /// Explicit path, then the bundled file if it exists, then the prompt
    fn client_secrets_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.client_secrets {
            return Ok(path.clone());
        }
        if let Some(path) = self.bundled_secrets.as_deref().filter(|p| p.is_file()) {
            debug!(path = %path.display(), "using bundled client secrets");
            return Ok(path.to_path_buf());
        }
        self.prompt.client_secrets_path()
    }
}

#[async_trait]
impl CredentialProvider for InstalledAppProvider {
    fn name(&self) -> &'static str {
        "installed app"
    }

    async fn try_resolve(&self, scopes: &[String]) -> Result<Option<Credential>> {
        let path = self.client_secrets_path()?;
        let secret = load_client_secrets(&path)?;
        let store = FileDataStore::open(&self.data_store_dir)?;
        let token_path = store.token_path(&self.user_key);

        if store.contains(&self.user_key) {
            debug!(path = %token_path.display(), "found stored token");
        } else {
            info!("no stored token, starting browser authorization");
        }

        let source = self.flow.authorize(secret, &token_path, scopes).await?;
        Ok(Some(
            Credential::new(source, CredentialOrigin::InstalledApp).with_scopes(scopes),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DISPLAY_VIDEO_SCOPE;
    use crate::credential::tests::StaticTokenSource;
    use serde_json::json;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;

    const SECRETS: &str = r#"{
        "installed": {
            "client_id": "1234.apps.googleusercontent.com",
            "project_id": "dv360-samples",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    /// Records what it was asked to authorize and never touches the network
    #[derive(Default, Clone)]
    struct RecordingFlow {
        seen: Arc<Mutex<Vec<(String, PathBuf, bool)>>>,
    }

    #[async_trait]
    impl InstalledAppFlow for RecordingFlow {
        async fn authorize(
            &self,
            secret: ApplicationSecret,
            token_path: &Path,
            _scopes: &[String],
        ) -> Result<Arc<dyn TokenSource>> {
            let had_token = token_path.is_file();
            self.seen
                .lock()
                .unwrap()
                .push((secret.client_id, token_path.to_path_buf(), had_token));
            Ok(StaticTokenSource::new("stored"))
        }
    }

    struct DenyingFlow;

    #[async_trait]
    impl InstalledAppFlow for DenyingFlow {
        async fn authorize(
            &self,
            _secret: ApplicationSecret,
            _token_path: &Path,
            _scopes: &[String],
        ) -> Result<Arc<dyn TokenSource>> {
            Err(Error::authorization("access_denied"))
        }
    }

    /// A prompt that either answers with a path or behaves as if no console is attached
    struct FakePrompt {
        answer: Option<PathBuf>,
        asked: Arc<Mutex<usize>>,
    }

    impl SecretsPrompt for FakePrompt {
        fn client_secrets_path(&self) -> Result<PathBuf> {
            *self.asked.lock().unwrap() += 1;
            self.answer
                .clone()
                .ok_or_else(|| Error::Input("no console attached".to_string()))
        }
    }

    fn no_console() -> (Box<dyn SecretsPrompt>, Arc<Mutex<usize>>) {
        let asked = Arc::new(Mutex::new(0));
        (
            Box::new(FakePrompt {
                answer: None,
                asked: asked.clone(),
            }),
            asked,
        )
    }

    fn scopes() -> Vec<String> {
        vec![DISPLAY_VIDEO_SCOPE.to_string()]
    }

    #[test]
    fn client_secrets_are_parsed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("client_secrets.json");
        fs::write(&path, SECRETS).unwrap();

        let secret = load_client_secrets(&path).unwrap();
        assert_eq!(secret.client_id, "1234.apps.googleusercontent.com");
        assert_eq!(secret.client_secret, "shh");
    }

    #[tokio::test]
    async fn stored_token_is_handed_to_the_flow() {
        let tmp = tempfile::tempdir().unwrap();
        let secrets = tmp.path().join("client_secrets.json");
        fs::write(&secrets, SECRETS).unwrap();
        let store_dir = tmp.path().join("store");
        fs::create_dir(&store_dir).unwrap();
        fs::write(store_dir.join("user.json"), "[]").unwrap();

        let flow = RecordingFlow::default();
        let (prompt, asked) = no_console();
        let provider = InstalledAppProvider::new(
            Some(secrets),
            None,
            store_dir.clone(),
            "user".to_string(),
            prompt,
            Box::new(flow.clone()),
        );

        let credential = provider.try_resolve(&scopes()).await.unwrap().unwrap();

        assert_eq!(credential.origin(), CredentialOrigin::InstalledApp);
        assert_eq!(credential.scopes(), scopes().as_slice());
        assert_eq!(credential.access_token().await.unwrap(), "stored");
        assert_eq!(
            *flow.seen.lock().unwrap(),
            vec![(
                "1234.apps.googleusercontent.com".to_string(),
                store_dir.join("user.json"),
                true
            )]
        );
        assert_eq!(*asked.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn bundled_secrets_are_used_when_no_path_given() {
        let tmp = tempfile::tempdir().unwrap();
        let bundled = tmp.path().join("client_secrets.json");
        fs::write(&bundled, SECRETS).unwrap();

        let flow = RecordingFlow::default();
        let (prompt, asked) = no_console();
        let provider = InstalledAppProvider::new(
            None,
            Some(bundled),
            tmp.path().join("store"),
            "user".to_string(),
            prompt,
            Box::new(flow.clone()),
        );

        assert!(provider.try_resolve(&scopes()).await.unwrap().is_some());
        assert_eq!(flow.seen.lock().unwrap().len(), 1);
        assert_eq!(*asked.lock().unwrap(), 0);
        assert!(tmp.path().join("store").is_dir());
    }

    #[tokio::test]
    async fn prompt_answer_is_used_when_nothing_else_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let entered = tmp.path().join("entered.json");
        fs::write(&entered, SECRETS).unwrap();
        let asked = Arc::new(Mutex::new(0));

        let flow = RecordingFlow::default();
        let provider = InstalledAppProvider::new(
            None,
            Some(tmp.path().join("absent.json")),
            tmp.path().join("store"),
            "user".to_string(),
            Box::new(FakePrompt {
                answer: Some(entered),
                asked: asked.clone(),
            }),
            Box::new(flow.clone()),
        );

        assert!(provider.try_resolve(&scopes()).await.unwrap().is_some());
        assert_eq!(*asked.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn no_secrets_and_no_console_fails_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let store_dir = tmp.path().join("store");
        let flow = RecordingFlow::default();
        let (prompt, asked) = no_console();
        let provider = InstalledAppProvider::new(
            None,
            Some(tmp.path().join("absent.json")),
            store_dir.clone(),
            "user".to_string(),
            prompt,
            Box::new(flow.clone()),
        );

        let err = provider.try_resolve(&scopes()).await.unwrap_err();

        assert!(matches!(err, Error::Input(_)));
        assert_eq!(*asked.lock().unwrap(), 1);
        assert!(!store_dir.exists());
        assert!(flow.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_secrets_never_fall_back_to_the_prompt() {
        let tmp = tempfile::tempdir().unwrap();
        let secrets = tmp.path().join("client_secrets.json");
        fs::write(&secrets, "{\"installed\": ").unwrap();
        let store_dir = tmp.path().join("store");

        let flow = RecordingFlow::default();
        let (prompt, asked) = no_console();
        let provider = InstalledAppProvider::new(
            Some(secrets),
            None,
            store_dir.clone(),
            "user".to_string(),
            prompt,
            Box::new(flow.clone()),
        );

        let err = provider.try_resolve(&scopes()).await.unwrap_err();

        assert!(matches!(err, Error::Config { .. }));
        assert_eq!(*asked.lock().unwrap(), 0);
        assert!(!store_dir.exists());
    }

    #[tokio::test]
    async fn missing_explicit_secrets_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let (prompt, asked) = no_console();
        let provider = InstalledAppProvider::new(
            Some(tmp.path().join("nope.json")),
            None,
            tmp.path().join("store"),
            "user".to_string(),
            prompt,
            Box::new(RecordingFlow::default()),
        );

        assert!(matches!(
            provider.try_resolve(&scopes()).await,
            Err(Error::Config { .. })
        ));
        assert_eq!(*asked.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn denied_consent_is_an_authorization_error() {
        let tmp = tempfile::tempdir().unwrap();
        let secrets = tmp.path().join("client_secrets.json");
        fs::write(&secrets, SECRETS).unwrap();
        let (prompt, _) = no_console();
        let provider = InstalledAppProvider::new(
            Some(secrets),
            None,
            tmp.path().join("store"),
            "user".to_string(),
            prompt,
            Box::new(DenyingFlow),
        );

        assert!(matches!(
            provider.try_resolve(&scopes()).await,
            Err(Error::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn loopback_flow_returns_stored_token_without_listening() {
        let tmp = tempfile::tempdir().unwrap();
        let token_path = tmp.path().join("user.json");
        fs::write(
            &token_path,
            json!([{
                "scopes": [DISPLAY_VIDEO_SCOPE],
                "token": {
                    "access_token": "stored-at",
                    "refresh_token": null,
                    "expires_at": null,
                    "id_token": null
                }
            }])
            .to_string(),
        )
        .unwrap();
        let secret = yup_oauth2::parse_application_secret(SECRETS).unwrap();
        let flow = LoopbackFlow::new(Some(1), false);

        let source = tokio::time::timeout(
            Duration::from_secs(10),
            flow.authorize(secret, &token_path, &scopes()),
        )
        .await
        .expect("stored token should not start a consent flow")
        .unwrap();

        assert_eq!(
            source.access_token(&[DISPLAY_VIDEO_SCOPE]).await.unwrap(),
            "stored-at"
        );
    }
}
