use std::path::{Path, PathBuf};
use std::time::Duration;

/// OAuth scope granting access to the Display & Video 360 API
pub const DISPLAY_VIDEO_SCOPE: &str = "https://www.googleapis.com/auth/display-video";

/// Connect and read timeout applied to every API request (3 minutes)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_millis(3 * 60_000);

/// Appended to a non-blank application name
pub const APPLICATION_NAME_SUFFIX: &str = "_JavaSamples";

/// Name of the client secrets file looked up in the bundled resources directory
pub const CLIENT_SECRETS_FILE: &str = "client_secrets.json";

/// Key under which the installed-app token is persisted
pub const DEFAULT_USER_KEY: &str = "user";

pub const DEFAULT_BASE_URL: &str = "https://displayvideo.googleapis.com/v1/";

const DEFAULT_METADATA_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

const ENV_APPLICATION_NAME: &str = "DV360_APPLICATION_NAME";
const ENV_DATA_STORE_DIR: &str = "DV360_DATA_STORE_DIR";
const ENV_CLIENT_SECRETS: &str = "DV360_CLIENT_SECRETS";

/// Settings used by [`crate::DisplayVideoFactory`].
///
/// `Default` gives the values the samples ship with; the `with_*` methods and
/// [`FactoryConfig::from_env`] override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Base application name. Should look like "MyCompany-ProductName/1.0"
    pub application_name: String,
    pub application_name_suffix: String,
    pub scopes: Vec<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Directory holding persisted user tokens
    pub data_store_dir: PathBuf,
    /// Client secrets file used when none is passed explicitly; skipped if it does not exist
    pub bundled_secrets_path: Option<PathBuf>,
    pub user_key: String,
    pub base_url: String,
    /// Fixed loopback port for the OAuth redirect, a random free port if `None`
    pub redirect_port: Option<u16>,
    pub open_browser: bool,
    /// How long to wait for the metadata server, `None` skips it
    pub metadata_probe_timeout: Option<Duration>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            application_name_suffix: APPLICATION_NAME_SUFFIX.to_string(),
            scopes: vec![DISPLAY_VIDEO_SCOPE.to_string()],
            connect_timeout: DEFAULT_HTTP_TIMEOUT,
            read_timeout: DEFAULT_HTTP_TIMEOUT,
            data_store_dir: default_data_store_dir(),
            bundled_secrets_path: Some(
                Path::new(env!("CARGO_MANIFEST_DIR"))
                    .join("resources")
                    .join(CLIENT_SECRETS_FILE),
            ),
            user_key: DEFAULT_USER_KEY.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            redirect_port: None,
            open_browser: true,
            metadata_probe_timeout: Some(DEFAULT_METADATA_PROBE_TIMEOUT),
        }
    }
}

impl FactoryConfig {
    /// Defaults overridden by `DV360_APPLICATION_NAME`, `DV360_DATA_STORE_DIR`
    /// and `DV360_CLIENT_SECRETS` when they are set
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(name) = lookup(ENV_APPLICATION_NAME) {
            self.application_name = name;
        }
        if let Some(dir) = lookup(ENV_DATA_STORE_DIR).filter(|s| !s.trim().is_empty()) {
            self.data_store_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup(ENV_CLIENT_SECRETS).filter(|s| !s.trim().is_empty()) {
            self.bundled_secrets_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn with_scopes<S: Into<String>>(mut self, scopes: impl IntoIterator<Item = S>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn with_data_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_store_dir = dir.into();
        self
    }

    pub fn with_bundled_secrets_path(mut self, path: Option<PathBuf>) -> Self {
        self.bundled_secrets_path = path;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_redirect_port(mut self, port: Option<u16>) -> Self {
        self.redirect_port = port;
        self
    }

    pub fn with_open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    pub fn with_metadata_probe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.metadata_probe_timeout = timeout;
        self
    }

    /// Application name sent with every request, see [`application_name`]
    pub fn effective_application_name(&self) -> String {
        application_name(&self.application_name, &self.application_name_suffix)
    }
}

/// Appends `suffix` to `base` unless `base` is blank, in which case `base` is returned as is
pub fn application_name(base: &str, suffix: &str) -> String {
    if base.trim().is_empty() {
        base.to_string()
    } else {
        format!("{base}{suffix}")
    }
}

/// `~/.store/dv360_sample`
fn default_data_store_dir() -> PathBuf {
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".store")
        .join("dv360_sample")
}
