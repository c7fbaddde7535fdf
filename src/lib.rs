//! OAuth2 authorization and service creation for the Display & Video 360 API samples.
//!
//! [`DisplayVideoFactory::get_instance`] resolves credentials in this order:
//! 1. application default credentials (see [`adc`])
//! 2. the installed application flow, using the client secrets file passed in,
//! the bundled `resources/client_secrets.json` or a path entered on the console.
//! The resulting token is stored under `~/.store/dv360_sample`
//!
//! Every request sent through the returned [`DisplayVideoService`] carries the
//! credential and 3 minute connect and read timeouts.
//!
//! Example usage:
//! ```no_run
//! use dv360_auth::{DisplayVideoFactory, FactoryConfig};
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dv360_auth::Error> {
//!     let config = FactoryConfig::from_env().with_application_name("MyCompany-Planner/1.0");
//!     let service = DisplayVideoFactory::new(config).get_instance(None).await?;
//!
//!     let advertisers: Value = service.get_json("advertisers?partnerId=1").await?;
//!     println!("{advertisers}");
//!     Ok(())
//! }
//! ```
pub mod adc;
pub mod config;
pub mod credential;
pub mod error;
pub mod factory;
pub mod initializer;
pub mod installed;
pub mod prompt;
pub mod provider;
pub mod service;
pub mod store;

pub use config::FactoryConfig;
pub use credential::{Credential, CredentialOrigin, TokenSource};
pub use error::{Error, Result};
pub use factory::DisplayVideoFactory;
pub use initializer::{RequestInitializer, TimeoutInitializer, Timeouts};
pub use provider::{CredentialProvider, CredentialResolver};
pub use service::DisplayVideoService;
