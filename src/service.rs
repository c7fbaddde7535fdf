use std::time::Duration;

use hyper::body::Bytes;
use hyper::client::connect::Connect;
use hyper::client::HttpConnector;
use hyper::header::{HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use hyper::{Body, Client, Method, Request, Response};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::initializer::{HttpRequest, RequestInitializer, Timeouts};

const LIBRARY_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub type HttpsClient = Client<HttpsConnector<HttpConnector>>;

/// HTTPS-only hyper client whose connector gives up connecting after `connect_timeout`
pub fn https_client(connect_timeout: Duration) -> HttpsClient {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));

    let https = HttpsConnectorBuilder::new()
        .with_native_roots()
        .https_only()
        .enable_http1()
        .wrap_connector(http);
    Client::builder().build(https)
}

/// Authenticated handle for the Display & Video 360 REST API.
///
/// Every request goes through the handle's [`RequestInitializer`] before it is
/// sent; the read timeout it records bounds the wait for the response and its body.
/// The connect timeout belongs to the client's connector, see [`https_client`].
pub struct DisplayVideoService<C = HttpsConnector<HttpConnector>> {
    client: Client<C>,
    initializer: Box<dyn RequestInitializer>,
    application_name: String,
    user_agent: HeaderValue,
    base_url: String,
}

impl<C> DisplayVideoService<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub fn new(
        client: Client<C>,
        initializer: impl RequestInitializer + 'static,
        application_name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let application_name = application_name.into();
        Self {
            client,
            initializer: Box::new(initializer),
            user_agent: user_agent(&application_name),
            application_name,
            base_url: base_url.into(),
        }
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `path` resolved against the base URL
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Initializes and sends `request`, returning the response with its body read
    pub async fn execute(&self, mut request: HttpRequest) -> Result<Response<Bytes>> {
        request
            .headers_mut()
            .insert(USER_AGENT, self.user_agent.clone());
        self.initializer.initialize(&mut request).await?;

        let timeouts = Timeouts::of(&request);
        debug!(method = %request.method(), uri = %request.uri(), "sending request");

        let exchange = async {
            let response = self.client.request(request).await?;
            let (parts, body) = response.into_parts();
            let body = hyper::body::to_bytes(body).await?;
            Ok::<_, Error>(Response::from_parts(parts, body))
        };

        let response = match timeouts.read {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| Error::Timeout(limit))??,
            None => exchange.await?,
        };
        debug!(status = %response.status(), "received response");
        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call_json(Method::GET, path, None).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)?;
        self.call_json(Method::POST, path, Some(body)).await
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T> {
        let builder = Request::builder()
            .method(method)
            .uri(self.url(path))
            .header(ACCEPT, "application/json");
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.execute(request).await?;
        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status(),
                body: String::from_utf8_lossy(response.body()).into_owned(),
            });
        }
        Ok(serde_json::from_slice(response.body())?)
    }
}

/// `"<application name> dv360-auth/<version>"`, or just the library part when the
/// name is blank
fn user_agent(application_name: &str) -> HeaderValue {
    let name = application_name.trim();
    if name.is_empty() {
        return HeaderValue::from_static(LIBRARY_AGENT);
    }
    HeaderValue::from_str(&format!("{name} {LIBRARY_AGENT}")).unwrap_or_else(|_| {
        warn!(
            application_name,
            "application name is not a valid header value, leaving it out"
        );
        HeaderValue::from_static(LIBRARY_AGENT)
    })
}
