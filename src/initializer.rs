//! Request initializers run on every outgoing API request before it is sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hyper::{Body, Request};

use crate::error::Result;

pub type HttpRequest = Request<Body>;

/// Connect and read timeouts carried in a request's extensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// Recorded for inspection only. hyper 0.14 connects inside the client's
    /// connector, so the connect limit that applies is the one given to
    /// [`https_client`](crate::service::https_client).
    pub connect: Option<Duration>,
    /// Bounds the wait for the response and its body
    pub read: Option<Duration>,
}

impl Timeouts {
    /// Timeouts recorded on `request`, empty if none were set
    pub fn of(request: &HttpRequest) -> Self {
        request.extensions().get::<Timeouts>().copied().unwrap_or_default()
    }

    pub fn apply(self, request: &mut HttpRequest) {
        request.extensions_mut().insert(self);
    }
}

/// Prepares a request, e.g. by attaching credentials
#[async_trait]
pub trait RequestInitializer: Send + Sync {
    async fn initialize(&self, request: &mut HttpRequest) -> Result<()>;
}

#[async_trait]
impl<T: RequestInitializer + ?Sized> RequestInitializer for Arc<T> {
    async fn initialize(&self, request: &mut HttpRequest) -> Result<()> {
        (**self).initialize(request).await
    }
}

#[async_trait]
impl<T: RequestInitializer + ?Sized> RequestInitializer for Box<T> {
    async fn initialize(&self, request: &mut HttpRequest) -> Result<()> {
        (**self).initialize(request).await
    }
}

/// Runs the wrapped initializer, then forces fixed connect and read timeouts
/// on the request regardless of what the wrapped initializer set.
pub struct TimeoutInitializer<I> {
    inner: I,
    timeouts: Timeouts,
}

impl<I: RequestInitializer> TimeoutInitializer<I> {
    pub fn wrap(inner: I, connect: Duration, read: Duration) -> Self {
        Self {
            inner,
            timeouts: Timeouts {
                connect: Some(connect),
                read: Some(read),
            },
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }
}

#[async_trait]
impl<I: RequestInitializer> RequestInitializer for TimeoutInitializer<I> {
    async fn initialize(&self, request: &mut HttpRequest) -> Result<()> {
        self.inner.initialize(request).await?;
        self.timeouts.apply(request);
        Ok(())
    }
}
