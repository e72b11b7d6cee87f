//! The seam between the route registry and whatever delivers requests.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use http::Method;
use tessera_core::{ConfigurationError, Request, Response};

/// A fully wrapped route callable.
///
/// It binds, runs the handler, normalizes the reply and tears down scoped
/// dependencies. It never fails: every error is already a [`Response`].
pub type CompiledHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Receives compiled routes from an [`App`](crate::App).
///
/// A transport owns path matching and must fill in the request's path
/// parameters before calling the handler. It delivers the response and
/// only then runs its [`PostSend`](tessera_core::PostSend) callback.
pub trait Transport {
    /// Registers a handler for `method` and `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the path is not a valid template
    /// or the route is already registered.
    fn register(
        &mut self,
        path: &str,
        method: Method,
        handler: CompiledHandler,
    ) -> Result<(), ConfigurationError>;
}
