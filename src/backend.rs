//! Backend trait for the daemon's configuration API

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Result;
use crate::snapshot::ConfigSnapshot;
use crate::types::{BatchResponse, ParamValue, Scope};

/// The three remote operations the apply engine depends on.
///
/// Backends abstract over how the daemon is reached (HTTP in production,
/// scripted fakes in tests). Every method is a single request; retries and
/// ordering are the caller's concern.
#[async_trait::async_trait]
pub trait ConfigBackend: Send + Sync + 'static {
    /// Fetch the full configuration document for every scope.
    ///
    /// The returned snapshot carries a fresh CSRF token when the daemon
    /// issues one.
    async fn fetch_config(&self) -> Result<ConfigSnapshot>;

    /// Submit a batch of changes to one scope.
    ///
    /// Returns:
    /// - `Ok(response)` - The daemon processed the batch; individual
    ///   parameters may still have been rejected
    /// - `Err(e)` - The request itself failed; nothing is assumed applied
    async fn submit_batch(
        &self,
        scope: Scope,
        changes: &BTreeMap<String, ParamValue>,
    ) -> Result<BatchResponse>;

    /// Persist the scope's configuration and restart it so that
    /// restart-required changes take effect.
    async fn apply_restart(&self, scope: Scope) -> Result<()>;
}

#[async_trait::async_trait]
impl<B: ConfigBackend + ?Sized> ConfigBackend for Arc<B> {
    async fn fetch_config(&self) -> Result<ConfigSnapshot> {
        (**self).fetch_config().await
    }

    async fn submit_batch(
        &self,
        scope: Scope,
        changes: &BTreeMap<String, ParamValue>,
    ) -> Result<BatchResponse> {
        (**self).submit_batch(scope, changes).await
    }

    async fn apply_restart(&self, scope: Scope) -> Result<()> {
        (**self).apply_restart(scope).await
    }
}
