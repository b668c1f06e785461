//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::CatalogCache;
use crate::config::AppConfig;
use crate::services::email::{Mailer, SmtpNotifier};
use crate::services::payments::{PaymentError, PaymentGateway, TinkoffClient};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to the configuration, the
/// catalog cache, and the external collaborators.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    catalog: CatalogCache,
    gateway: Option<Arc<dyn PaymentGateway>>,
    mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Create production state from configuration.
    ///
    /// Unconfigured sections disable only their own endpoint: a missing
    /// gateway section leaves `gateway()` empty, a missing email section
    /// makes the notifier a logged no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway HTTP client fails to build.
    pub fn new(config: AppConfig) -> Result<Self, PaymentError> {
        let gateway = match config.payments.as_ref() {
            Some(payments) => {
                Some(Arc::new(TinkoffClient::new(payments)?) as Arc<dyn PaymentGateway>)
            }
            None => None,
        };
        let mailer: Arc<dyn Mailer> = Arc::new(SmtpNotifier::new(config.email.clone()));

        Ok(Self::with_parts(config, CatalogCache::new(), gateway, mailer))
    }

    /// Assemble state from explicit parts (tests use fakes here).
    #[must_use]
    pub fn with_parts(
        config: AppConfig,
        catalog: CatalogCache,
        gateway: Option<Arc<dyn PaymentGateway>>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                gateway,
                mailer,
            }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Get the payment gateway, if configured.
    #[must_use]
    pub fn gateway(&self) -> Option<&Arc<dyn PaymentGateway>> {
        self.inner.gateway.as_ref()
    }

    /// Get a reference to the notification mailer.
    #[must_use]
    pub fn mailer(&self) -> &Arc<dyn Mailer> {
        &self.inner.mailer
    }
}
