//! Composition root wiring the gateway, cache and stores together.

use std::path::PathBuf;
use std::sync::Arc;

use postdash_api::{ApiClient, ConnectionTestResult, Identity, ServerConnection, ServerId};
use tracing::debug;

use crate::config::{Config, preferences_path};
use crate::error::{Error, Result};
use crate::period::{FilePeriodStorage, PeriodStorage, PeriodStore};
use crate::query::{Queries, QueryCache};
use crate::session::{AuthError, KeyringTokenStorage, SessionState, SessionStore, TokenStorage};
use crate::validation::{LoginForm, ServerForm};
use crate::view::{DomainListingView, EmailListingView, ServerDetailView, ServerListView};

/// One operator's dashboard: configuration, cached queries, session and
/// reporting period.
#[derive(Debug, Clone)]
pub struct Dashboard {
    config: Config,
    queries: Queries,
    session: SessionStore,
    period: PeriodStore,
}

impl Dashboard {
    /// Builds a dashboard on the given storage backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured API URL is invalid.
    pub fn new(
        config: Config,
        token_storage: Arc<dyn TokenStorage>,
        period_storage: Arc<dyn PeriodStorage>,
    ) -> Result<Self> {
        let api = ApiClient::new(&config.api_base_url)?;
        let queries = Queries::new(api, QueryCache::new(config.cache_config()));
        let session = SessionStore::new(queries.clone(), token_storage);
        let queries = queries.with_error_hook({
            let session = session.clone();
            Arc::new(move |e: &postdash_api::Error| {
                session.handle_error(e);
            })
        });
        let period = PeriodStore::new(period_storage);
        debug!(api = %config.api_base_url, "Dashboard ready");
        Ok(Self {
            config,
            queries,
            session,
            period,
        })
    }

    /// Builds a dashboard storing the token in the system keyring and the
    /// period in the preferences file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured API URL is invalid.
    pub fn from_config(config: Config) -> Result<Self> {
        Self::new(
            config,
            Arc::new(KeyringTokenStorage::new()),
            Arc::new(FilePeriodStorage::new(preferences_path())),
        )
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Cached reads and mutations. A rejected session on any of them signs
    /// out.
    #[must_use]
    pub const fn queries(&self) -> &Queries {
        &self.queries
    }

    /// Session store.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Reporting-period store.
    #[must_use]
    pub const fn period(&self) -> &PeriodStore {
        &self.period
    }

    /// Validates the form, then signs in.
    ///
    /// # Errors
    ///
    /// Returns a validation error without contacting the backend, or the
    /// sign-in failure.
    pub async fn login(&self, form: &LoginForm) -> Result<Identity> {
        form.validate()?;
        Ok(self.session.login(form.email.trim(), &form.password).await?)
    }

    /// Restores a stored session and confirms it with the backend.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`] when no usable token is stored, or
    /// the confirmation failure (which also signs out).
    pub async fn resume(&self) -> Result<Identity> {
        if self.session.restore() == SessionState::Anonymous {
            return Err(AuthError::NotSignedIn.into());
        }
        Ok(self.session.confirm().await?)
    }

    /// Sidebar server list.
    #[must_use]
    pub fn server_list_view(&self) -> ServerListView {
        ServerListView::new(&self.queries)
    }

    /// Detail page for one server, following the reporting period.
    #[must_use]
    pub fn server_detail_view(&self, id: ServerId) -> ServerDetailView {
        ServerDetailView::new(self.queries.clone(), id, self.period.subscribe())
    }

    /// Bounced-domain listing for one server.
    #[must_use]
    pub fn domain_listing(&self, id: ServerId, page: u32, search: &str) -> DomainListingView {
        DomainListingView::starting_at(self.queries.clone(), id, self.period.subscribe(), page, search)
    }

    /// Bounced-address listing for one server.
    #[must_use]
    pub fn email_listing(&self, id: ServerId, page: u32, search: &str) -> EmailListingView {
        EmailListingView::starting_at(self.queries.clone(), id, self.period.subscribe(), page, search)
    }

    /// Validates the form, then creates the server.
    ///
    /// # Errors
    ///
    /// Returns a validation error without contacting the backend, or the
    /// API failure.
    pub async fn add_server(&self, form: &ServerForm) -> Result<ServerConnection> {
        let draft = form.to_draft()?;
        Ok(self.queries.create_server(&draft).await?)
    }

    /// Validates the form, then updates the server.
    ///
    /// # Errors
    ///
    /// Returns a validation error without contacting the backend, or the
    /// API failure.
    pub async fn edit_server(&self, id: &ServerId, form: &ServerForm) -> Result<ServerConnection> {
        let patch = form.to_patch()?;
        Ok(self.queries.update_server(id, &patch).await?)
    }

    /// Deletes a server.
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn delete_server(&self, id: &ServerId) -> Result<()> {
        Ok(self.queries.delete_server(id).await?)
    }

    /// Flips a server between active and inactive.
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn toggle_server(&self, id: &ServerId) -> Result<ServerConnection> {
        Ok(self.queries.toggle_server_status(id).await?)
    }

    /// Checks whether the backend can reach the server's database.
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn test_connection(&self, id: &ServerId) -> Result<ConnectionTestResult> {
        Ok(self.queries.test_connection(id).await?)
    }

    /// Exports bounced addresses for the current period into the export
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns the API failure (nothing is written) or an I/O error.
    pub async fn export_bounced_emails(&self, id: &ServerId) -> Result<PathBuf> {
        crate::export::export_bounced_emails(
            self.queries.api(),
            id,
            self.period.period(),
            &self.config.export_dir(),
        )
        .await
    }

    /// Signs out if `err` means the backend no longer accepts the session.
    ///
    /// Returns true if the session was ended.
    pub fn handle_error(&self, err: &Error) -> bool {
        match err {
            Error::Api(e) => self.session.handle_error(e),
            Error::Query(e) | Error::Auth(AuthError::Api(e) | AuthError::Network(e)) => {
                self.session.handle_error(e)
            }
            _ => false,
        }
    }
}
