//! Paginated, searchable bounce listings.

use std::marker::PhantomData;

use postdash_api::{BouncedDomain, BouncedEmail, ListQuery, Page, ReportingPeriod, ServerId};
use tokio::sync::watch;
use tracing::debug;

use super::debounce::Debouncer;
use super::observer::{Loader, QueryObserver, ViewState, loader};
use super::pagination::{PageItem, Pager, page_range};
use crate::query::{Queries, QueryKey};

/// A listing endpoint a [`ListingView`] can page through.
pub trait ListingKind: Send + Sync + 'static {
    /// Row type.
    type Item: Send + Sync + 'static;

    /// Cache key for one page.
    fn key(id: &ServerId, period: ReportingPeriod, query: &ListQuery) -> QueryKey;

    /// Loader for one page.
    fn loader(
        queries: &Queries,
        id: &ServerId,
        period: ReportingPeriod,
        query: &ListQuery,
    ) -> Loader<Page<Self::Item>>;
}

/// Bounced domains, with their share of all bounces.
#[derive(Debug)]
pub struct BouncedDomains;

impl ListingKind for BouncedDomains {
    type Item = BouncedDomain;

    fn key(id: &ServerId, period: ReportingPeriod, query: &ListQuery) -> QueryKey {
        QueryKey::bounced_domains(id, period, query)
    }

    fn loader(
        queries: &Queries,
        id: &ServerId,
        period: ReportingPeriod,
        query: &ListQuery,
    ) -> Loader<Page<BouncedDomain>> {
        let (queries, id, query) = (queries.clone(), id.clone(), query.clone());
        loader(move || {
            let (queries, id, query) = (queries.clone(), id.clone(), query.clone());
            async move { queries.bounced_domains(&id, period, &query).await }
        })
    }
}

/// Bounced addresses.
#[derive(Debug)]
pub struct BouncedEmails;

impl ListingKind for BouncedEmails {
    type Item = BouncedEmail;

    fn key(id: &ServerId, period: ReportingPeriod, query: &ListQuery) -> QueryKey {
        QueryKey::bounced_emails(id, period, query)
    }

    fn loader(
        queries: &Queries,
        id: &ServerId,
        period: ReportingPeriod,
        query: &ListQuery,
    ) -> Loader<Page<BouncedEmail>> {
        let (queries, id, query) = (queries.clone(), id.clone(), query.clone());
        loader(move || {
            let (queries, id, query) = (queries.clone(), id.clone(), query.clone());
            async move { queries.bounced_emails(&id, period, &query).await }
        })
    }
}

/// Page number, debounced search and active period composed into one
/// listing request.
///
/// The raw search input never reaches the cache key; only the term committed
/// by the debouncer does, and committing a new term returns to page 1. The
/// previous page stays visible while the next one loads.
#[derive(Debug)]
pub struct ListingView<K: ListingKind> {
    queries: Queries,
    server_id: ServerId,
    period: watch::Receiver<ReportingPeriod>,
    period_open: bool,
    pager: Pager,
    search_input: String,
    search: String,
    debouncer: Debouncer<String>,
    observer: QueryObserver<Page<K::Item>>,
    kind: PhantomData<K>,
}

/// Bounced domain listing.
pub type DomainListingView = ListingView<BouncedDomains>;

/// Bounced address listing.
pub type EmailListingView = ListingView<BouncedEmails>;

impl<K: ListingKind> ListingView<K> {
    /// Creates the view and requests page 1.
    #[must_use]
    pub fn new(queries: Queries, server_id: ServerId, period: watch::Receiver<ReportingPeriod>) -> Self {
        Self::starting_at(queries, server_id, period, 1, String::new())
    }

    /// Creates the view with `search` already committed and requests `page`.
    #[must_use]
    pub fn starting_at(
        queries: Queries,
        server_id: ServerId,
        period: watch::Receiver<ReportingPeriod>,
        page: u32,
        search: impl Into<String>,
    ) -> Self {
        let search = search.into();
        let observer = QueryObserver::new(queries.cache().clone()).keep_previous_data();
        let mut pager = Pager::new();
        pager.go_to(page);
        let mut view = Self {
            queries,
            server_id,
            period,
            period_open: true,
            pager,
            search_input: search.clone(),
            search,
            debouncer: Debouncer::default(),
            observer,
            kind: PhantomData,
        };
        view.refresh();
        view
    }

    /// Server being listed.
    #[must_use]
    pub const fn server_id(&self) -> &ServerId {
        &self.server_id
    }

    /// Period the current request is scoped to.
    #[must_use]
    pub fn period(&self) -> ReportingPeriod {
        *self.period.borrow()
    }

    /// Text typed so far.
    #[must_use]
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// Committed search term.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Pagination state.
    #[must_use]
    pub const fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Data, loading flag and error.
    #[must_use]
    pub const fn state(&self) -> &ViewState<Page<K::Item>> {
        self.observer.state()
    }

    /// Parameters of the current request.
    #[must_use]
    pub fn query(&self) -> ListQuery {
        ListQuery::new()
            .with_page(self.pager.page())
            .with_search(self.search.clone())
    }

    /// Cache key of the current request.
    #[must_use]
    pub fn key(&self) -> QueryKey {
        K::key(&self.server_id, self.period(), &self.query())
    }

    /// Page buttons to render.
    #[must_use]
    pub fn page_range(&self) -> Vec<PageItem> {
        page_range(self.pager.page(), self.pager.total_pages().unwrap_or(0))
    }

    /// Records a keystroke. The term is committed after the input has been
    /// quiet for the debounce period.
    pub fn set_search_input(&mut self, input: impl Into<String>) {
        self.search_input = input.into();
        self.debouncer.schedule(self.search_input.clone());
    }

    /// Moves to the next page if there is one.
    pub fn next_page(&mut self) -> bool {
        let moved = self.pager.next();
        if moved {
            self.refresh();
        }
        moved
    }

    /// Moves to the previous page if there is one.
    pub fn prev_page(&mut self) -> bool {
        let moved = self.pager.prev();
        if moved {
            self.refresh();
        }
        moved
    }

    /// Jumps to `page` if it is in range.
    pub fn go_to_page(&mut self, page: u32) -> bool {
        let moved = self.pager.go_to(page);
        if moved {
            self.refresh();
        }
        moved
    }

    /// Waits until something the view renders changes: a committed search
    /// term, a new period, or a response.
    pub async fn changed(&mut self) {
        loop {
            tokio::select! {
                Some(term) = self.debouncer.committed() => {
                    if term != self.search {
                        debug!(search = %term, "Search committed");
                        self.search = term;
                        self.pager.reset();
                        self.refresh();
                        return;
                    }
                }
                changed = self.period.changed(), if self.period_open => {
                    if changed.is_ok() {
                        self.refresh();
                        return;
                    }
                    self.period_open = false;
                }
                () = self.observer.changed() => {
                    self.sync_pager();
                    return;
                }
            }
        }
    }

    /// Processes changes until no search is pending and the current request
    /// has finished.
    pub async fn settle(&mut self) {
        while self.debouncer.is_pending() || self.observer.state().loading {
            self.changed().await;
        }
    }

    fn sync_pager(&mut self) {
        let state = self.observer.state();
        if state.placeholder {
            return;
        }
        let Some(total_pages) = state.data.as_ref().map(|page| page.total_pages) else {
            return;
        };
        if self.pager.set_total_pages(total_pages) {
            debug!(page = self.pager.page(), "Page out of range, moving back");
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        let period = *self.period.borrow_and_update();
        let query = self.query();
        let key = K::key(&self.server_id, period, &query);
        let loader = K::loader(&self.queries, &self.server_id, period, &query);
        self.observer.observe(key, loader);
    }
}
