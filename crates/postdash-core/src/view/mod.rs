//! View-state orchestration.
//!
//! Each view owns one or more [`QueryObserver`]s and turns user actions
//! (paging, typing, switching period) into cache keys. Views expose
//! `changed()` to await the next state change and `settle()` to run until
//! nothing is pending.

mod debounce;
mod detail;
mod listing;
mod observer;
mod pagination;
mod server_list;

pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use detail::ServerDetailView;
pub use listing::{
    BouncedDomains, BouncedEmails, DomainListingView, EmailListingView, ListingKind, ListingView,
};
pub use observer::{BoxFuture, Loader, QueryObserver, ViewState, loader};
pub use pagination::{FULL_RANGE_LIMIT, PageItem, Pager, page_range};
pub use server_list::ServerListView;
