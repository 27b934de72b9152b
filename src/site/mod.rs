//! Site adapters
//!
//! Stages never look at HTML themselves. A frontier stage hands each fetched
//! page to a [`PageToLinks`]; a scrape stage hands it to a [`PageToRecords`].
//! Selector details live in the adapter for one concrete site.

mod links;
pub mod olympedia;

pub use links::resolve_link;
pub use olympedia::{
    AthleteLinks, AthleteRecords, CountryLinks, EventLinks, HostCityRecords, NocRecords, Olympedia,
};

/// Child-link selection rule of one frontier stage
pub trait PageToLinks: Send + Sync {
    /// Absolute URLs the stage should follow from this page
    fn extract_links(&self, page_url: &str, html: &str) -> Vec<String>;
}

/// Record extraction rule of one scrape stage
///
/// A page with an unexpected structure yields an empty list, never an error.
pub trait PageToRecords<R>: Send + Sync {
    fn extract_records(&self, page_url: &str, html: &str) -> Vec<R>;
}
