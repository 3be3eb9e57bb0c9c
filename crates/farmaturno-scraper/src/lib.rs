//! Upstream access and the collection pipeline for on-duty pharmacies.

pub mod collector;
pub mod error;
pub mod form;
pub mod normalize;
mod rate_limit;
pub mod session;
pub mod types;

pub use collector::{
    CollectError, CollectionSummary, Collector, CollectorSettings, Harvest,
};
pub use error::ScraperError;
pub use form::{RunStamp, UpstreamForm};
pub use normalize::normalize_schedule;
pub use session::{
    AnySession, Connector, SessionFactory, UpstreamSession, UpstreamSettings,
};
