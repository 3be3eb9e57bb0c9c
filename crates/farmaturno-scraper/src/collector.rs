//! The two-phase collection pipeline.
//!
//! One run opens a fresh upstream session, walks every region for on-duty
//! stubs, fans out bounded detail requests, merges each stub with its detail
//! and finally commits the whole dataset in one atomic replace. Region and
//! detail failures are absorbed and counted. A run aborts when the session
//! cannot be opened, when no region query got a usable answer, or when the
//! commit fails.

use std::time::Instant;

use chrono_tz::Tz;
use farmaturno_core::{AppConfig, Dataset, Pharmacy, PharmacyStub, RegionCode};
use farmaturno_store::{DatasetStore, StoreError};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::error::ScraperError;
use crate::form::{RunStamp, UpstreamForm};
use crate::session::{SessionFactory, UpstreamSession};
use crate::types::{parse_detail, parse_region_stubs};

/// Errors that abort a collection run. The previous dataset stays in place.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("upstream session failed: {0}")]
    Session(#[source] ScraperError),

    /// Every region query failed.
    #[error("upstream answered none of the {regions} region queries")]
    NoRegions { regions: usize },

    #[error("commit failed: {0}")]
    Commit(#[from] StoreError),
}

/// Tunables for a [`Collector`].
#[derive(Debug, Clone, Copy)]
pub struct CollectorSettings {
    /// Upper bound on concurrent detail requests. Zero is treated as one.
    pub max_in_flight: usize,
    /// Zone in which the date and time-of-day sent upstream are computed.
    pub timezone: Tz,
}

impl CollectorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_in_flight: config.max_in_flight,
            timezone: config.timezone,
        }
    }
}

/// Counters for one run, logged at the end and returned to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub regions_ok: usize,
    pub regions_failed: usize,
    pub stubs: usize,
    pub pharmacies: usize,
    pub dropped: usize,
    pub elapsed_ms: u64,
}

/// Merged pharmacies of one run, not yet committed.
#[derive(Debug, Clone)]
pub struct Harvest {
    pub pharmacies: Vec<Pharmacy>,
    pub summary: CollectionSummary,
}

pub struct Collector<F> {
    factory: F,
    store: DatasetStore,
    settings: CollectorSettings,
    run_lock: Mutex<()>,
}

impl<F: SessionFactory> Collector<F> {
    #[must_use]
    pub fn new(factory: F, store: DatasetStore, settings: CollectorSettings) -> Self {
        Self {
            factory,
            store,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Run the discovery and detail phases without committing anything.
    ///
    /// The session is closed on every path once it has been opened.
    ///
    /// # Errors
    ///
    /// - [`CollectError::Session`] if the upstream session cannot be opened.
    /// - [`CollectError::NoRegions`] if no region query succeeded.
    pub async fn harvest(&self) -> Result<Harvest, CollectError> {
        let started = Instant::now();
        let session = self.factory.open().await.map_err(CollectError::Session)?;
        let stamp = RunStamp::now(self.settings.timezone);

        tracing::info!(fecha = %stamp.date, hora = %stamp.time, "collection run started");

        let discovery = discover(&session, &stamp).await;
        let stubs = discovery.stubs.len();
        tracing::info!(
            stubs,
            regions_ok = discovery.regions_ok,
            regions_failed = discovery.regions_failed,
            "discovery phase finished"
        );

        if discovery.regions_ok == 0 {
            session.close().await;
            return Err(CollectError::NoRegions {
                regions: discovery.regions_failed,
            });
        }

        let details =
            fetch_details(&session, discovery.stubs, &stamp, self.settings.max_in_flight).await;
        session.close().await;

        let pharmacies = details.len();
        let dropped = stubs - pharmacies;
        tracing::info!(pharmacies, dropped, "detail phase finished");

        Ok(Harvest {
            pharmacies: details,
            summary: CollectionSummary {
                regions_ok: discovery.regions_ok,
                regions_failed: discovery.regions_failed,
                stubs,
                pharmacies,
                dropped,
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            },
        })
    }

    /// Harvest and atomically replace the persisted dataset.
    ///
    /// # Errors
    ///
    /// - [`CollectError::Session`] if the upstream session cannot be opened.
    /// - [`CollectError::NoRegions`] if no region query succeeded.
    /// - [`CollectError::Commit`] if the dataset cannot be written.
    pub async fn run_collection(&self) -> Result<CollectionSummary, CollectError> {
        let harvest = match self.harvest().await {
            Ok(harvest) => harvest,
            Err(err) => {
                tracing::error!(error = %err, "collection run aborted; previous dataset kept");
                return Err(err);
            }
        };

        let dataset = Dataset::now(harvest.pharmacies);
        if let Err(err) = self.store.replace(&dataset).await {
            tracing::error!(
                error = %err,
                path = %self.store.path().display(),
                "dataset commit failed; previous dataset kept"
            );
            return Err(err.into());
        }

        let summary = harvest.summary;
        tracing::info!(
            path = %self.store.path().display(),
            pharmacies = summary.pharmacies,
            dropped = summary.dropped,
            regions_failed = summary.regions_failed,
            elapsed_ms = summary.elapsed_ms,
            "collection run committed"
        );
        Ok(summary)
    }

    /// Like [`Collector::run_collection`], but returns `None` without doing
    /// anything when another run is still active.
    pub async fn run_exclusive(&self) -> Option<Result<CollectionSummary, CollectError>> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            tracing::warn!("collection run still active; skipping trigger");
            return None;
        };
        Some(self.run_collection().await)
    }
}

struct Discovery {
    stubs: Vec<PharmacyStub>,
    regions_ok: usize,
    regions_failed: usize,
}

/// Query every region in ascending order, concatenating stubs.
async fn discover<S: UpstreamSession>(session: &S, stamp: &RunStamp) -> Discovery {
    let mut discovery = Discovery {
        stubs: Vec::new(),
        regions_ok: 0,
        regions_failed: 0,
    };

    for region in RegionCode::all() {
        let form = UpstreamForm::discovery(region, stamp);
        let context = form.describe();
        let result = session
            .post_form(&form)
            .await
            .and_then(|body| parse_region_stubs(body, &context));

        match result {
            Ok(stubs) => {
                tracing::debug!(
                    region = region.get(),
                    name = region.name(),
                    stubs = stubs.len(),
                    "region discovered"
                );
                discovery.regions_ok += 1;
                discovery.stubs.extend(stubs);
            }
            Err(err) => {
                tracing::warn!(
                    region = region.get(),
                    name = region.name(),
                    error = %err,
                    "region skipped"
                );
                discovery.regions_failed += 1;
            }
        }
    }

    discovery
}

/// Fetch and merge every stub's detail with at most `max_in_flight`
/// requests outstanding. Output keeps stub order; failed stubs are dropped.
async fn fetch_details<S: UpstreamSession>(
    session: &S,
    stubs: Vec<PharmacyStub>,
    stamp: &RunStamp,
    max_in_flight: usize,
) -> Vec<Pharmacy> {
    stream::iter(stubs)
        .map(|stub| async move {
            let form = UpstreamForm::detail(&stub, stamp);
            let context = form.describe();
            let detail = session
                .post_form(&form)
                .await
                .and_then(|body| parse_detail(body, &context));
            match detail {
                Ok(detail) => Some(Pharmacy::merge(stub, detail.local, detail.schedule)),
                Err(err) => {
                    tracing::debug!(pharmacy = %context, error = %err, "pharmacy dropped");
                    None
                }
            }
        })
        .buffered(max_in_flight.max(1))
        .filter_map(std::future::ready)
        .collect()
        .await
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
