//! `collect`: one collection run from the command line.

use std::fmt::Write as _;
use std::time::Duration;

use farmaturno_core::AppConfig;
use farmaturno_scraper::{CollectionSummary, Collector, CollectorSettings, Connector};
use farmaturno_store::DatasetStore;

/// Run the full pipeline once. With `dry_run` the harvest is summarized and
/// the persisted dataset is left untouched.
///
/// # Errors
///
/// Returns an error if the upstream session cannot be opened or, outside a
/// dry run, if the dataset cannot be committed.
pub(crate) async fn run_collect(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let store = DatasetStore::from_app_config(config);
    let collector = Collector::new(
        Connector::from_app_config(config),
        store.clone(),
        CollectorSettings::from_app_config(config),
    );

    if dry_run {
        let harvest = collector.harvest().await?;
        println!("dry-run: {}", summary_line(&harvest.summary));
        println!("dry-run: {} was not modified", store.path().display());
        return Ok(());
    }

    let summary = collector.run_collection().await?;
    println!("{}", summary_line(&summary));
    println!("dataset written to {}", store.path().display());
    Ok(())
}

fn summary_line(summary: &CollectionSummary) -> String {
    let mut line = format!(
        "{} pharmacies from {} stubs across {} regions in {:.1}s",
        summary.pharmacies,
        summary.stubs,
        summary.regions_ok,
        Duration::from_millis(summary.elapsed_ms).as_secs_f64(),
    );
    if summary.dropped > 0 {
        let _ = write!(line, ", {} dropped", summary.dropped);
    }
    if summary.regions_failed > 0 {
        let _ = write!(line, ", {} regions skipped", summary.regions_failed);
    }
    line
}
