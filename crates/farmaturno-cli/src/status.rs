//! `status`: what the publisher is currently serving.

use std::collections::BTreeMap;

use farmaturno_core::{AppConfig, Dataset, SCHEDULE_NOT_SPECIFIED};
use farmaturno_store::DatasetStore;

const COMUNA_KEY: &str = "cm_nombre";
const TOP_COMUNAS: usize = 5;

/// Print a short report on the persisted dataset.
///
/// # Errors
///
/// Returns an error if the dataset file exists but cannot be read or parsed.
pub(crate) async fn run_status(config: &AppConfig) -> anyhow::Result<()> {
    let store = DatasetStore::from_app_config(config);
    match store.load().await? {
        None => println!(
            "no dataset committed yet at {}; the API answers 503 until the first run",
            store.path().display()
        ),
        Some(dataset) => {
            println!("dataset: {}", store.path().display());
            for line in status_lines(&dataset, config.timezone) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn status_lines(dataset: &Dataset, tz: chrono_tz::Tz) -> Vec<String> {
    let generated_local = dataset.generated_at.with_timezone(&tz);
    let total = dataset.pharmacies.len();
    let unspecified = dataset
        .pharmacies
        .iter()
        .filter(|p| p.schedule() == Some(SCHEDULE_NOT_SPECIFIED))
        .count();

    let mut per_comuna: BTreeMap<&str, usize> = BTreeMap::new();
    for pharmacy in &dataset.pharmacies {
        let comuna = pharmacy
            .get(COMUNA_KEY)
            .and_then(serde_json::Value::as_str)
            .unwrap_or("(sin comuna)");
        *per_comuna.entry(comuna).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = per_comuna.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut lines = vec![
        format!(
            "generated at: {} ({})",
            generated_local.format("%Y-%m-%d %H:%M:%S %Z"),
            dataset.generated_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        ),
        format!("pharmacies:   {total}"),
        format!("no schedule:  {unspecified}"),
    ];
    for (comuna, count) in ranked.into_iter().take(TOP_COMUNAS) {
        lines.push(format!("  {count:>4}  {comuna}"));
    }
    lines
}
