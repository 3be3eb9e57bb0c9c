//! `regions`: the fixed region table.

use farmaturno_core::REGIONS;

pub(crate) fn run_regions() {
    for line in region_lines() {
        println!("{line}");
    }
}

fn region_lines() -> Vec<String> {
    REGIONS
        .iter()
        .map(|r| {
            format!(
                "{:>2}  {:<26}  {:>8.3} {:>8.3}  z{}",
                r.code, r.name, r.latitude, r.longitude, r.zoom
            )
        })
        .collect()
}
