use crate::types::{DemographicRecord, DerivedMetrics};
use tracing::debug;

/// `round(count / population * 100, 1)`, or `None` for an empty unit.
///
/// Ties round to even on the scaled value, so 6.25 becomes 6.2.
pub fn percentage(count: u64, population: u64) -> Option<f64> {
    if population == 0 {
        return None;
    }
    let share = count as f64 / population as f64 * 100.0;
    Some((share * 10.0).round_ties_even() / 10.0)
}

pub fn derive(record: &DemographicRecord) -> DerivedMetrics {
    for (name, count) in [
        ("migrbg", record.migrbg),
        ("res10yrs", record.res10yrs),
        ("foreign", record.foreign),
    ] {
        if count > record.population {
            debug!(
                "unit {}: {} count {} exceeds population {}",
                record.id, name, count, record.population
            );
        }
    }
    if record.population == 0 {
        debug!("unit {}: zero population, percentages undefined", record.id);
    }

    DerivedMetrics {
        migrbg_perc: percentage(record.migrbg, record.population),
        res10yrs_perc: percentage(record.res10yrs, record.population),
        foreign_perc: percentage(record.foreign, record.population),
    }
}
