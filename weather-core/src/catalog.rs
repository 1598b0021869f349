//! Fixed placeholder data served by the non-proxy endpoints.

use rand::{Rng, seq::IndexedRandom};

use crate::model::{GlobalAverageRecord, StaticLocationRecord};

pub const GLOBAL_AVERAGE: GlobalAverageRecord = GlobalAverageRecord {
    description: "Average Global Weather (Placeholder)",
    temperature: "19°C",
    humidity: "60%",
};

pub const RANDOM_LOCATIONS: [StaticLocationRecord; 5] = [
    StaticLocationRecord { location: "Sydney", temperature: "25°C", humidity: "60%" },
    StaticLocationRecord { location: "Cairo", temperature: "30°C", humidity: "40%" },
    StaticLocationRecord { location: "Moscow", temperature: "10°C", humidity: "75%" },
    StaticLocationRecord { location: "Beijing", temperature: "20°C", humidity: "50%" },
    StaticLocationRecord { location: "Delhi", temperature: "35°C", humidity: "45%" },
];

/// Pick one record uniformly at random. `None` only for an empty table.
pub fn pick_location<'a, R>(
    table: &'a [StaticLocationRecord],
    rng: &mut R,
) -> Option<&'a StaticLocationRecord>
where
    R: Rng + ?Sized,
{
    table.choose(rng)
}

/// [`pick_location`] with the thread-local generator.
pub fn random_location(table: &[StaticLocationRecord]) -> Option<&StaticLocationRecord> {
    pick_location(table, &mut rand::rng())
}
