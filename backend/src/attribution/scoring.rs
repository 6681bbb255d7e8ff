use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::AttributionScore;
use std::ops::RangeInclusive;

pub const SEARCH_RELIANT_RANGE: RangeInclusive<u8> = 50..=95;
pub const VISUAL_RELIANT_RANGE: RangeInclusive<u8> = 5..=50;

/// Draws the search share from the range selected by `tool_activity`; the visual share is the complement.
pub fn score<R: Rng + ?Sized>(tool_activity: bool, rng: &mut R) -> AttributionScore {
    let range = if tool_activity {
        SEARCH_RELIANT_RANGE
    } else {
        VISUAL_RELIANT_RANGE
    };
    AttributionScore::from_search_score(rng.random_range(range))
}

/// Fixed seed gives the same draw for every request.
pub fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
