use std::collections::HashSet;

use crate::pack::models::PackWindow;
use crate::provider::RecentScore;

/// Decision for one fetched score against the active pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// In the window, on a pack map: process it.
    Accept,
    /// Not eligible, but later scores in the batch may be.
    Skip,
    /// Older than the pack start. The provider returns scores newest
    /// first, so nothing after this one can be eligible either.
    Stop,
}

pub fn check_score(
    score: &RecentScore,
    window: &PackWindow,
    pack_maps: &HashSet<i64>,
) -> Eligibility {
    if score.created_at < window.start {
        return Eligibility::Stop;
    }
    if score.created_at > window.end {
        return Eligibility::Skip;
    }
    match score.beatmap_id {
        Some(id) if pack_maps.contains(&id) => Eligibility::Accept,
        _ => Eligibility::Skip,
    }
}
