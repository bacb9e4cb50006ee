use crate::models::SearchHit;

/// Popularity rank used for comparisons: unranked breeds sort last
#[inline]
pub fn effective_popularity(hit: &SearchHit) -> f64 {
    match hit.record.popularity {
        Some(rank) if rank > 0 => rank as f64,
        _ => f64::INFINITY,
    }
}

#[inline]
fn effective_score(hit: &SearchHit) -> f64 {
    if hit.score.is_finite() {
        hit.score
    } else {
        0.0
    }
}

/// Pick one winner from a non-empty result set
///
/// Most popular breed wins (lowest rank); ties go to the higher similarity
/// score; on a full tie the earlier hit is kept. Returns `None` only for an
/// empty slice.
pub fn select_best(hits: &[SearchHit]) -> Option<&SearchHit> {
    let (first, rest) = hits.split_first()?;

    Some(rest.iter().fold(first, |best, candidate| {
        let best_rank = effective_popularity(best);
        let candidate_rank = effective_popularity(candidate);

        if candidate_rank < best_rank {
            candidate
        } else if candidate_rank == best_rank && effective_score(candidate) > effective_score(best) {
            candidate
        } else {
            best
        }
    }))
}
