use crate::result::Candidate;
use crate::result::SearchMethod;
use indexmap::IndexMap;
use indexmap::map::Entry;
use log::debug;

/// Default RRF constant; larger values flatten the advantage of top ranks.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Reciprocal Rank Fusion of two ranked lists.
///
/// `RRF(d) = Σ 1 / (k + rank(d))` with 1-based ranks, summed over the lists
/// containing `d`. Candidates are matched by id; the first-seen copy keeps
/// its payload and picks up scores it lacks from later copies. The result is
/// sorted by descending fused score with ties in first-seen order, and the
/// score is stored in [`Candidate::fused_score`].
pub fn fuse(list_a: Vec<Candidate>, list_b: Vec<Candidate>, k: f32) -> Vec<Candidate> {
    fuse_many(vec![list_a, list_b], k)
}

/// [`fuse`] generalized to any number of ranked lists.
pub fn fuse_many(lists: Vec<Vec<Candidate>>, k: f32) -> Vec<Candidate> {
    let total: usize = lists.iter().map(Vec::len).sum();
    let mut fused: IndexMap<String, (f32, Candidate)> = IndexMap::with_capacity(total);

    for list in lists {
        for (idx, candidate) in list.into_iter().enumerate() {
            let rank = idx as f32 + 1.0;
            let contribution = 1.0 / (k + rank);

            match fused.entry(candidate.id.clone()) {
                Entry::Occupied(mut entry) => {
                    let (score, existing) = entry.get_mut();
                    *score += contribution;
                    existing.merge_scores_from(&candidate);
                }
                Entry::Vacant(entry) => {
                    entry.insert((contribution, candidate));
                }
            }
        }
    }

    let mut results: Vec<Candidate> = fused
        .into_values()
        .map(|(score, mut candidate)| {
            candidate.fused_score = Some(score);
            candidate.search_method = SearchMethod::Fused;
            candidate
        })
        .collect();

    // Stable sort keeps first-seen order for equal scores
    results.sort_by(|a, b| b.fused_score.unwrap_or(0.0).total_cmp(&a.fused_score.unwrap_or(0.0)));

    debug!("RRF fused {total} entries into {} candidates", results.len());
    results
}
