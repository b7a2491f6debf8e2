use super::Match;

/// Reduces candidates from many patterns to a non-overlapping set.
///
/// Candidates are visited by `start`, ties by ascending priority. Each one
/// is compared with the kept matches in insertion order: a strictly higher
/// priority evicts the kept match it overlaps and comparison continues; an
/// equal or lower priority drops the candidate on the spot. Evictions made
/// before a candidate is dropped stay evicted.
///
/// The result is sorted by `start`.
pub fn resolve_overlaps(mut candidates: Vec<Match>) -> Vec<Match> {
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then(a.priority.cmp(&b.priority)));

    let mut kept: Vec<Match> = Vec::with_capacity(candidates.len());
    'candidates: for candidate in candidates {
        let mut i = 0;
        while i < kept.len() {
            if candidate.overlaps(&kept[i]) {
                if candidate.priority > kept[i].priority {
                    kept.remove(i);
                    continue;
                }
                continue 'candidates;
            }
            i += 1;
        }
        kept.push(candidate);
    }

    kept.sort_by_key(|m| m.start);
    kept
}
