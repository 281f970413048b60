//! Name similarity for fuzzy disambiguation.

use crate::scanner::index::DiskFile;

/// Levenshtein edit distance over Unicode scalar values.
///
/// Two-row dynamic programming; `O(len(a) * len(b))` time, `O(len(b))` space.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Index of the candidate whose file name is closest to `declared_name`.
///
/// Lowest distance wins; ties keep the earliest candidate. `None` only for an
/// empty slice.
#[must_use]
pub fn best_candidate(declared_name: &str, candidates: &[DiskFile]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, levenshtein(declared_name, &candidate.file_name())))
        .min_by(|(ia, da), (ib, db)| da.cmp(db).then(ia.cmp(ib)))
        .map(|(idx, _)| idx)
}
