//! Longest increasing subsequence.
//!
//! The keyed diff records, for each node in the reordered window, where it
//! used to be (`old index + 1`, or `0` for a new node). Nodes whose recorded
//! positions form the longest increasing run are already in relative order
//! and can stay where they are; everything else is moved.
//!
//! # Algorithm
//!
//! Patience sorting. `tails[k]` holds the index of the smallest value that
//! ends an increasing run of length `k + 1`. Each value binary-searches the
//! first tail that is not smaller than it and either extends the longest run
//! or replaces that tail. A predecessor link per element rebuilds the run at
//! the end. O(n log n).

/// Indices of one longest strictly increasing subsequence of `seq`, in
/// ascending order. Zeros are treated as absent and never included.
///
/// ```rust,ignore
/// assert_eq!(longest_increasing_subsequence(&[2, 3, 1, 5, 6, 8, 7, 9, 4]), vec![0, 1, 3, 4, 6, 7]);
/// ```
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    let mut predecessors: Vec<Option<usize>> = vec![None; seq.len()];
    let mut tails: Vec<usize> = Vec::new();

    for (i, &value) in seq.iter().enumerate() {
        if value == 0 {
            continue;
        }
        let pos = tails.partition_point(|&t| seq[t] < value);
        if pos > 0 {
            predecessors[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        result.push(i);
        cursor = predecessors[i];
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Quadratic reference: length of the longest strictly increasing run of
    /// non-zero values.
    fn lis_len_reference(seq: &[usize]) -> usize {
        let mut best = vec![0usize; seq.len()];
        let mut overall = 0;
        for i in 0..seq.len() {
            if seq[i] == 0 {
                continue;
            }
            best[i] = 1;
            for j in 0..i {
                if seq[j] != 0 && seq[j] < seq[i] {
                    best[i] = best[i].max(best[j] + 1);
                }
            }
            overall = overall.max(best[i]);
        }
        overall
    }

    #[test]
    fn classic_example() {
        assert_eq!(
            longest_increasing_subsequence(&[2, 3, 1, 5, 6, 8, 7, 9, 4]),
            vec![0, 1, 3, 4, 6, 7]
        );
    }

    #[test]
    fn zeros_are_skipped() {
        assert_eq!(longest_increasing_subsequence(&[0, 0, 0]), Vec::<usize>::new());
        assert_eq!(longest_increasing_subsequence(&[3, 0, 1, 2]), vec![2, 3]);
    }

    #[test]
    fn empty_and_single() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
        assert_eq!(longest_increasing_subsequence(&[5]), vec![0]);
    }

    #[test]
    fn already_sorted_keeps_everything() {
        assert_eq!(longest_increasing_subsequence(&[1, 2, 3, 4]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn reversed_keeps_one() {
        assert_eq!(longest_increasing_subsequence(&[4, 3, 2, 1]).len(), 1);
    }

    proptest! {
        #[test]
        fn result_is_increasing_and_maximal(seq in proptest::collection::vec(0usize..50, 0..64)) {
            let lis = longest_increasing_subsequence(&seq);

            for pair in lis.windows(2) {
                prop_assert!(pair[0] < pair[1]);
                prop_assert!(seq[pair[0]] < seq[pair[1]]);
            }
            prop_assert!(lis.iter().all(|&i| seq[i] != 0));
            prop_assert_eq!(lis.len(), lis_len_reference(&seq));
        }
    }
}
