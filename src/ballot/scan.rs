// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Scan primitives over a [`BallotBuffer`]: pairwise rank comparison and
//! n-th/next preference extraction. All scans walk the row stream directly
//! and allocate nothing per ballot.

use super::BallotBuffer;
use crate::types::CandidateId;
use std::collections::{BTreeMap, BTreeSet};

/// How one ballot orders a pair of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOrdering {
    /// Neither candidate appears on the ballot.
    Neither,
    /// Only the first candidate appears; the second is infinitely worse.
    OnlyFirst,
    /// Only the second candidate appears; the first is infinitely worse.
    OnlySecond,
    /// Both candidates appear; the value is `rank(b) - rank(a)`, so a
    /// positive value means `a` is preferred and zero means both share a
    /// rank.
    Ranked(i32),
}

/// Compares how ballot `index` ranks candidates `a` and `b`.
pub fn compare_by_ballot(
    buffer: &BallotBuffer,
    index: u32,
    a: CandidateId,
    b: CandidateId,
) -> PairOrdering {
    let mut rank = 0i32;
    let mut rank_a = None;
    let mut rank_b = None;
    for id in buffer.rows(index) {
        if id == 0 {
            rank += 1;
            continue;
        }
        if id == a && rank_a.is_none() {
            rank_a = Some(rank);
        }
        if id == b && rank_b.is_none() {
            rank_b = Some(rank);
        }
        if rank_a.is_some() && rank_b.is_some() {
            break;
        }
    }
    match (rank_a, rank_b) {
        (None, None) => PairOrdering::Neither,
        (Some(_), None) => PairOrdering::OnlyFirst,
        (None, Some(_)) => PairOrdering::OnlySecond,
        (Some(ra), Some(rb)) => PairOrdering::Ranked(rb - ra),
    }
}

/// Result of a preference scan over all ballots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceScan {
    /// Number of ballots assigned to each candidate. Candidates with no
    /// assignment are absent.
    pub tally: BTreeMap<CandidateId, u32>,
    /// Per-ballot assignment; zero marks a ballot with no assignment.
    pub assignment: Vec<CandidateId>,
}

/// For every ballot, extracts the `(n+1)`-th distinct candidate (rank order,
/// skipping separators) that belongs to `active`, and tallies the extracted
/// candidates.
pub fn nth_preferences(
    buffer: &BallotBuffer,
    active: &BTreeSet<CandidateId>,
    n: usize,
) -> PreferenceScan {
    let mut tally = BTreeMap::new();
    let mut assignment = Vec::with_capacity(buffer.ballot_count() as usize);
    let mut seen = Vec::new();
    for index in 0..buffer.ballot_count() {
        seen.clear();
        let mut found = 0;
        for id in buffer.rows(index) {
            if id == 0 || !active.contains(&id) || seen.contains(&id) {
                continue;
            }
            seen.push(id);
            if seen.len() == n + 1 {
                found = id;
                break;
            }
        }
        if found != 0 {
            *tally.entry(found).or_insert(0) += 1;
        }
        assignment.push(found);
    }
    PreferenceScan { tally, assignment }
}

/// For every ballot, finds the first candidate in `active` appearing strictly
/// after `given` on the ballot, and tallies the extracted candidates. Ballots
/// not mentioning `given` get no assignment.
pub fn next_preferences(
    buffer: &BallotBuffer,
    active: &BTreeSet<CandidateId>,
    given: CandidateId,
) -> PreferenceScan {
    let mut tally = BTreeMap::new();
    let mut assignment = Vec::with_capacity(buffer.ballot_count() as usize);
    for index in 0..buffer.ballot_count() {
        let mut after_given = false;
        let mut found = 0;
        for id in buffer.rows(index) {
            if id == 0 {
                continue;
            }
            if after_given && active.contains(&id) {
                found = id;
                break;
            }
            if id == given {
                after_given = true;
            }
        }
        if found != 0 {
            *tally.entry(found).or_insert(0) += 1;
        }
        assignment.push(found);
    }
    PreferenceScan { tally, assignment }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ballot::BallotEncoder;

    fn buffer(ballots: &[Vec<Vec<CandidateId>>]) -> BallotBuffer {
        let mut encoder = BallotEncoder::new(ballots.len() as u32);
        for ballot in ballots {
            encoder.add_ballot(ballot.iter().map(|rank| rank.iter().copied()));
        }
        encoder.finish()
    }

    fn active(ids: &[CandidateId]) -> BTreeSet<CandidateId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_compare_both_ranked() {
        let buffer = buffer(&[vec![vec![1], vec![2, 3], vec![4]]]);
        assert_eq!(compare_by_ballot(&buffer, 0, 1, 4), PairOrdering::Ranked(2));
        assert_eq!(
            compare_by_ballot(&buffer, 0, 4, 1),
            PairOrdering::Ranked(-2)
        );
        // Candidates sharing a rank compare equal.
        assert_eq!(compare_by_ballot(&buffer, 0, 2, 3), PairOrdering::Ranked(0));
    }

    #[test]
    fn test_compare_one_sided() {
        let buffer = buffer(&[vec![vec![1], vec![2]]]);
        assert_eq!(compare_by_ballot(&buffer, 0, 1, 5), PairOrdering::OnlyFirst);
        assert_eq!(
            compare_by_ballot(&buffer, 0, 5, 2),
            PairOrdering::OnlySecond
        );
        assert_eq!(compare_by_ballot(&buffer, 0, 5, 6), PairOrdering::Neither);
    }

    #[test]
    fn test_compare_blank_ballot() {
        let buffer = buffer(&[vec![]]);
        assert_eq!(compare_by_ballot(&buffer, 0, 1, 2), PairOrdering::Neither);
    }

    #[test]
    fn test_first_preferences() {
        let buffer = buffer(&[
            vec![vec![1], vec![2]],
            vec![vec![2], vec![1]],
            vec![vec![3], vec![1]],
            vec![],
        ]);
        let scan = nth_preferences(&buffer, &active(&[1, 2]), 0);
        assert_eq!(scan.assignment, vec![1, 2, 1, 0]);
        assert_eq!(
            scan.tally.into_iter().collect::<Vec<_>>(),
            vec![(1, 2), (2, 1)]
        );
    }

    #[test]
    fn test_nth_preferences_skip_inactive() {
        // With candidate 2 inactive, ballot 0's second preference is 3.
        let buffer = buffer(&[vec![vec![1], vec![2], vec![3]]]);
        let scan = nth_preferences(&buffer, &active(&[1, 3]), 1);
        assert_eq!(scan.assignment, vec![3]);
        assert_eq!(scan.tally.into_iter().collect::<Vec<_>>(), vec![(3, 1)]);
    }

    #[test]
    fn test_nth_preferences_exhausted() {
        let buffer = buffer(&[vec![vec![1]]]);
        let scan = nth_preferences(&buffer, &active(&[1, 2]), 1);
        assert_eq!(scan.assignment, vec![0]);
        assert!(scan.tally.is_empty());
    }

    #[test]
    fn test_next_preferences() {
        let buffer = buffer(&[
            vec![vec![1], vec![2], vec![3]],
            vec![vec![1], vec![3]],
            vec![vec![2], vec![1]],
            vec![vec![2], vec![3]],
        ]);
        let scan = next_preferences(&buffer, &active(&[2, 3]), 1);
        // Ballot 0: 2 follows 1. Ballot 1: 3 follows 1. Ballot 2: nothing
        // follows 1. Ballot 3: 1 is absent, no assignment.
        assert_eq!(scan.assignment, vec![2, 3, 0, 0]);
        assert_eq!(
            scan.tally.into_iter().collect::<Vec<_>>(),
            vec![(2, 1), (3, 1)]
        );
    }

    #[test]
    fn test_next_preferences_skips_inactive() {
        let buffer = buffer(&[vec![vec![1], vec![2], vec![3]]]);
        let scan = next_preferences(&buffer, &active(&[3]), 1);
        assert_eq!(scan.assignment, vec![3]);
    }

    #[test]
    fn test_next_preferences_within_rank() {
        // Equal-ranked candidates are "strictly after" in row order: the
        // scan follows the encoded stream.
        let buffer = buffer(&[vec![vec![1, 2]]]);
        let scan = next_preferences(&buffer, &active(&[2]), 1);
        assert_eq!(scan.assignment, vec![2]);
    }
}
