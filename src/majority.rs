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

//! Threshold-majority tabulation: the most-mentioned candidates win, with a
//! tie-breaker resolving an ambiguous boundary.

use crate::tiebreak::{select_top, TieBreaker};
use crate::types::{CandidateId, Interrupt};
use log::debug;
use std::collections::BTreeMap;

/// Elects the `num_chosen` candidates with the most mentions.
///
/// Candidates are sorted by decreasing mention count (ties by ascending id
/// for determinism). If the candidates on both sides of the selection
/// boundary have the same mention count, the tied band is re-ordered by the
/// tie-breaker before truncating; without a tie-breaker the tabulation is
/// interrupted with the tied band.
pub fn threshold_majority(
    included: &[CandidateId],
    mentions: &BTreeMap<CandidateId, u32>,
    num_chosen: u32,
    tie_breaker: Option<&TieBreaker>,
) -> Result<Vec<CandidateId>, Interrupt> {
    assert!(num_chosen >= 1);

    let mut sorted: Vec<(CandidateId, u32)> = included
        .iter()
        .map(|&c| (c, mentions.get(&c).copied().unwrap_or(0)))
        .collect();
    sorted.sort_by(|&(ca, na), &(cb, nb)| nb.cmp(&na).then(ca.cmp(&cb)));
    debug!("Candidates by mentions: {sorted:?}");

    select_top(&sorted, num_chosen as usize, tie_breaker)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::Tied;

    fn mentions(entries: &[(CandidateId, u32)]) -> BTreeMap<CandidateId, u32> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_clear_winners() {
        // Mentions of the ballots {1,2,3} / {2,3,4} / {2,3,5} / {1,3,4}.
        let mentions = mentions(&[(1, 2), (2, 3), (3, 4), (4, 2), (5, 1)]);
        let winners = threshold_majority(&[1, 2, 3, 4], &mentions, 2, None).unwrap();
        assert_eq!(winners, vec![3, 2]);
    }

    #[test]
    fn test_boundary_tie_needs_tie_breaker() {
        // Mentions of the ballots {1,2,3} / {2,3,4} / {1,2,3} / {1,3,4}.
        let mentions = mentions(&[(1, 3), (2, 3), (3, 4), (4, 2)]);
        assert_eq!(
            threshold_majority(&[2, 3, 1], &mentions, 2, None),
            Err(Interrupt::TieBreakerNeeded(Tied::Candidates(vec![1, 2])))
        );
    }

    #[test]
    fn test_boundary_tie_resolved() {
        let mentions = mentions(&[(1, 3), (2, 3), (3, 4), (4, 2)]);
        let tie_breaker = TieBreaker::new(&[2, 1, 3, 4]);
        let winners =
            threshold_majority(&[2, 3, 1], &mentions, 2, Some(&tie_breaker)).unwrap();
        assert_eq!(winners, vec![3, 2]);

        let tie_breaker = TieBreaker::new(&[1, 2, 3, 4]);
        let winners =
            threshold_majority(&[2, 3, 1], &mentions, 2, Some(&tie_breaker)).unwrap();
        assert_eq!(winners, vec![3, 1]);
    }

    #[test]
    fn test_boundary_tie_incomplete_tie_breaker() {
        let mentions = mentions(&[(1, 3), (2, 3), (3, 4), (4, 2)]);
        let tie_breaker = TieBreaker::new(&[1, 3, 4]);
        assert_eq!(
            threshold_majority(&[2, 3, 1], &mentions, 2, Some(&tie_breaker)),
            Err(Interrupt::IncompleteTieBreaker(vec![2]))
        );
    }

    #[test]
    fn test_fewer_candidates_than_seats() {
        let mentions = mentions(&[(1, 2), (2, 1)]);
        let winners = threshold_majority(&[1, 2], &mentions, 5, None).unwrap();
        assert_eq!(winners, vec![1, 2]);
    }

    #[test]
    fn test_tie_inside_winners_is_not_ambiguous() {
        // Candidates 1 and 2 tie, but both fit: no boundary ambiguity.
        let mentions = mentions(&[(1, 3), (2, 3), (3, 1)]);
        let winners = threshold_majority(&[1, 2, 3], &mentions, 2, None).unwrap();
        assert_eq!(winners, vec![1, 2]);
    }
}
