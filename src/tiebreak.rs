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

//! External tie-breaker ranking, consulted only for ambiguous subsets.

use crate::types::{CandidateId, Interrupt, Tied};
use log::debug;
use std::collections::HashMap;

/// A strict total preference over candidates, most preferred first.
///
/// The tie-breaker is consulted only when a tabulation is ambiguous, and only
/// for the ambiguous subset. A candidate in the ambiguous subset but absent
/// from the tie-breaker yields [`Interrupt::IncompleteTieBreaker`].
#[derive(Debug, Clone)]
pub struct TieBreaker {
    index: HashMap<CandidateId, usize>,
}

impl TieBreaker {
    /// Creates a tie-breaker from an ordered candidate sequence, most
    /// preferred first. Duplicate entries are a programmer error.
    pub fn new(order: &[CandidateId]) -> Self {
        let mut index = HashMap::with_capacity(order.len());
        for (i, &candidate) in order.iter().enumerate() {
            let previous = index.insert(candidate, i);
            assert!(
                previous.is_none(),
                "candidate {candidate} appears twice in the tie-breaker"
            );
        }
        TieBreaker { index }
    }

    /// Returns the preference index of a candidate; lower is more preferred.
    pub fn rank(&self, candidate: CandidateId) -> Option<usize> {
        self.index.get(&candidate).copied()
    }

    /// Returns the candidates of `ids` that the tie-breaker does not rank,
    /// in input order.
    fn unranked(&self, ids: &[CandidateId]) -> Vec<CandidateId> {
        ids.iter()
            .copied()
            .filter(|&c| !self.index.contains_key(&c))
            .collect()
    }

    /// Sorts `ids` most preferred first.
    pub fn sort_preferred(&self, ids: &mut [CandidateId]) -> Result<(), Interrupt> {
        let missing = self.unranked(ids);
        if !missing.is_empty() {
            debug!("Tie-breaker does not rank {missing:?}");
            return Err(Interrupt::IncompleteTieBreaker(missing));
        }
        ids.sort_by_key(|&c| self.rank(c).unwrap());
        Ok(())
    }

    /// Returns the least preferred candidate of `ids`.
    pub fn least_preferred(&self, ids: &[CandidateId]) -> Result<CandidateId, Interrupt> {
        let missing = self.unranked(ids);
        if !missing.is_empty() {
            debug!("Tie-breaker does not rank {missing:?}");
            return Err(Interrupt::IncompleteTieBreaker(missing));
        }
        Ok(ids
            .iter()
            .copied()
            .max_by_key(|&c| self.rank(c).unwrap())
            .expect("least_preferred requires a non-empty set"))
    }
}

/// Selects the top `take` candidates from a list sorted by descending score,
/// resolving a score tie at the selection boundary through the tie-breaker.
///
/// If the candidates on both sides of the boundary share a score, the whole
/// band of candidates with that score is re-ordered by tie-breaker preference
/// before truncating. Without a tie-breaker the band is reported as
/// [`Interrupt::TieBreakerNeeded`].
pub fn select_top<S: PartialEq + Copy>(
    scored: &[(CandidateId, S)],
    take: usize,
    tie_breaker: Option<&TieBreaker>,
) -> Result<Vec<CandidateId>, Interrupt> {
    debug_assert!(take > 0);
    if scored.len() <= take {
        return Ok(scored.iter().map(|&(c, _)| c).collect());
    }

    let boundary = scored[take - 1].1;
    if scored[take].1 != boundary {
        return Ok(scored[..take].iter().map(|&(c, _)| c).collect());
    }

    // The boundary is ambiguous: gather the whole band sharing its score.
    let band_start = scored.iter().position(|&(_, s)| s == boundary).unwrap();
    let mut band: Vec<CandidateId> = scored
        .iter()
        .filter(|&&(_, s)| s == boundary)
        .map(|&(c, _)| c)
        .collect();
    debug!("Boundary tie between {band:?}");

    let tie_breaker = match tie_breaker {
        None => return Err(Interrupt::TieBreakerNeeded(Tied::Candidates(band))),
        Some(tie_breaker) => tie_breaker,
    };
    tie_breaker.sort_preferred(&mut band)?;

    let mut winners: Vec<CandidateId> = scored[..band_start].iter().map(|&(c, _)| c).collect();
    winners.extend(band);
    winners.truncate(take);
    Ok(winners)
}
