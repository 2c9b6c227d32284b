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

//! Single transferable vote with the Hagenbach-Bischoff quota and Gregory
//! fractional surplus transfers.
//!
//! A candidate is elected when its vote value *strictly exceeds*
//! `ballots / (seats + 1)`. Some references elect at `>=`; the strict
//! comparison is kept as a policy decision. Vote values are 64-bit floats;
//! equality comparisons on them are exact, which is sound because tied
//! values only arise from identical computations.

use crate::ballot::scan::{next_preferences, nth_preferences};
use crate::ballot::BallotBuffer;
use crate::tiebreak::{select_top, TieBreaker};
use crate::types::{CandidateId, Interrupt, StvEvent, StvOutcome, Tied};
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet};

/// Runs a single-transferable-vote tabulation, returning the winners in
/// election order and the chronological event protocol.
///
/// If `num_chosen` covers all candidates, everyone is elected immediately
/// through a single [`StvEvent::ElectRest`].
pub fn single_transferable_vote(
    buffer: &BallotBuffer,
    candidates: &[CandidateId],
    num_chosen: u32,
    tie_breaker: Option<&TieBreaker>,
) -> Result<StvOutcome<CandidateId>, Interrupt> {
    assert!(num_chosen >= 1);

    if num_chosen as usize >= candidates.len() {
        debug!("All {} candidates fit the {num_chosen} seats", candidates.len());
        let elected = candidates.to_vec();
        return Ok(StvOutcome {
            winners: elected.clone(),
            events: vec![StvEvent::ElectRest { elected }],
        });
    }

    let mut state = State::new(buffer, candidates, num_chosen, tie_breaker);

    let mut newly = state.elect_by_quota()?;
    loop {
        if state.elected.len() >= state.num_chosen {
            break;
        }
        if state.elected.len() + state.remaining.len() <= state.num_chosen {
            state.elect_rest();
            break;
        }
        if !newly.is_empty() {
            for &candidate in &newly {
                state.transfer_surplus(candidate);
            }
            newly = state.elect_by_quota()?;
            continue;
        }
        let candidate = state.select_eliminated()?;
        state.eliminate(candidate);
        newly = state.elect_by_quota()?;
    }

    Ok(StvOutcome {
        winners: state.elected,
        events: state.events,
    })
}

/// Running state of an STV tabulation.
struct State<'a> {
    buffer: &'a BallotBuffer,
    num_chosen: usize,
    quota: f64,
    /// Candidates still competing.
    remaining: BTreeSet<CandidateId>,
    /// Candidates eliminated so far.
    eliminated: BTreeSet<CandidateId>,
    /// The initial candidate set, used by the elimination descent.
    original: Vec<CandidateId>,
    /// Elected candidates, in election order.
    elected: Vec<CandidateId>,
    /// Vote-value rows, one per candidate still holding votes, with one
    /// column per ballot.
    table: BTreeMap<CandidateId, Vec<f64>>,
    /// Voting power lost to ballots without a next preference at an
    /// elimination.
    exhausted: f64,
    /// Number of ballots that had a first preference.
    assigned: u32,
    events: Vec<StvEvent<CandidateId>>,
    tie_breaker: Option<&'a TieBreaker>,
}

impl<'a> State<'a> {
    fn new(
        buffer: &'a BallotBuffer,
        candidates: &[CandidateId],
        num_chosen: u32,
        tie_breaker: Option<&'a TieBreaker>,
    ) -> Self {
        let remaining: BTreeSet<CandidateId> = candidates.iter().copied().collect();
        let quota = buffer.ballot_count() as f64 / (num_chosen as f64 + 1.0);
        debug!(
            "Tabulating {} seats among {} candidates, quota {quota}",
            num_chosen,
            candidates.len()
        );

        let ballots = buffer.ballot_count() as usize;
        let mut table: BTreeMap<CandidateId, Vec<f64>> = remaining
            .iter()
            .map(|&c| (c, vec![0.0; ballots]))
            .collect();
        let first = nth_preferences(buffer, &remaining, 0);
        let mut assigned = 0;
        for (i, &candidate) in first.assignment.iter().enumerate() {
            if candidate != 0 {
                table.get_mut(&candidate).unwrap()[i] = 1.0;
                assigned += 1;
            }
        }

        State {
            buffer,
            num_chosen: num_chosen as usize,
            quota,
            remaining,
            eliminated: BTreeSet::new(),
            original: candidates.to_vec(),
            elected: Vec::new(),
            table,
            exhausted: 0.0,
            assigned,
            events: Vec::new(),
            tie_breaker,
        }
    }

    /// Current vote value of a candidate: the sum of its row.
    fn value(&self, candidate: CandidateId) -> f64 {
        self.table.get(&candidate).unwrap().iter().sum()
    }

    /// Deep copy of the current vote values, sorted by candidate.
    fn snapshot(&self) -> Vec<(CandidateId, f64)> {
        self.table
            .iter()
            .map(|(&c, row)| (c, row.iter().sum()))
            .collect()
    }

    /// Checks that no voting power appeared or vanished.
    fn check_conservation(&self) {
        let total: f64 = self.table.values().flatten().sum::<f64>() + self.exhausted;
        assert!(
            (total - self.assigned as f64).abs() < 1e-6,
            "vote values sum to {total}, expected {}",
            self.assigned
        );
    }

    /// Elects every remaining candidate whose value strictly exceeds the
    /// quota, truncating to the open seats with the boundary tie-break.
    /// Returns the candidates elected by this check.
    fn elect_by_quota(&mut self) -> Result<Vec<CandidateId>, Interrupt> {
        let mut above: Vec<(CandidateId, f64)> = self
            .remaining
            .iter()
            .map(|&c| (c, self.value(c)))
            .filter(|&(_, v)| v > self.quota)
            .collect();
        above.sort_by(|&(ca, va), &(cb, vb)| vb.partial_cmp(&va).unwrap().then(ca.cmp(&cb)));
        if above.is_empty() {
            return Ok(Vec::new());
        }

        let room = self.num_chosen - self.elected.len();
        let chosen = select_top(&above, room, self.tie_breaker)?;
        debug!("Elected with quota {}: {chosen:?}", self.quota);

        let values = self.snapshot();
        for &candidate in &chosen {
            self.remaining.remove(&candidate);
            self.elected.push(candidate);
        }
        self.events.push(StvEvent::ElectWithQuota {
            elected: chosen.clone(),
            values,
            quota: self.quota,
        });
        Ok(chosen)
    }

    /// Gregory transfer: moves the surplus fraction of every ballot held by
    /// the elected candidate to the ballot's next remaining preference.
    /// Ballots without one keep their full value on the elected candidate.
    fn transfer_surplus(&mut self, candidate: CandidateId) {
        let total = self.value(candidate);
        let surplus = total - self.quota;
        debug_assert!(surplus > 0.0);
        let fraction = surplus / total;
        trace!("Transferring {fraction} of candidate {candidate}'s ballots");

        let scan = next_preferences(self.buffer, &self.remaining, candidate);
        let mut row = self.table.remove(&candidate).unwrap();
        for (i, value) in row.iter_mut().enumerate() {
            if *value == 0.0 {
                continue;
            }
            let next = scan.assignment[i];
            if next == 0 {
                continue;
            }
            let moved = fraction * *value;
            self.table.get_mut(&next).unwrap()[i] += moved;
            *value -= moved;
        }
        self.table.insert(candidate, row);
        self.check_conservation();
    }

    /// Picks the next candidate to eliminate: the remaining candidate with
    /// the smallest value, descending into n-th preference counts and then
    /// the tie-breaker when several share it.
    fn select_eliminated(&self) -> Result<CandidateId, Interrupt> {
        let minimum = self
            .remaining
            .iter()
            .map(|&c| self.value(c))
            .fold(f64::INFINITY, f64::min);
        let mut tied: Vec<CandidateId> = self
            .remaining
            .iter()
            .copied()
            .filter(|&c| self.value(c) == minimum)
            .collect();

        if tied.len() > 1 {
            debug!("Elimination tie at value {minimum}: {tied:?}");
            tied = self.descend_preferences(tied);
        }
        if tied.len() == 1 {
            return Ok(tied[0]);
        }

        // The ballots cannot separate the tied candidates any further.
        match self.tie_breaker {
            None => Err(Interrupt::TieBreakerNeeded(Tied::Candidates(tied))),
            Some(tie_breaker) => tie_breaker.least_preferred(&tied),
        }
    }

    /// Narrows an elimination tie by counting n-th preferences across the
    /// original candidates still present, for increasing n. Stops when a
    /// single candidate has the fewest, or no ballot carries an n-th
    /// preference any more.
    fn descend_preferences(&self, mut tied: Vec<CandidateId>) -> Vec<CandidateId> {
        let scan_set: BTreeSet<CandidateId> = self
            .original
            .iter()
            .copied()
            .filter(|c| !self.eliminated.contains(c))
            .collect();
        for n in 0.. {
            let scan = nth_preferences(self.buffer, &scan_set, n);
            if scan.tally.is_empty() {
                break;
            }
            let counts: Vec<u32> = tied
                .iter()
                .map(|c| scan.tally.get(c).copied().unwrap_or(0))
                .collect();
            let fewest = *counts.iter().min().unwrap();
            tied = tied
                .iter()
                .zip(&counts)
                .filter(|&(_, &count)| count == fewest)
                .map(|(&c, _)| c)
                .collect();
            trace!("Still tied at rank {n}: {tied:?}");
            if tied.len() == 1 {
                break;
            }
        }
        tied
    }

    /// Removes a candidate and transfers each of its ballots at full value
    /// to the ballot's next remaining preference; ballots without one are
    /// exhausted.
    fn eliminate(&mut self, candidate: CandidateId) {
        debug!("Eliminating candidate {candidate}");
        let values = self.snapshot();

        self.remaining.remove(&candidate);
        self.eliminated.insert(candidate);
        let scan = next_preferences(self.buffer, &self.remaining, candidate);
        let row = self.table.remove(&candidate).unwrap();
        for (i, &value) in row.iter().enumerate() {
            if value == 0.0 {
                continue;
            }
            let next = scan.assignment[i];
            if next == 0 {
                trace!("Ballot {i} exhausted with value {value}");
                self.exhausted += value;
            } else {
                self.table.get_mut(&next).unwrap()[i] += value;
            }
        }

        self.events.push(StvEvent::Eliminate { candidate, values });
        self.check_conservation();
    }

    /// Elects all remaining candidates to fill the open seats.
    fn elect_rest(&mut self) {
        let rest: Vec<CandidateId> = self.remaining.iter().copied().collect();
        debug!("Electing the rest: {rest:?}");
        self.elected.extend(&rest);
        self.remaining.clear();
        self.events.push(StvEvent::ElectRest { elected: rest });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ballot::BallotEncoder;

    fn buffer(ballots: &[(usize, Vec<CandidateId>)]) -> BallotBuffer {
        let count = ballots.iter().map(|&(n, _)| n).sum::<usize>();
        let mut encoder = BallotEncoder::new(count as u32);
        for (n, ballot) in ballots {
            for _ in 0..*n {
                encoder.add_ballot(ballot.iter().map(|&id| [id]));
            }
        }
        encoder.finish()
    }

    #[test]
    fn test_quota_election_and_transfer() {
        // 6 ballots, 2 seats: quota 2. Candidate 1 is elected with a surplus
        // of 2, half of each [1, 2] ballot flows to candidate 2.
        let buffer = buffer(&[(4, vec![1, 2]), (1, vec![2]), (1, vec![3])]);
        let outcome = single_transferable_vote(&buffer, &[1, 2, 3], 2, None).unwrap();
        assert_eq!(outcome.winners, vec![1, 2]);
        assert_eq!(
            outcome.events,
            vec![
                StvEvent::ElectWithQuota {
                    elected: vec![1],
                    values: vec![(1, 4.0), (2, 1.0), (3, 1.0)],
                    quota: 2.0,
                },
                StvEvent::ElectWithQuota {
                    elected: vec![2],
                    values: vec![(1, 2.0), (2, 3.0), (3, 1.0)],
                    quota: 2.0,
                },
            ]
        );
    }

    #[test]
    fn test_surplus_stays_without_next_preference() {
        // Candidate 1's surplus has nowhere to go: its ballots list nobody
        // else. The seat is filled by elimination instead.
        let buffer = buffer(&[(4, vec![1]), (1, vec![2]), (1, vec![3])]);
        let outcome = single_transferable_vote(&buffer, &[1, 2, 3], 2, None);
        // Candidates 2 and 3 tie at value 1 with identical preference
        // profiles at every rank.
        assert_eq!(
            outcome,
            Err(Interrupt::TieBreakerNeeded(Tied::Candidates(vec![2, 3])))
        );

        let tie_breaker = TieBreaker::new(&[2, 3, 1]);
        let outcome =
            single_transferable_vote(&buffer, &[1, 2, 3], 2, Some(&tie_breaker)).unwrap();
        // 3 is least preferred and eliminated; 2 is elected as the rest.
        assert_eq!(outcome.winners, vec![1, 2]);
        assert_eq!(
            outcome.events,
            vec![
                StvEvent::ElectWithQuota {
                    elected: vec![1],
                    values: vec![(1, 4.0), (2, 1.0), (3, 1.0)],
                    quota: 2.0,
                },
                StvEvent::Eliminate {
                    candidate: 3,
                    values: vec![(1, 4.0), (2, 1.0), (3, 1.0)],
                },
                StvEvent::ElectRest { elected: vec![2] },
            ]
        );
    }

    #[test]
    fn test_elimination_transfers_full_value() {
        // 5 ballots, 1 seat: quota 2.5. Nobody exceeds it until candidate
        // 3's ballot flows to candidate 1.
        let buffer = buffer(&[(2, vec![1]), (2, vec![2]), (1, vec![3, 1])]);
        let outcome = single_transferable_vote(&buffer, &[1, 2, 3], 1, None).unwrap();
        assert_eq!(outcome.winners, vec![1]);
        assert_eq!(
            outcome.events,
            vec![
                StvEvent::Eliminate {
                    candidate: 3,
                    values: vec![(1, 2.0), (2, 2.0), (3, 1.0)],
                },
                StvEvent::ElectWithQuota {
                    elected: vec![1],
                    values: vec![(1, 3.0), (2, 2.0)],
                    quota: 2.5,
                },
            ]
        );
    }

    #[test]
    fn test_elimination_descent() {
        // 9 ballots, 2 seats: quota 3. Candidates 2, 3 and 4 tie at value 2;
        // at the second preference rank, candidate 3 collects 2 counts while
        // 2 and 4 collect none, so {2, 4} stay tied and the tie-breaker
        // eliminates its least preferred member.
        let buffer = buffer(&[
            (3, vec![1]),
            (2, vec![2]),
            (2, vec![3]),
            (2, vec![4, 3]),
        ]);
        let tie_breaker = TieBreaker::new(&[3, 2, 4, 1]);
        let outcome =
            single_transferable_vote(&buffer, &[1, 2, 3, 4], 2, Some(&tie_breaker)).unwrap();
        assert_eq!(outcome.winners, vec![3, 1]);
        assert_eq!(
            outcome.events,
            vec![
                StvEvent::Eliminate {
                    candidate: 4,
                    values: vec![(1, 3.0), (2, 2.0), (3, 2.0), (4, 2.0)],
                },
                StvEvent::ElectWithQuota {
                    elected: vec![3],
                    values: vec![(1, 3.0), (2, 2.0), (3, 4.0)],
                    quota: 3.0,
                },
                StvEvent::Eliminate {
                    candidate: 2,
                    values: vec![(1, 3.0), (2, 2.0), (3, 4.0)],
                },
                StvEvent::ElectRest { elected: vec![1] },
            ]
        );
    }

    #[test]
    fn test_elimination_descent_without_tie_breaker() {
        let buffer = buffer(&[
            (3, vec![1]),
            (2, vec![2]),
            (2, vec![3]),
            (2, vec![4, 3]),
        ]);
        assert_eq!(
            single_transferable_vote(&buffer, &[1, 2, 3, 4], 2, None),
            Err(Interrupt::TieBreakerNeeded(Tied::Candidates(vec![2, 4])))
        );
    }

    #[test]
    fn test_incomplete_tie_breaker() {
        let buffer = buffer(&[(2, vec![1]), (1, vec![2]), (1, vec![3])]);
        let tie_breaker = TieBreaker::new(&[1, 2]);
        assert_eq!(
            single_transferable_vote(&buffer, &[1, 2, 3], 1, Some(&tie_breaker)),
            Err(Interrupt::IncompleteTieBreaker(vec![3]))
        );
    }

    #[test]
    fn test_degenerate_elect_rest() {
        let buffer = buffer(&[(1, vec![1])]);
        let outcome = single_transferable_vote(&buffer, &[1, 2, 3], 3, None).unwrap();
        assert_eq!(outcome.winners, vec![1, 2, 3]);
        assert_eq!(
            outcome.events,
            vec![StvEvent::ElectRest {
                elected: vec![1, 2, 3]
            }]
        );
    }

    #[test]
    fn test_value_conservation_in_snapshots() {
        let buffer = buffer(&[(4, vec![1, 2]), (1, vec![2]), (1, vec![3])]);
        let outcome = single_transferable_vote(&buffer, &[1, 2, 3], 2, None).unwrap();
        // Every ballot has a first preference and nothing is exhausted, so
        // each snapshot sums to the ballot count.
        for event in &outcome.events {
            if let StvEvent::ElectWithQuota { values, .. } = event {
                let total: f64 = values.iter().map(|&(_, v)| v).sum();
                assert_eq!(total, 6.0);
            }
        }
    }

    #[test]
    fn test_reruns_are_identical() {
        let buffer = buffer(&[
            (3, vec![1]),
            (2, vec![2]),
            (2, vec![3]),
            (2, vec![4, 3]),
        ]);
        let tie_breaker = TieBreaker::new(&[3, 2, 4, 1]);
        let first =
            single_transferable_vote(&buffer, &[1, 2, 3, 4], 2, Some(&tie_breaker)).unwrap();
        let second =
            single_transferable_vote(&buffer, &[1, 2, 3, 4], 2, Some(&tie_breaker)).unwrap();
        assert_eq!(first, second);
    }
}
