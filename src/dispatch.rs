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

//! Top-level tabulation: gate checks, routing to the method engines, and the
//! mapped entry point translating arbitrary candidate values to dense ids.

use crate::ballot::{BallotBuffer, BallotEncoder};
use crate::config::{filter_by_mentions, Config};
use crate::majority::threshold_majority;
use crate::ranked_pairs::ranked_pairs;
use crate::stv::single_transferable_vote;
use crate::tiebreak::TieBreaker;
use crate::types::{
    BallotCounts, CandidateId, MajorityOutcome, Outcome, RankedPairsOutcome, VoteResult,
};
use crate::yesno::count_yes_no;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Tabulates an encoded election.
///
/// The gates run first: quorum, then (for non-Yes/No methods) the blank
/// limit and the mention requirement. The selected engine then consumes the
/// buffer, the candidate list and the tie-breaker, and its outcome or
/// interruption is returned as a [`VoteResult`].
pub fn tabulate(
    config: &Config,
    buffer: &BallotBuffer,
    eligible_voters: u32,
    candidates: &[CandidateId],
    tie_breaker: Option<&[CandidateId]>,
) -> VoteResult<CandidateId> {
    let counts = BallotCounts {
        submitted: buffer.ballot_count(),
        blank: buffer.count_blanks(),
        eligible: eligible_voters,
    };
    debug!(
        "Tabulating {} ballots ({} blank, {} eligible voters) over {} candidates",
        counts.submitted,
        counts.blank,
        counts.eligible,
        candidates.len()
    );

    if !config.passes_quorum(&counts) {
        info!(
            "No quorum: {} ballots of {} eligible voters",
            counts.submitted, counts.eligible
        );
        return VoteResult::NoQuorum { counts };
    }
    if !config.passes_blank_limit(&counts) {
        info!(
            "Too many blanks: {} of {} ballots",
            counts.blank, counts.submitted
        );
        return VoteResult::TooManyBlanks { counts };
    }

    let tie_breaker = tie_breaker.map(TieBreaker::new);
    let tie_breaker = tie_breaker.as_ref();

    match config {
        Config::YesNo { majority, .. } => VoteResult::Success {
            counts,
            outcome: Outcome::YesNo(count_yes_no(buffer, eligible_voters, majority, false)),
        },
        Config::YesNoBlank { majority, .. } => VoteResult::Success {
            counts,
            outcome: Outcome::YesNo(count_yes_no(buffer, eligible_voters, majority, true)),
        },
        Config::ThresholdMajority {
            num_chosen,
            mention_threshold,
            ..
        } => {
            let mentions = buffer.candidate_mentions();
            let (included, excluded) =
                filter_by_mentions(candidates, &mentions, counts.submitted, mention_threshold);
            if included.is_empty() {
                info!("No candidate passes the mention threshold");
                return VoteResult::MajorityEmpty { counts };
            }
            match threshold_majority(&included, &mentions, *num_chosen, tie_breaker) {
                Ok(winners) => VoteResult::Success {
                    counts,
                    outcome: Outcome::Majority(MajorityOutcome {
                        winners,
                        mentions: candidates
                            .iter()
                            .map(|&c| (c, mentions.get(&c).copied().unwrap_or(0)))
                            .collect(),
                        included,
                        excluded,
                    }),
                },
                Err(interrupt) => interrupt.into_result(counts),
            }
        }
        Config::RankedPairs {
            num_chosen,
            mention_threshold,
            ..
        } => {
            let mentions = buffer.candidate_mentions();
            let (included, excluded) =
                filter_by_mentions(candidates, &mentions, counts.submitted, mention_threshold);
            if included.len() < 2 {
                info!("Fewer than two candidates pass the mention threshold");
                return VoteResult::MajorityEmpty { counts };
            }
            match ranked_pairs(buffer, &included, &mentions, *num_chosen, tie_breaker) {
                Ok((winners, rounds)) => VoteResult::Success {
                    counts,
                    outcome: Outcome::RankedPairs(RankedPairsOutcome {
                        winners,
                        rounds,
                        included,
                        excluded,
                    }),
                },
                Err(interrupt) => interrupt.into_result(counts),
            }
        }
        Config::Stv { num_chosen, .. } => {
            let mentions = buffer.candidate_mentions();
            if !candidates.iter().any(|c| mentions.contains_key(c)) {
                info!("No candidate is mentioned on any ballot");
                return VoteResult::MajorityEmpty { counts };
            }
            match single_transferable_vote(buffer, candidates, *num_chosen, tie_breaker) {
                Ok(outcome) => VoteResult::Success {
                    counts,
                    outcome: Outcome::Stv(outcome),
                },
                Err(interrupt) => interrupt.into_result(counts),
            }
        }
    }
}

/// An election over arbitrary candidate values.
///
/// This is the mapped entry point: candidate values are interned as dense
/// ids (starting at 1, or the fixed No/Yes ids for the Yes/No methods), the
/// ballots are encoded into a [`BallotBuffer`], the core tabulation runs,
/// and every id in the result is mapped back to the caller's value.
#[derive(Debug, Clone)]
pub struct Election<V> {
    config: Config,
    candidates: Vec<V>,
    ballots: Vec<Vec<Vec<V>>>,
    eligible_voters: u32,
    tie_breaker: Option<Vec<V>>,
}

impl<V: Clone + Eq + Hash + Debug> Election<V> {
    /// Returns a new builder.
    pub fn builder() -> ElectionBuilder<V> {
        ElectionBuilder::default()
    }

    /// Encodes the ballots, runs the tabulation and maps the result back to
    /// the candidate values.
    ///
    /// For Yes/No methods the election must list exactly two candidates, the
    /// "No" value first.
    pub fn tabulate(&self) -> VoteResult<V> {
        if matches!(
            self.config,
            Config::YesNo { .. } | Config::YesNoBlank { .. }
        ) {
            assert_eq!(
                self.candidates.len(),
                2,
                "Yes/No elections take exactly two candidates: the No and the Yes values"
            );
        }

        let mut index: HashMap<&V, CandidateId> = HashMap::with_capacity(self.candidates.len());
        for (i, value) in self.candidates.iter().enumerate() {
            let previous = index.insert(value, (i + 1) as CandidateId);
            assert!(previous.is_none(), "duplicate candidate {value:?}");
        }
        let resolve = |value: &V| -> CandidateId {
            *index
                .get(value)
                .unwrap_or_else(|| panic!("unknown candidate {value:?}"))
        };

        let mut encoder = BallotEncoder::new(self.ballots.len() as u32);
        for ballot in &self.ballots {
            encoder.add_ballot(ballot.iter().map(|rank| rank.iter().map(resolve)));
        }
        let buffer = encoder.finish();

        let ids: Vec<CandidateId> = (1..=self.candidates.len() as CandidateId).collect();
        let tie_breaker: Option<Vec<CandidateId>> = self
            .tie_breaker
            .as_ref()
            .map(|order| order.iter().map(resolve).collect());

        tabulate(
            &self.config,
            &buffer,
            self.eligible_voters,
            &ids,
            tie_breaker.as_deref(),
        )
        .map(|id| self.candidates[(id - 1) as usize].clone())
    }
}

/// Builder for the [`Election`] type.
pub struct ElectionBuilder<V> {
    config: Option<Config>,
    candidates: Vec<V>,
    ballots: Vec<Vec<Vec<V>>>,
    eligible_voters: Option<u32>,
    tie_breaker: Option<Vec<V>>,
}

impl<V> Default for ElectionBuilder<V> {
    fn default() -> Self {
        ElectionBuilder {
            config: None,
            candidates: Vec::new(),
            ballots: Vec::new(),
            eligible_voters: None,
            tie_breaker: None,
        }
    }
}

impl<V: Clone + Eq + Hash + Debug> ElectionBuilder<V> {
    /// Builds the [`Election`].
    pub fn build(self) -> Election<V> {
        Election {
            config: self.config.unwrap(),
            candidates: self.candidates,
            ballots: self.ballots,
            eligible_voters: self.eligible_voters.unwrap(),
            tie_breaker: self.tie_breaker,
        }
    }

    /// Sets the vote configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the candidates. For Yes/No methods, pass the "No" value first
    /// and the "Yes" value second.
    pub fn candidates(mut self, candidates: impl Into<Vec<V>>) -> Self {
        self.candidates = candidates.into();
        self
    }

    /// Adds one ballot: a list of ranks, each a set of equally preferred
    /// candidates, most preferred rank first.
    pub fn ballot(mut self, ranks: impl Into<Vec<Vec<V>>>) -> Self {
        self.ballots.push(ranks.into());
        self
    }

    /// Sets all ballots at once.
    pub fn ballots(mut self, ballots: impl Into<Vec<Vec<Vec<V>>>>) -> Self {
        self.ballots = ballots.into();
        self
    }

    /// Sets the number of eligible voters.
    pub fn eligible_voters(mut self, eligible_voters: u32) -> Self {
        self.eligible_voters = Some(eligible_voters);
        self
    }

    /// Sets the tie-breaker ranking, most preferred first.
    pub fn tie_breaker(mut self, tie_breaker: impl Into<Vec<V>>) -> Self {
        self.tie_breaker = Some(tie_breaker.into());
        self
    }
}
