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

//! Types shared by all tabulation methods: candidate ids, ballot counts,
//! result variants and per-method outcome payloads.

/// Identifier of a candidate on a ballot. Zero is reserved as the rank
/// separator in the ballot buffer and never denotes a candidate.
pub type CandidateId = u16;

/// Reserved candidate id carrying the "No" option in Yes/No methods.
pub const CANDIDATE_NO: CandidateId = 1;

/// Reserved candidate id carrying the "Yes" option in Yes/No methods.
pub const CANDIDATE_YES: CandidateId = 2;

/// Ballot counts of one tabulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BallotCounts {
    /// Number of ballots submitted, including blank ones.
    pub submitted: u32,
    /// Number of blank ballots among the submitted ones.
    pub blank: u32,
    /// Number of voters eligible to cast a ballot.
    pub eligible: u32,
}

/// Items whose relative order could not be decided without an external
/// tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tied<C> {
    /// Candidates tied with each other.
    Candidates(Vec<C>),
    /// Unordered candidate pairs whose edge could not be directed.
    Pairs(Vec<(C, C)>),
}

/// Tally of a Yes/No or Yes/No/Blank vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YesNoTally {
    /// Number of ballots voting "Yes".
    pub yes: u32,
    /// Number of ballots voting "No".
    pub no: u32,
    /// Number of blank ballots.
    pub blank: u32,
    /// Whether the vote passed the configured majority tests.
    pub passed: bool,
}

/// Outcome of a threshold-majority tabulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorityOutcome<C> {
    /// Elected candidates, sorted by decreasing mention count.
    pub winners: Vec<C>,
    /// Mention count of every input candidate.
    pub mentions: Vec<(C, u32)>,
    /// Candidates that passed the configured mention threshold.
    pub included: Vec<C>,
    /// Candidates that fell below the configured mention threshold.
    pub excluded: Vec<C>,
}

/// One round of a ranked-pairs tabulation, electing exactly one winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPairsRound<C> {
    /// The candidate elected in this round.
    pub winner: C,
    /// Majority pairs in Tideman order, each as `(winner, loser)`.
    pub ordered_pairs: Vec<(C, C)>,
    /// Edges actually inserted into the lock graph, each as `(winner,
    /// loser)`, in insertion order.
    pub locked: Vec<(C, C)>,
}

/// Outcome of a ranked-pairs tabulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPairsOutcome<C> {
    /// Elected candidates, in election order.
    pub winners: Vec<C>,
    /// The rounds that produced the winners, in order.
    pub rounds: Vec<RankedPairsRound<C>>,
    /// Candidates that passed the configured mention threshold.
    pub included: Vec<C>,
    /// Candidates that fell below the configured mention threshold.
    pub excluded: Vec<C>,
}

/// One event in the chronological protocol of an STV tabulation.
///
/// `values` snapshots list the current vote value of every candidate still
/// holding votes (remaining and elected), sorted by candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum StvEvent<C> {
    /// One or more candidates strictly exceeded the quota and were elected.
    ElectWithQuota {
        /// The candidates elected by this quota check, by decreasing value.
        elected: Vec<C>,
        /// Vote values at the moment of the election.
        values: Vec<(C, f64)>,
        /// The Hagenbach-Bischoff quota in force.
        quota: f64,
    },
    /// The candidate with the lowest vote value was eliminated.
    Eliminate {
        /// The eliminated candidate.
        candidate: C,
        /// Vote values at the moment of the elimination, including the
        /// eliminated candidate.
        values: Vec<(C, f64)>,
    },
    /// All remaining candidates were elected to fill the open seats.
    ElectRest {
        /// The candidates elected without reaching the quota.
        elected: Vec<C>,
    },
}

/// Outcome of a single-transferable-vote tabulation.
#[derive(Debug, Clone, PartialEq)]
pub struct StvOutcome<C> {
    /// Elected candidates, in election order.
    pub winners: Vec<C>,
    /// Chronological protocol of elections, eliminations and the terminal
    /// rest election.
    pub events: Vec<StvEvent<C>>,
}

/// Method-specific payload of a successful tabulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<C> {
    /// Yes/No or Yes/No/Blank tally.
    YesNo(YesNoTally),
    /// Threshold-majority winners.
    Majority(MajorityOutcome<C>),
    /// Ranked-pairs winners and rounds.
    RankedPairs(RankedPairsOutcome<C>),
    /// STV winners and event protocol.
    Stv(StvOutcome<C>),
}

/// Result of a tabulation.
///
/// Every variant carries the [`BallotCounts`] of the tabulation. Only
/// [`VoteResult::Success`] is a deterministic outcome; all other variants are
/// data-dependent conditions the caller must inspect (there is no implicit
/// resumption).
#[derive(Debug, Clone, PartialEq)]
pub enum VoteResult<C> {
    /// The tabulation completed with a deterministic outcome.
    Success {
        /// Ballot counts of this tabulation.
        counts: BallotCounts,
        /// Method-specific outcome.
        outcome: Outcome<C>,
    },
    /// The tabulation is ambiguous and no tie-breaker was provided.
    TieBreakerNeeded {
        /// Ballot counts of this tabulation.
        counts: BallotCounts,
        /// The ambiguous items.
        tied: Tied<C>,
    },
    /// A tie-breaker was provided but does not rank every ambiguous item.
    IncompleteTieBreaker {
        /// Ballot counts of this tabulation.
        counts: BallotCounts,
        /// Ambiguous items absent from the tie-breaker.
        missing: Vec<C>,
    },
    /// Not enough candidates were mentioned (or, for ranked pairs, too many
    /// ballots ordered no pair at all) for the method to produce a winner.
    MajorityEmpty {
        /// Ballot counts of this tabulation.
        counts: BallotCounts,
    },
    /// Too few ballots were submitted relative to the eligible voters.
    NoQuorum {
        /// Ballot counts of this tabulation.
        counts: BallotCounts,
    },
    /// Too many blank ballots were submitted.
    TooManyBlanks {
        /// Ballot counts of this tabulation.
        counts: BallotCounts,
    },
}

impl<C> VoteResult<C> {
    /// Returns the ballot counts of this tabulation.
    pub fn counts(&self) -> &BallotCounts {
        match self {
            VoteResult::Success { counts, .. }
            | VoteResult::TieBreakerNeeded { counts, .. }
            | VoteResult::IncompleteTieBreaker { counts, .. }
            | VoteResult::MajorityEmpty { counts }
            | VoteResult::NoQuorum { counts }
            | VoteResult::TooManyBlanks { counts } => counts,
        }
    }

    /// Returns true if the tabulation completed with a deterministic outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, VoteResult::Success { .. })
    }

    /// Maps every candidate in this result through `f`, preserving the
    /// structure of the result. Used by the mapped entry point to translate
    /// dense candidate ids back into caller-provided values.
    pub fn map<T>(self, mut f: impl FnMut(C) -> T) -> VoteResult<T> {
        match self {
            VoteResult::Success { counts, outcome } => VoteResult::Success {
                counts,
                outcome: map_outcome(outcome, &mut f),
            },
            VoteResult::TieBreakerNeeded { counts, tied } => VoteResult::TieBreakerNeeded {
                counts,
                tied: map_tied(tied, &mut f),
            },
            VoteResult::IncompleteTieBreaker { counts, missing } => {
                VoteResult::IncompleteTieBreaker {
                    counts,
                    missing: missing.into_iter().map(f).collect(),
                }
            }
            VoteResult::MajorityEmpty { counts } => VoteResult::MajorityEmpty { counts },
            VoteResult::NoQuorum { counts } => VoteResult::NoQuorum { counts },
            VoteResult::TooManyBlanks { counts } => VoteResult::TooManyBlanks { counts },
        }
    }
}

fn map_tied<C, T>(tied: Tied<C>, f: &mut impl FnMut(C) -> T) -> Tied<T> {
    match tied {
        Tied::Candidates(items) => Tied::Candidates(items.into_iter().map(f).collect()),
        Tied::Pairs(pairs) => Tied::Pairs(pairs.into_iter().map(|(a, b)| (f(a), f(b))).collect()),
    }
}

fn map_outcome<C, T>(outcome: Outcome<C>, f: &mut impl FnMut(C) -> T) -> Outcome<T> {
    match outcome {
        Outcome::YesNo(tally) => Outcome::YesNo(tally),
        Outcome::Majority(m) => Outcome::Majority(MajorityOutcome {
            winners: m.winners.into_iter().map(&mut *f).collect(),
            mentions: m.mentions.into_iter().map(|(c, n)| (f(c), n)).collect(),
            included: m.included.into_iter().map(&mut *f).collect(),
            excluded: m.excluded.into_iter().map(&mut *f).collect(),
        }),
        Outcome::RankedPairs(r) => Outcome::RankedPairs(RankedPairsOutcome {
            winners: r.winners.into_iter().map(&mut *f).collect(),
            rounds: r
                .rounds
                .into_iter()
                .map(|round| RankedPairsRound {
                    winner: f(round.winner),
                    ordered_pairs: round
                        .ordered_pairs
                        .into_iter()
                        .map(|(w, l)| (f(w), f(l)))
                        .collect(),
                    locked: round
                        .locked
                        .into_iter()
                        .map(|(w, l)| (f(w), f(l)))
                        .collect(),
                })
                .collect(),
            included: r.included.into_iter().map(&mut *f).collect(),
            excluded: r.excluded.into_iter().map(&mut *f).collect(),
        }),
        Outcome::Stv(s) => Outcome::Stv(StvOutcome {
            winners: s.winners.into_iter().map(&mut *f).collect(),
            events: s
                .events
                .into_iter()
                .map(|event| match event {
                    StvEvent::ElectWithQuota {
                        elected,
                        values,
                        quota,
                    } => StvEvent::ElectWithQuota {
                        elected: elected.into_iter().map(&mut *f).collect(),
                        values: values.into_iter().map(|(c, v)| (f(c), v)).collect(),
                        quota,
                    },
                    StvEvent::Eliminate { candidate, values } => StvEvent::Eliminate {
                        candidate: f(candidate),
                        values: values.into_iter().map(|(c, v)| (f(c), v)).collect(),
                    },
                    StvEvent::ElectRest { elected } => StvEvent::ElectRest {
                        elected: elected.into_iter().map(&mut *f).collect(),
                    },
                })
                .collect(),
        }),
    }
}

/// Condition that interrupts an engine before it can produce an outcome.
///
/// Interrupts are data-dependent, not errors: the dispatcher translates them
/// into the corresponding [`VoteResult`] variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// An ambiguity requires an external tie-breaker.
    TieBreakerNeeded(Tied<CandidateId>),
    /// The tie-breaker does not rank every ambiguous item.
    IncompleteTieBreaker(Vec<CandidateId>),
    /// The ballots do not carry enough preferences for this method.
    MajorityEmpty,
}

impl Interrupt {
    /// Translates this interrupt into a [`VoteResult`] carrying the given
    /// ballot counts.
    pub fn into_result(self, counts: BallotCounts) -> VoteResult<CandidateId> {
        match self {
            Interrupt::TieBreakerNeeded(tied) => VoteResult::TieBreakerNeeded { counts, tied },
            Interrupt::IncompleteTieBreaker(missing) => {
                VoteResult::IncompleteTieBreaker { counts, missing }
            }
            Interrupt::MajorityEmpty => VoteResult::MajorityEmpty { counts },
        }
    }
}
