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

//! Vote configuration: the five method tags, rational thresholds and the
//! quorum/blank/mention gate predicates.

use crate::types::{BallotCounts, CandidateId};
use num::rational::Ratio;
use std::collections::BTreeMap;

/// A rational threshold with an inclusiveness flag.
///
/// A value `v` (given as a `num / den` pair) passes the threshold `t` when
/// `v >= t` (inclusive) or `v > t` (exclusive); the symmetric [`within`]
/// predicate uses `<=` / `<`. Comparisons are exact: both sides are
/// cross-multiplied in 128-bit arithmetic, so no rounding is involved.
///
/// [`within`]: Threshold::within
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    ratio: Ratio<u64>,
    inclusive: bool,
}

impl Threshold {
    /// Creates a threshold from a numerator/denominator pair.
    pub fn new(num: u64, den: u64, inclusive: bool) -> Self {
        assert_ne!(den, 0, "threshold denominator must be non-zero");
        Threshold {
            ratio: Ratio::new(num, den),
            inclusive,
        }
    }

    /// Creates a threshold from a decimal value, interpreted at nine decimal
    /// places.
    pub fn from_decimal(value: f64, inclusive: bool) -> Self {
        assert!(
            value.is_finite() && value >= 0.0,
            "threshold must be a finite non-negative decimal"
        );
        const SCALE: u64 = 1_000_000_000;
        let num = (value * SCALE as f64).round() as u64;
        Threshold {
            ratio: Ratio::new(num, SCALE),
            inclusive,
        }
    }

    /// Returns the threshold as a reduced rational.
    pub fn ratio(&self) -> Ratio<u64> {
        self.ratio
    }

    /// Returns true if `num / den` reaches the threshold from above. A zero
    /// denominator never passes.
    pub fn passed_by(&self, num: u64, den: u64) -> bool {
        if den == 0 {
            return false;
        }
        let lhs = num as u128 * *self.ratio.denom() as u128;
        let rhs = *self.ratio.numer() as u128 * den as u128;
        if self.inclusive {
            lhs >= rhs
        } else {
            lhs > rhs
        }
    }

    /// Returns true if `num / den` stays within the threshold from below. A
    /// zero denominator is always within.
    pub fn within(&self, num: u64, den: u64) -> bool {
        if den == 0 {
            return true;
        }
        let lhs = num as u128 * *self.ratio.denom() as u128;
        let rhs = *self.ratio.numer() as u128 * den as u128;
        if self.inclusive {
            lhs <= rhs
        } else {
            lhs < rhs
        }
    }
}

/// Majority requirements of a Yes/No vote: a test against the cast ballots
/// and a test against the eligible voters, combined with AND or OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Majority {
    /// Threshold the yes-share of the counted ballots must pass.
    pub ballots: Threshold,
    /// Threshold the yes-share of the eligible voters must pass.
    pub voters: Threshold,
    /// Whether both tests must pass (AND), or either one suffices (OR).
    pub must_reach_both: bool,
}

/// Configuration of one vote, tagged by method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Config {
    /// Simple Yes/No: blank ballots are not counted towards the ballot
    /// majority.
    YesNo {
        /// Participation requirement.
        quorum: Threshold,
        /// Majority requirements.
        majority: Majority,
    },
    /// Yes/No/Blank: blank ballots count towards the ballot majority
    /// denominator.
    YesNoBlank {
        /// Participation requirement.
        quorum: Threshold,
        /// Majority requirements.
        majority: Majority,
    },
    /// Threshold majority: the most-mentioned candidates win.
    ThresholdMajority {
        /// Participation requirement.
        quorum: Threshold,
        /// Upper bound on the share of blank ballots.
        blank_limit: Threshold,
        /// Number of winners to elect, at least one.
        num_chosen: u32,
        /// Share of ballots a candidate must be mentioned on to compete.
        mention_threshold: Threshold,
    },
    /// Ranked pairs (Tideman).
    RankedPairs {
        /// Participation requirement.
        quorum: Threshold,
        /// Upper bound on the share of blank ballots.
        blank_limit: Threshold,
        /// Number of winners to elect, at least one.
        num_chosen: u32,
        /// Share of ballots a candidate must be mentioned on to compete.
        mention_threshold: Threshold,
    },
    /// Single transferable vote.
    Stv {
        /// Participation requirement.
        quorum: Threshold,
        /// Upper bound on the share of blank ballots.
        blank_limit: Threshold,
        /// Number of winners to elect, at least one.
        num_chosen: u32,
    },
}

impl Config {
    /// Returns the participation requirement.
    pub fn quorum(&self) -> &Threshold {
        match self {
            Config::YesNo { quorum, .. }
            | Config::YesNoBlank { quorum, .. }
            | Config::ThresholdMajority { quorum, .. }
            | Config::RankedPairs { quorum, .. }
            | Config::Stv { quorum, .. } => quorum,
        }
    }

    /// Returns the blank-ballot limit, absent for Yes/No methods.
    pub fn blank_limit(&self) -> Option<&Threshold> {
        match self {
            Config::YesNo { .. } | Config::YesNoBlank { .. } => None,
            Config::ThresholdMajority { blank_limit, .. }
            | Config::RankedPairs { blank_limit, .. }
            | Config::Stv { blank_limit, .. } => Some(blank_limit),
        }
    }

    /// Returns true if enough ballots were submitted relative to the
    /// eligible voters.
    pub fn passes_quorum(&self, counts: &BallotCounts) -> bool {
        self.quorum()
            .passed_by(counts.submitted as u64, counts.eligible as u64)
    }

    /// Returns true if the share of blank ballots stays within the
    /// configured limit. Methods without a blank limit always pass.
    pub fn passes_blank_limit(&self, counts: &BallotCounts) -> bool {
        match self.blank_limit() {
            None => true,
            Some(limit) => limit.within(counts.blank as u64, counts.submitted as u64),
        }
    }
}

/// Partitions `candidates` into those whose mention share passes `threshold`
/// (included) and the rest (excluded), preserving the input order.
pub fn filter_by_mentions(
    candidates: &[CandidateId],
    mentions: &BTreeMap<CandidateId, u32>,
    ballot_count: u32,
    threshold: &Threshold,
) -> (Vec<CandidateId>, Vec<CandidateId>) {
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for &candidate in candidates {
        let count = mentions.get(&candidate).copied().unwrap_or(0);
        if threshold.passed_by(count as u64, ballot_count as u64) {
            included.push(candidate);
        } else {
            excluded.push(candidate);
        }
    }
    (included, excluded)
}
