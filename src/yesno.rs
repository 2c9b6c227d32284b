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

//! Yes/No and Yes/No/Blank tabulation over the two reserved candidate ids.

use crate::ballot::BallotBuffer;
use crate::config::Majority;
use crate::types::{YesNoTally, CANDIDATE_NO, CANDIDATE_YES};
use log::{debug, warn};

/// Tallies a Yes/No vote and applies the majority tests.
///
/// The first candidate on each ballot decides its vote: [`CANDIDATE_YES`]
/// counts as yes, [`CANDIDATE_NO`] as no, a ballot without ranks as blank.
/// With `blanks_lower_majority` set (the Yes/No/Blank method), blank ballots
/// enter the denominator of the ballot-majority test; otherwise only yes and
/// no ballots do. The voter-majority test always measures the yes votes
/// against the eligible voters.
pub fn count_yes_no(
    buffer: &BallotBuffer,
    eligible: u32,
    majority: &Majority,
    blanks_lower_majority: bool,
) -> YesNoTally {
    let mut yes = 0;
    let mut no = 0;
    let mut blank = 0;
    for index in 0..buffer.ballot_count() {
        match buffer.rows(index).find(|&id| id != 0) {
            None => blank += 1,
            Some(CANDIDATE_YES) => yes += 1,
            Some(CANDIDATE_NO) => no += 1,
            Some(id) => {
                warn!("Ballot {index} leads with unreserved candidate {id}, not counted");
            }
        }
    }

    let ballot_denominator = if blanks_lower_majority {
        yes + no + blank
    } else {
        yes + no
    };
    let on_ballots = majority
        .ballots
        .passed_by(yes as u64, ballot_denominator as u64);
    let on_voters = majority.voters.passed_by(yes as u64, eligible as u64);
    let passed = if majority.must_reach_both {
        on_ballots && on_voters
    } else {
        on_ballots || on_voters
    };
    debug!(
        "Yes/No tally: {yes} yes / {no} no / {blank} blank, \
         ballots test {on_ballots}, voters test {on_voters} => {passed}"
    );

    YesNoTally {
        yes,
        no,
        blank,
        passed,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ballot::BallotEncoder;
    use crate::config::Threshold;
    use crate::types::CandidateId;

    fn buffer(votes: &[Option<CandidateId>]) -> BallotBuffer {
        let mut encoder = BallotEncoder::new(votes.len() as u32);
        for vote in votes {
            match vote {
                Some(id) => encoder.add_ballot([vec![*id]]),
                None => encoder.add_ballot(Vec::<Vec<CandidateId>>::new()),
            }
        }
        encoder.finish()
    }

    fn majority(
        ballots: Threshold,
        voters: Threshold,
        must_reach_both: bool,
    ) -> Majority {
        Majority {
            ballots,
            voters,
            must_reach_both,
        }
    }

    const YES: Option<CandidateId> = Some(CANDIDATE_YES);
    const NO: Option<CandidateId> = Some(CANDIDATE_NO);
    const BLANK: Option<CandidateId> = None;

    #[test]
    fn test_simple_majority() {
        let buffer = buffer(&[YES, YES, YES, NO, BLANK]);
        let majority = majority(
            Threshold::new(1, 2, false),
            Threshold::new(1, 2, false),
            false,
        );
        let tally = count_yes_no(&buffer, 10, &majority, false);
        // 3/4 on ballots passes even though 3/10 on voters does not.
        assert_eq!(
            tally,
            YesNoTally {
                yes: 3,
                no: 1,
                blank: 1,
                passed: true,
            }
        );
    }

    #[test]
    fn test_must_reach_both() {
        let buffer = buffer(&[YES, YES, YES, NO, BLANK]);
        let majority = majority(
            Threshold::new(1, 2, false),
            Threshold::new(1, 2, false),
            true,
        );
        let tally = count_yes_no(&buffer, 10, &majority, false);
        assert!(!tally.passed);

        // With only 5 eligible voters, 3/5 passes the voter test too.
        let tally = count_yes_no(&buffer, 5, &majority, false);
        assert!(tally.passed);
    }

    #[test]
    fn test_blanks_lower_majority() {
        let buffer = buffer(&[YES, YES, NO, BLANK]);
        let majority = majority(
            Threshold::new(1, 2, false),
            Threshold::new(0, 1, true),
            true,
        );
        // Yes/No: 2/3 > 1/2 passes.
        assert!(count_yes_no(&buffer, 10, &majority, false).passed);
        // Yes/No/Blank: 2/4 > 1/2 fails.
        assert!(!count_yes_no(&buffer, 10, &majority, true).passed);
    }

    #[test]
    fn test_unreserved_id_ignored() {
        let buffer = buffer(&[YES, Some(9), NO]);
        let majority = majority(
            Threshold::new(1, 2, false),
            Threshold::new(0, 1, true),
            false,
        );
        let tally = count_yes_no(&buffer, 10, &majority, false);
        assert_eq!(tally.yes, 1);
        assert_eq!(tally.no, 1);
        assert_eq!(tally.blank, 0);
    }

    #[test]
    fn test_all_blank() {
        let buffer = buffer(&[BLANK, BLANK]);
        let majority = majority(
            Threshold::new(1, 2, false),
            Threshold::new(1, 2, false),
            true,
        );
        let tally = count_yes_no(&buffer, 10, &majority, false);
        // No yes/no ballots at all: both tests fail.
        assert_eq!(
            tally,
            YesNoTally {
                yes: 0,
                no: 0,
                blank: 2,
                passed: false,
            }
        );
    }
}
