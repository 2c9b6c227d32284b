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

//! Plain-text protocol of a tabulation result, for callers that want a
//! human-readable record of the count.

use crate::types::{Outcome, StvEvent, Tied, VoteResult};
use std::fmt::Display;
use std::io;

/// Writes a tabulation result to the given output.
pub fn write_report<C: Display>(
    out: &mut impl io::Write,
    result: &VoteResult<C>,
) -> io::Result<()> {
    let counts = result.counts();
    writeln!(
        out,
        "Ballots: {} ({} blank) / {} eligible voters",
        counts.submitted, counts.blank, counts.eligible
    )?;

    match result {
        VoteResult::Success { outcome, .. } => write_outcome(out, outcome),
        VoteResult::TieBreakerNeeded { tied, .. } => {
            match tied {
                Tied::Candidates(candidates) => {
                    writeln!(out, "Tie-breaker needed between: {}", join(candidates))?
                }
                Tied::Pairs(pairs) => {
                    let pairs: Vec<String> =
                        pairs.iter().map(|(a, b)| format!("({a}, {b})")).collect();
                    writeln!(out, "Tie-breaker needed for pairs: {}", pairs.join(", "))?
                }
            }
            Ok(())
        }
        VoteResult::IncompleteTieBreaker { missing, .. } => {
            writeln!(out, "Tie-breaker misses: {}", join(missing))
        }
        VoteResult::MajorityEmpty { .. } => writeln!(out, "No majority is possible"),
        VoteResult::NoQuorum { .. } => writeln!(out, "Quorum not reached"),
        VoteResult::TooManyBlanks { .. } => writeln!(out, "Too many blank ballots"),
    }
}

fn write_outcome<C: Display>(out: &mut impl io::Write, outcome: &Outcome<C>) -> io::Result<()> {
    match outcome {
        Outcome::YesNo(tally) => {
            writeln!(
                out,
                "\tYes: {} / No: {} / Blank: {}",
                tally.yes, tally.no, tally.blank
            )?;
            writeln!(
                out,
                "Result: {}",
                if tally.passed { "passed" } else { "rejected" }
            )?;
        }
        Outcome::Majority(majority) => {
            for (candidate, mentions) in &majority.mentions {
                writeln!(out, "\tMentions: {candidate} ({mentions})")?;
            }
            if !majority.excluded.is_empty() {
                writeln!(out, "\tBelow mention threshold: {}", join(&majority.excluded))?;
            }
            writeln!(out, "Elected: {}", join(&majority.winners))?;
        }
        Outcome::RankedPairs(ranked) => {
            for (i, round) in ranked.rounds.iter().enumerate() {
                writeln!(out, "Round {}:", i + 1)?;
                for (winner, loser) in &round.locked {
                    writeln!(out, "\tLock: {winner} > {loser}")?;
                }
                writeln!(out, "\tWinner: {}", round.winner)?;
            }
            writeln!(out, "Elected: {}", join(&ranked.winners))?;
        }
        Outcome::Stv(stv) => {
            for event in &stv.events {
                match event {
                    StvEvent::ElectWithQuota { elected, quota, .. } => {
                        writeln!(out, "\tElect (quota {quota}): {}", join(elected))?
                    }
                    StvEvent::Eliminate { candidate, .. } => {
                        writeln!(out, "\tEliminate: {candidate}")?
                    }
                    StvEvent::ElectRest { elected } => {
                        writeln!(out, "\tElect remaining: {}", join(elected))?
                    }
                }
            }
            writeln!(out, "Elected: {}", join(&stv.winners))?;
        }
    }
    Ok(())
}

fn join<C: Display>(items: &[C]) -> String {
    items
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{BallotCounts, MajorityOutcome, StvOutcome, YesNoTally};

    fn counts() -> BallotCounts {
        BallotCounts {
            submitted: 4,
            blank: 1,
            eligible: 10,
        }
    }

    #[test]
    fn test_yes_no_report() {
        let result: VoteResult<u16> = VoteResult::Success {
            counts: counts(),
            outcome: Outcome::YesNo(YesNoTally {
                yes: 2,
                no: 1,
                blank: 1,
                passed: true,
            }),
        };
        let mut buf = Vec::new();
        write_report(&mut buf, &result).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "Ballots: 4 (1 blank) / 10 eligible voters\n\
             \tYes: 2 / No: 1 / Blank: 1\n\
             Result: passed\n"
        );
    }

    #[test]
    fn test_majority_report() {
        let result = VoteResult::Success {
            counts: counts(),
            outcome: Outcome::Majority(MajorityOutcome {
                winners: vec!["bob", "carol"],
                mentions: vec![("alice", 1), ("bob", 3), ("carol", 2)],
                included: vec!["bob", "carol"],
                excluded: vec!["alice"],
            }),
        };
        let mut buf = Vec::new();
        write_report(&mut buf, &result).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "Ballots: 4 (1 blank) / 10 eligible voters\n\
             \tMentions: alice (1)\n\
             \tMentions: bob (3)\n\
             \tMentions: carol (2)\n\
             \tBelow mention threshold: alice\n\
             Elected: bob, carol\n"
        );
    }

    #[test]
    fn test_stv_report() {
        let result: VoteResult<u16> = VoteResult::Success {
            counts: counts(),
            outcome: Outcome::Stv(StvOutcome {
                winners: vec![1, 3],
                events: vec![
                    StvEvent::ElectWithQuota {
                        elected: vec![1],
                        values: vec![(1, 3.0), (2, 1.0)],
                        quota: 2.0,
                    },
                    StvEvent::Eliminate {
                        candidate: 2,
                        values: vec![(1, 2.0), (2, 1.0)],
                    },
                    StvEvent::ElectRest { elected: vec![3] },
                ],
            }),
        };
        let mut buf = Vec::new();
        write_report(&mut buf, &result).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "Ballots: 4 (1 blank) / 10 eligible voters\n\
             \tElect (quota 2): 1\n\
             \tEliminate: 2\n\
             \tElect remaining: 3\n\
             Elected: 1, 3\n"
        );
    }

    #[test]
    fn test_tie_breaker_needed_report() {
        let result: VoteResult<u16> = VoteResult::TieBreakerNeeded {
            counts: counts(),
            tied: Tied::Pairs(vec![(3, 1)]),
        };
        let mut buf = Vec::new();
        write_report(&mut buf, &result).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "Ballots: 4 (1 blank) / 10 eligible voters\n\
             Tie-breaker needed for pairs: (3, 1)\n"
        );
    }

    #[test]
    fn test_no_quorum_report() {
        let result: VoteResult<u16> = VoteResult::NoQuorum { counts: counts() };
        let mut buf = Vec::new();
        write_report(&mut buf, &result).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "Ballots: 4 (1 blank) / 10 eligible voters\n\
             Quorum not reached\n"
        );
    }
}
