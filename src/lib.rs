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

//! Multi-method vote tabulation for membership organisations.
//!
//! This library tabulates the result of a vote under one of five methods:
//! simple Yes/No, Yes/No/Blank, threshold majority, ranked pairs (Tideman)
//! and single transferable vote (Hagenbach-Bischoff quota with Gregory
//! surplus transfers). All methods share a compact binary ballot encoding
//! ([`ballot::BallotBuffer`]) and a set of allocation-free scan primitives
//! over it.
//!
//! The top-level entry points live in the [`dispatch`] module:
//! [`dispatch::tabulate`] consumes an encoded ballot buffer and dense
//! candidate ids, while [`dispatch::Election`] maps arbitrary candidate
//! values onto dense ids, encodes the ballots and remaps the result.
//!
//! Tabulation is synchronous and single-threaded; a call owns all of its
//! intermediate state and returns a [`types::VoteResult`] that is either a
//! deterministic outcome, a signal that an external tie-breaker is required,
//! or one of the quorum/blank/mention failure conditions.

#![forbid(missing_docs, unsafe_code)]

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub mod ballot;
pub mod config;
pub mod dispatch;
pub mod majority;
pub mod ranked_pairs;
pub mod report;
pub mod stv;
pub mod tiebreak;
pub mod types;
mod util;
pub mod yesno;

pub use ballot::{BallotBuffer, BallotEncoder};
pub use config::{Config, Majority, Threshold};
pub use dispatch::{tabulate, Election};
pub use types::{BallotCounts, CandidateId, Outcome, Tied, VoteResult};
