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

//! Append-only encoder producing a finalised [`BallotBuffer`].

use super::BallotBuffer;
use crate::types::CandidateId;
use log::trace;
use std::collections::BTreeMap;

/// Encoder for a fixed number of ballots.
///
/// The encoder reserves the offsets table for exactly the number of ballots
/// declared at construction, appends row streams as ballots are added, and
/// maintains a running mention tally. [`BallotEncoder::finish`] writes the
/// mention table and returns the finalised buffer.
///
/// Adding more ballots than declared, placing the reserved id zero in a rank,
/// or finishing before all declared ballots were added are programmer errors
/// and panic.
pub struct BallotEncoder {
    data: Vec<u8>,
    declared: u32,
    added: u32,
    mentions: BTreeMap<CandidateId, u32>,
}

impl BallotEncoder {
    /// Creates an encoder reserving space for exactly `num_ballots` ballots.
    pub fn new(num_ballots: u32) -> Self {
        // Header: ballot count, one offset slot per ballot, mentions offset.
        let header = 4 + 4 * num_ballots as usize + 4;
        let mut data = vec![0u8; header];
        data[0..4].copy_from_slice(&num_ballots.to_ne_bytes());
        BallotEncoder {
            data,
            declared: num_ballots,
            added: 0,
            mentions: BTreeMap::new(),
        }
    }

    /// Appends one ballot. Each item of `ranks` is the set of candidates
    /// ranked equally at that position, most preferred rank first; a ballot
    /// with no ranks is blank.
    pub fn add_ballot(
        &mut self,
        ranks: impl IntoIterator<Item = impl IntoIterator<Item = CandidateId>>,
    ) {
        assert!(
            self.added < self.declared,
            "ballot count exceeded: {} ballots were declared",
            self.declared
        );

        let offset = self.data.len() as u32;
        let slot = 4 + 4 * self.added as usize;
        self.data[slot..slot + 4].copy_from_slice(&offset.to_ne_bytes());

        for (i, rank) in ranks.into_iter().enumerate() {
            if i != 0 {
                self.data.extend_from_slice(&0u16.to_ne_bytes());
            }
            let mut rank_len = 0;
            for id in rank {
                assert_ne!(id, 0, "candidate id 0 is reserved as the rank separator");
                self.data.extend_from_slice(&id.to_ne_bytes());
                *self.mentions.entry(id).or_insert(0) += 1;
                rank_len += 1;
            }
            assert_ne!(rank_len, 0, "a rank must contain at least one candidate");
        }

        trace!(
            "Encoded ballot {} at offset {offset} ({} bytes)",
            self.added,
            self.data.len() as u32 - offset
        );
        self.added += 1;
    }

    /// Writes the mention table and returns the finalised buffer.
    pub fn finish(mut self) -> BallotBuffer {
        assert_eq!(
            self.added, self.declared,
            "{} ballots were declared but only {} were added",
            self.declared, self.added
        );

        let mentions_offset = self.data.len() as u32;
        let slot = 4 + 4 * self.declared as usize;
        self.data[slot..slot + 4].copy_from_slice(&mentions_offset.to_ne_bytes());

        // Align the cursor to 4 bytes before the (u32, u32) entries, so the
        // final length is already a 4-byte multiple.
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        for (&id, &count) in &self.mentions {
            self.data.extend_from_slice(&(id as u32).to_ne_bytes());
            self.data.extend_from_slice(&count.to_ne_bytes());
        }

        trace!(
            "Finalised buffer: {} ballots, {} mentioned candidates, {} bytes",
            self.declared,
            self.mentions.len(),
            self.data.len()
        );
        BallotBuffer::from_bytes(self.data)
    }
}
