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

//! Compact binary encoding of ranked ballots, shared by all tabulation
//! methods.
//!
//! A finalised buffer is a single contiguous byte region with the following
//! layout (all words in host byte order; the buffer is an in-process
//! representation and is not portable across machines):
//!
//! ```text
//! u32     ballot_count = N
//! u32[N]  ballot_offsets    // byte offset of each ballot's row stream
//! u32     mentions_offset   // byte offset immediately after the last ballot
//! u16[..] ballot rows       // rank separator = 0, candidate id != 0
//!         pad to 4 bytes
//! (u32 candidate_id, u32 mentions)[K]
//! ```
//!
//! Within a ballot's row stream, candidates ranked equally are appended
//! consecutively and ranks after the first are preceded by a single zero
//! separator. A ballot is blank iff its offset equals the next ballot's
//! offset (taking `mentions_offset` for the last ballot).

mod encoder;
pub mod scan;

pub use encoder::BallotEncoder;

use crate::types::CandidateId;
use std::collections::BTreeMap;

/// Finalised, read-only buffer of encoded ballots plus a per-candidate
/// mention tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotBuffer {
    data: Vec<u8>,
}

impl BallotBuffer {
    pub(crate) fn from_bytes(data: Vec<u8>) -> Self {
        BallotBuffer { data }
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_ne_bytes(self.data[at..at + 2].try_into().unwrap())
    }

    fn read_u32(&self, at: usize) -> u32 {
        u32::from_ne_bytes(self.data[at..at + 4].try_into().unwrap())
    }

    /// Returns the number of encoded ballots.
    pub fn ballot_count(&self) -> u32 {
        self.read_u32(0)
    }

    /// Byte offset of the row stream of ballot `index`.
    fn ballot_offset(&self, index: u32) -> usize {
        debug_assert!(index < self.ballot_count());
        self.read_u32(4 + 4 * index as usize) as usize
    }

    /// Byte offset immediately after the last ballot's row stream.
    fn mentions_offset(&self) -> usize {
        self.read_u32(4 + 4 * self.ballot_count() as usize) as usize
    }

    /// Byte offset one past the row stream of ballot `index`.
    fn ballot_end(&self, index: u32) -> usize {
        if index + 1 == self.ballot_count() {
            self.mentions_offset()
        } else {
            self.ballot_offset(index + 1)
        }
    }

    /// Returns true if ballot `index` carries no ranks at all.
    pub fn is_blank(&self, index: u32) -> bool {
        self.ballot_offset(index) == self.ballot_end(index)
    }

    /// Counts the ballots whose rank list is empty.
    pub fn count_blanks(&self) -> u32 {
        (0..self.ballot_count())
            .filter(|&i| self.is_blank(i))
            .count() as u32
    }

    /// Iterates over the raw row words of ballot `index`: candidate ids,
    /// interleaved with zero separators between consecutive ranks.
    pub fn rows(&self, index: u32) -> impl Iterator<Item = u16> + '_ {
        let start = self.ballot_offset(index);
        let end = self.ballot_end(index);
        (start..end).step_by(2).map(|at| self.read_u16(at))
    }

    /// Returns the mention tally: for every candidate appearing on at least
    /// one ballot, the number of its occurrences across all ballots.
    pub fn candidate_mentions(&self) -> BTreeMap<CandidateId, u32> {
        let mut table = BTreeMap::new();
        let mut at = (self.mentions_offset() + 3) & !3;
        while at < self.data.len() {
            let id = self.read_u32(at);
            let count = self.read_u32(at + 4);
            table.insert(id as CandidateId, count);
            at += 8;
        }
        table
    }

    /// Returns the underlying byte region.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
