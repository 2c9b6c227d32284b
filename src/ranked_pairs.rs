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

//! Ranked-pairs (Tideman) tabulation: pairwise majority graph, strength-
//! ordered pair locking into a cycle-free graph, and round-by-round winner
//! extraction.

use crate::ballot::scan::{compare_by_ballot, PairOrdering};
use crate::ballot::BallotBuffer;
use crate::tiebreak::TieBreaker;
use crate::types::{CandidateId, Interrupt, RankedPairsRound, Tied};
use log::{debug, trace};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One edge of the pairwise majority graph, keyed by its unordered candidate
/// pair with `a < b`.
#[derive(Debug, Clone)]
struct PairEdge {
    a: CandidateId,
    b: CandidateId,
    /// Number of ballots that ordered the pair.
    ballots: u32,
    /// Signed sum of per-ballot preference signs; positive favours `a`.
    diff: i64,
    /// The majority winner of the pair, assigned after tie-breaking.
    winner: CandidateId,
}

impl PairEdge {
    fn strength(&self) -> u64 {
        self.diff.unsigned_abs()
    }

    fn loser(&self) -> CandidateId {
        if self.winner == self.a {
            self.b
        } else {
            self.a
        }
    }

    /// The pair in its reporting convention: the numerically smaller id is
    /// the right endpoint.
    fn as_pair(&self) -> (CandidateId, CandidateId) {
        (self.b, self.a)
    }

    fn shares_endpoint(&self, other: &PairEdge) -> bool {
        self.a == other.a || self.a == other.b || self.b == other.a || self.b == other.b
    }
}

/// Runs a ranked-pairs tabulation over the candidates in `included`,
/// returning the winners in election order together with the per-round
/// protocol.
///
/// Candidates mentioned on fewer than half the ballots are removed up front;
/// this is a fixed domain rule, independent of the configured mention
/// threshold that produced `included`. If at least half the ballots order no
/// pair at all, the tabulation is interrupted with
/// [`Interrupt::MajorityEmpty`].
pub fn ranked_pairs(
    buffer: &BallotBuffer,
    included: &[CandidateId],
    mentions: &BTreeMap<CandidateId, u32>,
    num_chosen: u32,
    tie_breaker: Option<&TieBreaker>,
) -> Result<(Vec<CandidateId>, Vec<RankedPairsRound<CandidateId>>), Interrupt> {
    assert!(num_chosen >= 1);
    let ballot_count = buffer.ballot_count();

    // Only candidates mentioned on at least half the ballots compete.
    let mut active: Vec<CandidateId> = included
        .iter()
        .copied()
        .filter(|c| 2 * mentions.get(c).copied().unwrap_or(0) as u64 >= ballot_count as u64)
        .collect();
    active.sort_unstable();
    debug!("Candidates mentioned on at least half the ballots: {active:?}");
    if active.is_empty() {
        return Err(Interrupt::MajorityEmpty);
    }

    let mut edges = apply_ballots(buffer, &active)?;
    assign_edge_winners(&mut edges, tie_breaker)?;

    let mut winners = Vec::new();
    let mut rounds = Vec::new();
    let target = (num_chosen as usize).min(active.len());
    while winners.len() < target {
        let round = run_round(&edges, &active, tie_breaker)?;
        debug!("Round {} winner: {}", rounds.len() + 1, round.winner);
        active.retain(|&c| c != round.winner);
        winners.push(round.winner);
        rounds.push(round);
    }

    Ok((winners, rounds))
}

/// Builds the pair graph over `active` and accumulates every ballot into it.
/// A ballot orders a pair only when it ranks both endpoints at distinct
/// ranks; ballots ordering no pair at all count as empty.
fn apply_ballots(
    buffer: &BallotBuffer,
    active: &[CandidateId],
) -> Result<Vec<PairEdge>, Interrupt> {
    let mut edges = Vec::with_capacity(active.len() * (active.len() - 1) / 2);
    for (i, &a) in active.iter().enumerate() {
        for &b in &active[i + 1..] {
            edges.push(PairEdge {
                a,
                b,
                ballots: 0,
                diff: 0,
                winner: 0,
            });
        }
    }

    let ballot_count = buffer.ballot_count();
    let mut empty = 0u32;
    for index in 0..ballot_count {
        let mut ordered_any = false;
        for edge in edges.iter_mut() {
            if let PairOrdering::Ranked(d) = compare_by_ballot(buffer, index, edge.a, edge.b) {
                if d != 0 {
                    edge.diff += i64::from(d.signum());
                    edge.ballots += 1;
                    ordered_any = true;
                }
            }
        }
        if !ordered_any {
            trace!("Ballot {index} orders no pair");
            empty += 1;
        }
    }

    if 2 * empty >= ballot_count {
        debug!("{empty} of {ballot_count} ballots order no pair");
        return Err(Interrupt::MajorityEmpty);
    }
    Ok(edges)
}

/// Assigns the majority winner of every contested edge, consulting the
/// tie-breaker for edges with a zero preference sum.
fn assign_edge_winners(
    edges: &mut [PairEdge],
    tie_breaker: Option<&TieBreaker>,
) -> Result<(), Interrupt> {
    for edge in edges.iter_mut() {
        if edge.ballots == 0 {
            continue;
        }
        edge.winner = if edge.diff > 0 {
            edge.a
        } else if edge.diff < 0 {
            edge.b
        } else {
            let tie_breaker = match tie_breaker {
                None => {
                    return Err(Interrupt::TieBreakerNeeded(Tied::Pairs(vec![edge
                        .as_pair()])))
                }
                Some(tie_breaker) => tie_breaker,
            };
            match (tie_breaker.rank(edge.a), tie_breaker.rank(edge.b)) {
                (Some(ra), Some(rb)) => {
                    if ra < rb {
                        edge.a
                    } else {
                        edge.b
                    }
                }
                (ra, rb) => {
                    let mut missing = Vec::new();
                    if ra.is_none() {
                        missing.push(edge.a);
                    }
                    if rb.is_none() {
                        missing.push(edge.b);
                    }
                    return Err(Interrupt::IncompleteTieBreaker(missing));
                }
            }
        };
        trace!(
            "Pair ({}, {}): {} ballots, diff {}, winner {}",
            edge.b,
            edge.a,
            edge.ballots,
            edge.diff,
            edge.winner
        );
    }
    Ok(())
}

/// Runs one round: orders the contested pairs among the active candidates,
/// locks them into a cycle-free graph and extracts the unique root.
fn run_round(
    edges: &[PairEdge],
    active: &[CandidateId],
    tie_breaker: Option<&TieBreaker>,
) -> Result<RankedPairsRound<CandidateId>, Interrupt> {
    let contested: Vec<&PairEdge> = edges
        .iter()
        .filter(|e| e.ballots > 0 && active.contains(&e.a) && active.contains(&e.b))
        .collect();

    let ordered = order_pairs(contested, tie_breaker)?;
    let ordered_pairs: Vec<(CandidateId, CandidateId)> =
        ordered.iter().map(|e| (e.winner, e.loser())).collect();

    let mut lock = LockGraph::new(active);
    let mut locked = Vec::new();
    for edge in &ordered {
        if lock.insert(edge.winner, edge.loser()) {
            locked.push((edge.winner, edge.loser()));
        } else {
            trace!(
                "Skipping pair ({}, {}): locking it would create a cycle",
                edge.winner,
                edge.loser()
            );
        }
    }

    let winner = match lock.roots().as_slice() {
        [] => panic!("lock graph has no root, which contradicts its acyclicity"),
        [root] => *root,
        roots => resolve_roots(&mut lock, roots, tie_breaker, &mut locked)?,
    };

    Ok(RankedPairsRound {
        winner,
        ordered_pairs,
        locked,
    })
}

/// Orders contested pairs by the strengthened Tideman rule: strength
/// (absolute preference sum) descending; within a band of equal strength,
/// pairs whose loser already lost an emitted pair first, then pairs whose
/// winner already won an emitted pair, then the rest, least tie-breaker
/// preferred loser first.
///
/// Without a tie-breaker, a band whose leftover pairs share no endpoint is
/// emitted in candidate order (their relative order cannot redirect the lock
/// graph); leftover pairs sharing an endpoint interrupt the tabulation with
/// the tied pairs.
fn order_pairs<'e>(
    mut contested: Vec<&'e PairEdge>,
    tie_breaker: Option<&TieBreaker>,
) -> Result<Vec<&'e PairEdge>, Interrupt> {
    contested.sort_by(|x, y| y.strength().cmp(&x.strength()));

    let mut ordered: Vec<&PairEdge> = Vec::with_capacity(contested.len());
    let mut emitted_winners: HashSet<CandidateId> = HashSet::new();
    let mut emitted_losers: HashSet<CandidateId> = HashSet::new();

    let mut start = 0;
    while start < contested.len() {
        let strength = contested[start].strength();
        let mut band: Vec<&PairEdge> = contested[start..]
            .iter()
            .take_while(|e| e.strength() == strength)
            .copied()
            .collect();
        start += band.len();

        while !band.is_empty() {
            let layer: Vec<usize> = {
                let losers: Vec<usize> = (0..band.len())
                    .filter(|&i| emitted_losers.contains(&band[i].loser()))
                    .collect();
                if !losers.is_empty() {
                    losers
                } else {
                    let winners: Vec<usize> = (0..band.len())
                        .filter(|&i| emitted_winners.contains(&band[i].winner))
                        .collect();
                    if !winners.is_empty() {
                        winners
                    } else {
                        (0..band.len()).collect()
                    }
                }
            };

            let pick = if layer.len() == 1 {
                layer[0]
            } else {
                match tie_breaker {
                    Some(tie_breaker) => pick_by_tie_breaker(&band, &layer, tie_breaker)?,
                    None => {
                        let conflicting = layer.iter().any(|&i| {
                            layer
                                .iter()
                                .any(|&j| i != j && band[i].shares_endpoint(band[j]))
                        });
                        if conflicting {
                            return Err(Interrupt::TieBreakerNeeded(Tied::Pairs(
                                layer.iter().map(|&i| band[i].as_pair()).collect(),
                            )));
                        }
                        layer[0]
                    }
                }
            };

            let edge = band.remove(pick);
            trace!(
                "Emitting pair ({}, {}) with strength {}",
                edge.winner,
                edge.loser(),
                edge.strength()
            );
            emitted_winners.insert(edge.winner);
            emitted_losers.insert(edge.loser());
            ordered.push(edge);
        }
    }
    Ok(ordered)
}

/// Picks the layer pair whose loser is least preferred by the tie-breaker
/// (breaking exact loser ties by least preferred winner).
fn pick_by_tie_breaker(
    band: &[&PairEdge],
    layer: &[usize],
    tie_breaker: &TieBreaker,
) -> Result<usize, Interrupt> {
    let mut missing: Vec<CandidateId> = layer
        .iter()
        .flat_map(|&i| [band[i].winner, band[i].loser()])
        .filter(|&c| tie_breaker.rank(c).is_none())
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        missing.dedup();
        return Err(Interrupt::IncompleteTieBreaker(missing));
    }

    Ok(layer
        .iter()
        .copied()
        .max_by_key(|&i| {
            (
                tie_breaker.rank(band[i].loser()).unwrap(),
                tie_breaker.rank(band[i].winner).unwrap(),
            )
        })
        .unwrap())
}

/// Resolves disjoint roots by inserting tie-breaker-directed edges between
/// every pair of roots; the unique root that remains is the round winner.
fn resolve_roots(
    lock: &mut LockGraph,
    roots: &[CandidateId],
    tie_breaker: Option<&TieBreaker>,
    locked: &mut Vec<(CandidateId, CandidateId)>,
) -> Result<CandidateId, Interrupt> {
    debug!("Disjoint lock graph roots: {roots:?}");
    let tie_breaker = match tie_breaker {
        None => {
            let mut pairs = Vec::new();
            for (i, &a) in roots.iter().enumerate() {
                for &b in &roots[i + 1..] {
                    pairs.push((a.max(b), a.min(b)));
                }
            }
            return Err(Interrupt::TieBreakerNeeded(Tied::Pairs(pairs)));
        }
        Some(tie_breaker) => tie_breaker,
    };

    let missing: Vec<CandidateId> = roots
        .iter()
        .copied()
        .filter(|&c| tie_breaker.rank(c).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(Interrupt::IncompleteTieBreaker(missing));
    }

    for (i, &a) in roots.iter().enumerate() {
        for &b in &roots[i + 1..] {
            let (winner, loser) = if tie_breaker.rank(a) < tie_breaker.rank(b) {
                (a, b)
            } else {
                (b, a)
            };
            if lock.insert(winner, loser) {
                locked.push((winner, loser));
            }
        }
    }

    match lock.roots().as_slice() {
        [root] => Ok(*root),
        roots => panic!("tie-breaker edges left {} roots", roots.len()),
    }
}

/// Directed graph over the active candidates, kept acyclic by construction:
/// an edge is only inserted when its reverse is not already reachable.
struct LockGraph {
    nodes: Vec<CandidateId>,
    index: HashMap<CandidateId, usize>,
    successors: Vec<Vec<usize>>,
    in_degree: Vec<u32>,
}

impl LockGraph {
    fn new(nodes: &[CandidateId]) -> Self {
        LockGraph {
            nodes: nodes.to_vec(),
            index: nodes.iter().enumerate().map(|(i, &c)| (c, i)).collect(),
            successors: vec![Vec::new(); nodes.len()],
            in_degree: vec![0; nodes.len()],
        }
    }

    /// Depth-first reachability; correct because the graph is acyclic.
    fn reachable(&self, from: usize, to: usize) -> bool {
        let mut stack = vec![from];
        let mut visited = vec![false; self.nodes.len()];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if visited[node] {
                continue;
            }
            visited[node] = true;
            stack.extend(&self.successors[node]);
        }
        false
    }

    /// Inserts the edge `winner -> loser` unless it would create a cycle.
    /// Returns whether the edge was inserted.
    fn insert(&mut self, winner: CandidateId, loser: CandidateId) -> bool {
        let w = self.index[&winner];
        let l = self.index[&loser];
        if self.reachable(l, w) {
            return false;
        }
        self.successors[w].push(l);
        self.in_degree[l] += 1;
        true
    }

    /// Returns the nodes without incoming edges.
    fn roots(&self) -> Vec<CandidateId> {
        (0..self.nodes.len())
            .filter(|&i| self.in_degree[i] == 0)
            .map(|i| self.nodes[i])
            .collect()
    }
}
