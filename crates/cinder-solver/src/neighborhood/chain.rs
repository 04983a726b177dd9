// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use crate::option::ChainMoveReduceMode;
use crate::neighborhood::mv::{Move, MoveSense, MoveStorage};
use cinder_model::classification::ConstraintTag;
use cinder_model::model::Model;
use fixedbitset::FixedBitSet;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Constraint structures a learned chain must keep feasible to be worth
/// caching.
pub const CHAIN_EFFECTIVE_TAGS: [ConstraintTag; 6] = [
    ConstraintTag::SetPartitioning,
    ConstraintTag::SetPacking,
    ConstraintTag::SetCovering,
    ConstraintTag::Cardinality,
    ConstraintTag::InvariantKnapsack,
    ConstraintTag::MultipleCovering,
];

/// Bounded cache of composite moves learned during the run by
/// concatenating recent accepted moves.
#[derive(Debug, Clone)]
pub struct ChainMoveGenerator {
    storage: MoveStorage,
    capacity: usize,
    reduce_mode: ChainMoveReduceMode,
    overlap_rate_threshold: f64,
    seen_hashes: HashSet<u64>,
}

impl Default for ChainMoveGenerator {
    fn default() -> Self {
        Self {
            storage: MoveStorage::default(),
            capacity: crate::option::DEFAULT_CHAIN_MOVE_CAPACITY,
            reduce_mode: ChainMoveReduceMode::OverlapRate,
            overlap_rate_threshold: crate::option::DEFAULT_CHAIN_MOVE_OVERLAP_RATE_THRESHOLD,
            seen_hashes: HashSet::new(),
        }
    }
}

impl ChainMoveGenerator {
    pub fn new(
        capacity: usize,
        reduce_mode: ChainMoveReduceMode,
        overlap_rate_threshold: f64,
    ) -> Self {
        Self {
            capacity: capacity.max(1),
            reduce_mode,
            overlap_rate_threshold,
            ..Self::default()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Concatenates two accepted moves into one composite candidate.
    /// Returns false when the pair shares a variable or the composite is
    /// already cached.
    pub fn register(&mut self, first: &Move, second: &Move, model: &Model) -> bool {
        let shares_variable = first.alterations.iter().any(|&(id, _)| {
            second
                .alterations
                .iter()
                .any(|&(other_id, _)| other_id == id)
        });
        if shares_variable {
            return false;
        }

        let mut chained = Move::new(MoveSense::Chain);
        chained
            .alterations
            .extend(first.alterations.iter().copied());
        chained
            .alterations
            .extend(second.alterations.iter().copied());

        let hash = chained.state_hash();
        if !self.seen_hashes.insert(hash) {
            return false;
        }

        let mut related = first.related_constraint_ids.clone();
        related.extend_from_slice(&second.related_constraint_ids);
        related.sort_unstable();
        related.dedup();
        chained.related_constraint_ids = related;
        chained.is_special_neighborhood_move = true;
        chained.overlap_rate = compute_overlap_rate(&chained, model);

        self.storage.moves.push(chained);
        self.storage.flags.push(0);
        true
    }

    /// Shrinks the cache back to its capacity using the configured
    /// policy.
    pub fn reduce(&mut self, rng: &mut ChaCha8Rng) {
        if self.storage.len() <= self.capacity {
            return;
        }
        let mut moves = std::mem::take(&mut self.storage.moves);
        match self.reduce_mode {
            ChainMoveReduceMode::OverlapRate => {
                let threshold = self.overlap_rate_threshold;
                moves.retain(|mv| mv.overlap_rate <= threshold);
                if moves.len() > self.capacity {
                    moves.sort_by(|left, right| {
                        left.overlap_rate
                            .partial_cmp(&right.overlap_rate)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    moves.truncate(self.capacity);
                }
            }
            ChainMoveReduceMode::Shuffle => {
                moves.shuffle(rng);
                moves.truncate(self.capacity);
            }
        }
        self.seen_hashes = moves.iter().map(|mv| mv.state_hash()).collect();
        self.storage = MoveStorage::with_moves(moves);
    }

    pub fn update_moves(
        &mut self,
        model: &Model,
        accept_all: bool,
        accept_objective_improvable: bool,
        accept_feasibility_improvable: bool,
        is_enabled_parallel: bool,
    ) {
        self.storage.update_flags(
            model,
            accept_all,
            accept_objective_improvable,
            accept_feasibility_improvable,
            is_enabled_parallel,
        );
    }

    #[inline]
    pub fn storage(&self) -> &MoveStorage {
        &self.storage
    }
}

/// Mean pairwise Jaccard similarity of the altered variables' related
/// constraint sets.
pub fn compute_overlap_rate(mv: &Move, model: &Model) -> f64 {
    let variable_count = mv.alterations.len();
    if variable_count < 2 {
        return 0.0;
    }
    let universe = model.number_of_constraints();
    let bitsets: Vec<FixedBitSet> = mv
        .alterations
        .iter()
        .map(|&(variable_id, _)| {
            let mut bits = FixedBitSet::with_capacity(universe);
            for &constraint_id in model.variable(variable_id).related_constraint_ids() {
                bits.insert(constraint_id.index());
            }
            bits
        })
        .collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for left in 0..variable_count {
        for right in left + 1..variable_count {
            let intersection = bitsets[left].intersection(&bitsets[right]).count();
            let union = bitsets[left].union(&bitsets[right]).count();
            if union > 0 {
                total += intersection as f64 / union as f64;
            }
            pairs += 1;
        }
    }
    total / pairs as f64
}

/// True when the move touches at least one constraint of a
/// chain-effective structure and all such touched constraints are
/// currently feasible.
pub fn keeps_chain_effective_constraints_feasible(mv: &Move, model: &Model) -> bool {
    let mut touched_effective = false;
    for &constraint_id in &mv.related_constraint_ids {
        let constraint = model.constraint(constraint_id);
        if !constraint.is_enabled() {
            continue;
        }
        if CHAIN_EFFECTIVE_TAGS
            .iter()
            .any(|&tag| constraint.has_tag(tag))
        {
            touched_effective = true;
            if !constraint.is_feasible() {
                return false;
            }
        }
    }
    touched_effective
}
