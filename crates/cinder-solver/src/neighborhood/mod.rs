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

pub mod aggregation;
pub mod binary;
pub mod chain;
pub mod integer;
pub mod mv;
pub mod selection;
pub mod structural;
pub mod two_flip;
pub mod user_defined;

pub use mv::{Move, MoveSense, MoveStorage};

use crate::option::SolverOptions;
use aggregation::AggregationMoveGenerator;
use binary::BinaryMoveGenerator;
use chain::ChainMoveGenerator;
use cinder_model::ids::VariableId;
use cinder_model::model::Model;
use integer::IntegerMoveGenerator;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use selection::SelectionMoveGenerator;
use structural::{
    ConstantRatioIntegersMoveGenerator, ExclusiveNorMoveGenerator, ExclusiveOrMoveGenerator,
    PairStepMoveGenerator, SoftSelectionMoveGenerator, TrinomialExclusiveNorMoveGenerator,
    VariableBoundMoveGenerator,
};
use two_flip::TwoFlipMoveGenerator;
use user_defined::{MoveProducer, UserDefinedMoveGenerator};

/// The generator a candidate move lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Binary,
    Integer,
    Selection,
    Aggregation,
    Precedence,
    VariableBound,
    ExclusiveOr,
    ExclusiveNor,
    TrinomialExclusiveNor,
    InvertedIntegers,
    BalancedIntegers,
    ConstantSumIntegers,
    ConstantDifferenceIntegers,
    ConstantRatioIntegers,
    SoftSelection,
    TwoFlip,
    Chain,
    UserDefined,
}

/// Cheap handle to one surviving candidate slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRef {
    pub kind: GeneratorKind,
    pub slot: u32,
}

#[derive(Debug, Clone, Copy)]
struct EnabledGenerators {
    binary: bool,
    integer: bool,
    aggregation: bool,
    precedence: bool,
    variable_bound: bool,
    exclusive_or: bool,
    exclusive_nor: bool,
    inverted_integers: bool,
    balanced_integers: bool,
    constant_sum_integers: bool,
    constant_difference_integers: bool,
    constant_ratio_integers: bool,
    soft_selection: bool,
    chain: bool,
    two_flip: bool,
    user_defined: bool,
}

impl EnabledGenerators {
    fn from_options(options: &SolverOptions) -> Self {
        Self {
            binary: options.is_enabled_binary_move,
            integer: options.is_enabled_integer_move,
            aggregation: options.is_enabled_aggregation_move,
            precedence: options.is_enabled_precedence_move,
            variable_bound: options.is_enabled_variable_bound_move,
            exclusive_or: options.is_enabled_exclusive_or_move,
            exclusive_nor: options.is_enabled_exclusive_nor_move,
            inverted_integers: options.is_enabled_inverted_integers_move,
            balanced_integers: options.is_enabled_balanced_integers_move,
            constant_sum_integers: options.is_enabled_constant_sum_integers_move,
            constant_difference_integers: options.is_enabled_constant_difference_integers_move,
            constant_ratio_integers: options.is_enabled_constant_ratio_integers_move,
            soft_selection: options.is_enabled_soft_selection_move,
            chain: options.is_enabled_chain_move,
            two_flip: options.is_enabled_two_flip_move,
            user_defined: options.is_enabled_user_defined_move,
        }
    }
}

/// Owner of every move generator; flattens the surviving slots into one
/// candidate list per iteration.
#[derive(Debug)]
pub struct Neighborhood {
    binary: BinaryMoveGenerator,
    integer: IntegerMoveGenerator,
    selection: SelectionMoveGenerator,
    aggregation: AggregationMoveGenerator,
    precedence: PairStepMoveGenerator,
    variable_bound: VariableBoundMoveGenerator,
    exclusive_or: ExclusiveOrMoveGenerator,
    exclusive_nor: ExclusiveNorMoveGenerator,
    trinomial_exclusive_nor: TrinomialExclusiveNorMoveGenerator,
    inverted_integers: PairStepMoveGenerator,
    balanced_integers: PairStepMoveGenerator,
    constant_sum_integers: PairStepMoveGenerator,
    constant_difference_integers: PairStepMoveGenerator,
    constant_ratio_integers: ConstantRatioIntegersMoveGenerator,
    soft_selection: SoftSelectionMoveGenerator,
    two_flip: TwoFlipMoveGenerator,
    chain: ChainMoveGenerator,
    user_defined: UserDefinedMoveGenerator,
    enabled: EnabledGenerators,
    has_selections: bool,
    candidates: Vec<MoveRef>,
}

impl Neighborhood {
    pub fn new(model: &Model, options: &SolverOptions) -> Self {
        let enabled = EnabledGenerators::from_options(options);
        let mut neighborhood = Self {
            binary: BinaryMoveGenerator::default(),
            integer: IntegerMoveGenerator::default(),
            selection: SelectionMoveGenerator::default(),
            aggregation: AggregationMoveGenerator::default(),
            precedence: PairStepMoveGenerator::precedence(),
            variable_bound: VariableBoundMoveGenerator::default(),
            exclusive_or: ExclusiveOrMoveGenerator::default(),
            exclusive_nor: ExclusiveNorMoveGenerator::default(),
            trinomial_exclusive_nor: TrinomialExclusiveNorMoveGenerator::default(),
            inverted_integers: PairStepMoveGenerator::inverted_integers(),
            balanced_integers: PairStepMoveGenerator::balanced_integers(),
            constant_sum_integers: PairStepMoveGenerator::constant_sum_integers(),
            constant_difference_integers: PairStepMoveGenerator::constant_difference_integers(),
            constant_ratio_integers: ConstantRatioIntegersMoveGenerator::default(),
            soft_selection: SoftSelectionMoveGenerator::default(),
            two_flip: TwoFlipMoveGenerator::default(),
            chain: ChainMoveGenerator::new(
                options.chain_move_capacity,
                options.chain_move_reduce_mode,
                options.chain_move_overlap_rate_threshold,
            ),
            user_defined: UserDefinedMoveGenerator::default(),
            enabled,
            has_selections: !model.selections().is_empty(),
            candidates: Vec::new(),
        };
        neighborhood.setup(model);
        neighborhood
    }

    fn setup(&mut self, model: &Model) {
        if self.enabled.binary {
            self.binary.setup(model);
        }
        if self.enabled.integer {
            self.integer.setup(model);
        }
        if self.has_selections {
            self.selection.setup(model);
        }
        if self.enabled.aggregation {
            self.aggregation.setup(model);
        }
        if self.enabled.precedence {
            self.precedence.setup(model);
        }
        if self.enabled.variable_bound {
            self.variable_bound.setup(model);
        }
        if self.enabled.exclusive_or {
            self.exclusive_or.setup(model);
        }
        if self.enabled.exclusive_nor {
            self.exclusive_nor.setup(model);
            self.trinomial_exclusive_nor.setup(model);
        }
        if self.enabled.inverted_integers {
            self.inverted_integers.setup(model);
        }
        if self.enabled.balanced_integers {
            self.balanced_integers.setup(model);
        }
        if self.enabled.constant_sum_integers {
            self.constant_sum_integers.setup(model);
        }
        if self.enabled.constant_difference_integers {
            self.constant_difference_integers.setup(model);
        }
        if self.enabled.constant_ratio_integers {
            self.constant_ratio_integers.setup(model);
        }
        if self.enabled.soft_selection {
            self.soft_selection.setup(model);
        }
    }

    pub fn set_two_flip_pairs(&mut self, model: &Model, pairs: &[(VariableId, VariableId)]) {
        self.two_flip.setup(model, pairs);
    }

    pub fn set_user_defined_producer(&mut self, producer: MoveProducer) {
        self.user_defined.set_producer(producer);
    }

    /// Rewrites every enabled generator's slots against the current
    /// variable values and rebuilds the flattened candidate list.
    pub fn update_moves(
        &mut self,
        model: &Model,
        accept_all: bool,
        accept_objective_improvable: bool,
        accept_feasibility_improvable: bool,
        is_enabled_parallel: bool,
    ) {
        macro_rules! update {
            ($generator:expr) => {
                $generator.update_moves(
                    model,
                    accept_all,
                    accept_objective_improvable,
                    accept_feasibility_improvable,
                    is_enabled_parallel,
                )
            };
        }
        if self.enabled.binary {
            update!(self.binary);
        }
        if self.enabled.integer {
            update!(self.integer);
        }
        if self.has_selections {
            update!(self.selection);
        }
        if self.enabled.aggregation {
            update!(self.aggregation);
        }
        if self.enabled.precedence {
            update!(self.precedence);
        }
        if self.enabled.variable_bound {
            update!(self.variable_bound);
        }
        if self.enabled.exclusive_or {
            update!(self.exclusive_or);
        }
        if self.enabled.exclusive_nor {
            update!(self.exclusive_nor);
            update!(self.trinomial_exclusive_nor);
        }
        if self.enabled.inverted_integers {
            update!(self.inverted_integers);
        }
        if self.enabled.balanced_integers {
            update!(self.balanced_integers);
        }
        if self.enabled.constant_sum_integers {
            update!(self.constant_sum_integers);
        }
        if self.enabled.constant_difference_integers {
            update!(self.constant_difference_integers);
        }
        if self.enabled.constant_ratio_integers {
            update!(self.constant_ratio_integers);
        }
        if self.enabled.soft_selection {
            update!(self.soft_selection);
        }
        if self.enabled.two_flip {
            update!(self.two_flip);
        }
        if self.enabled.chain {
            update!(self.chain);
        }
        if self.enabled.user_defined {
            update!(self.user_defined);
        }
        self.collect_candidates();
    }

    fn collect_candidates(&mut self) {
        let mut candidates = std::mem::take(&mut self.candidates);
        candidates.clear();
        for (kind, storage) in self.storages() {
            for (slot, &flag) in storage.flags.iter().enumerate() {
                if flag == 1 {
                    candidates.push(MoveRef {
                        kind,
                        slot: slot as u32,
                    });
                }
            }
        }
        self.candidates = candidates;
    }

    fn storages(&self) -> [(GeneratorKind, &MoveStorage); 18] {
        [
            (GeneratorKind::Binary, self.binary.storage()),
            (GeneratorKind::Integer, self.integer.storage()),
            (GeneratorKind::Selection, self.selection.storage()),
            (GeneratorKind::Aggregation, self.aggregation.storage()),
            (GeneratorKind::Precedence, self.precedence.storage()),
            (GeneratorKind::VariableBound, self.variable_bound.storage()),
            (GeneratorKind::ExclusiveOr, self.exclusive_or.storage()),
            (GeneratorKind::ExclusiveNor, self.exclusive_nor.storage()),
            (
                GeneratorKind::TrinomialExclusiveNor,
                self.trinomial_exclusive_nor.storage(),
            ),
            (
                GeneratorKind::InvertedIntegers,
                self.inverted_integers.storage(),
            ),
            (
                GeneratorKind::BalancedIntegers,
                self.balanced_integers.storage(),
            ),
            (
                GeneratorKind::ConstantSumIntegers,
                self.constant_sum_integers.storage(),
            ),
            (
                GeneratorKind::ConstantDifferenceIntegers,
                self.constant_difference_integers.storage(),
            ),
            (
                GeneratorKind::ConstantRatioIntegers,
                self.constant_ratio_integers.storage(),
            ),
            (GeneratorKind::SoftSelection, self.soft_selection.storage()),
            (GeneratorKind::TwoFlip, self.two_flip.storage()),
            (GeneratorKind::Chain, self.chain.storage()),
            (GeneratorKind::UserDefined, self.user_defined.storage()),
        ]
    }

    #[inline]
    pub fn candidates(&self) -> &[MoveRef] {
        &self.candidates
    }

    pub fn shuffle_candidates(&mut self, rng: &mut ChaCha8Rng) {
        self.candidates.shuffle(rng);
    }

    /// Resolves a candidate handle to its move.
    pub fn get(&self, reference: MoveRef) -> &Move {
        let storage = match reference.kind {
            GeneratorKind::Binary => self.binary.storage(),
            GeneratorKind::Integer => self.integer.storage(),
            GeneratorKind::Selection => self.selection.storage(),
            GeneratorKind::Aggregation => self.aggregation.storage(),
            GeneratorKind::Precedence => self.precedence.storage(),
            GeneratorKind::VariableBound => self.variable_bound.storage(),
            GeneratorKind::ExclusiveOr => self.exclusive_or.storage(),
            GeneratorKind::ExclusiveNor => self.exclusive_nor.storage(),
            GeneratorKind::TrinomialExclusiveNor => self.trinomial_exclusive_nor.storage(),
            GeneratorKind::InvertedIntegers => self.inverted_integers.storage(),
            GeneratorKind::BalancedIntegers => self.balanced_integers.storage(),
            GeneratorKind::ConstantSumIntegers => self.constant_sum_integers.storage(),
            GeneratorKind::ConstantDifferenceIntegers => {
                self.constant_difference_integers.storage()
            }
            GeneratorKind::ConstantRatioIntegers => self.constant_ratio_integers.storage(),
            GeneratorKind::SoftSelection => self.soft_selection.storage(),
            GeneratorKind::TwoFlip => self.two_flip.storage(),
            GeneratorKind::Chain => self.chain.storage(),
            GeneratorKind::UserDefined => self.user_defined.storage(),
        };
        &storage.moves[reference.slot as usize]
    }

    #[inline]
    pub fn chain(&self) -> &ChainMoveGenerator {
        &self.chain
    }

    #[inline]
    pub fn chain_mut(&mut self) -> &mut ChainMoveGenerator {
        &mut self.chain
    }

    #[inline]
    pub fn is_chain_enabled(&self) -> bool {
        self.enabled.chain
    }
}
