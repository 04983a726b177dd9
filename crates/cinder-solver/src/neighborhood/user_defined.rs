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

use crate::neighborhood::mv::{Move, MoveStorage};
use cinder_model::model::Model;
use std::sync::Arc;

pub type MoveProducer = Arc<dyn Fn(&Model) -> Vec<Move> + Send + Sync>;

/// Caller-supplied moves; the producer runs once per iteration and its
/// output passes through the same filter pipeline as every generator.
#[derive(Clone, Default)]
pub struct UserDefinedMoveGenerator {
    storage: MoveStorage,
    producer: Option<MoveProducer>,
}

impl std::fmt::Debug for UserDefinedMoveGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDefinedMoveGenerator")
            .field("moves", &self.storage.len())
            .field("has_producer", &self.producer.is_some())
            .finish()
    }
}

impl UserDefinedMoveGenerator {
    pub fn set_producer(&mut self, producer: MoveProducer) {
        self.producer = Some(producer);
    }

    pub fn update_moves(
        &mut self,
        model: &Model,
        accept_all: bool,
        accept_objective_improvable: bool,
        accept_feasibility_improvable: bool,
        is_enabled_parallel: bool,
    ) {
        if let Some(producer) = &self.producer {
            let moves = producer(model);
            self.storage = MoveStorage::with_moves(moves);
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighborhood::mv::MoveSense;
    use cinder_model::ids::VariableId;
    use cinder_model::selection::SelectionMode;

    #[test]
    fn test_producer_output_is_filtered() {
        let mut model = Model::new("m");
        let x = model.add_binary("x").unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[0]);

        let mut generator = UserDefinedMoveGenerator::default();
        generator.set_producer(Arc::new(|_model: &Model| {
            let mut up = Move::new(MoveSense::UserDefined);
            up.alterations.push((VariableId(0), 1));
            let mut out_of_bounds = Move::new(MoveSense::UserDefined);
            out_of_bounds.alterations.push((VariableId(0), 5));
            vec![up, out_of_bounds]
        }));

        generator.update_moves(&model, true, false, false, false);
        assert_eq!(generator.storage().flags, vec![1, 0]);
    }
}
