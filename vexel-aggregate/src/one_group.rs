//! Whole-input aggregation without a `GROUP BY`.

use arrow::array::RecordBatch;
use vexel_result::Result;

use crate::base::AggregatorCore;
use crate::slot::Slot;
use crate::AggFuncDef;

/// Collapses the entire input into a single row.
///
/// There is no per-row loop: the first batch creates one slot per function
/// with `init_batch`, and every batch (the first included) is folded in one
/// `update_batch` pass per function, letting each cursor drain itself. This
/// is the fastest path when the query has no grouping.
pub struct OneGroupAggregate {
    core: AggregatorCore,
    group: Vec<Slot>,
}

impl OneGroupAggregate {
    pub fn new(agg_funcs: Vec<AggFuncDef>) -> Self {
        Self {
            core: AggregatorCore::new(Vec::new(), Vec::new(), agg_funcs),
            group: Vec::new(),
        }
    }

    pub fn consume(&mut self, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();
        self.core.ensure_init(&schema)?;
        self.core.bind_batch(batch)?;

        if self.group.is_empty() {
            for func in self.core.funcs.iter_mut() {
                self.group.push(func.init_batch()?);
            }
        }

        for (func, slot) in self.core.funcs.iter_mut().zip(self.group.iter_mut()) {
            func.update_batch(slot)?;
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<RecordBatch> {
        self.core.reserve(1);
        self.core.summarize_entry(&self.group)?;
        self.core.assemble()
    }
}
