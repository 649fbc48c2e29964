//! Fallback hash aggregation over arbitrary grouping columns.

use arrow::array::RecordBatch;
use datafusion_common::ScalarValue;
use rustc_hash::{FxHashMap, FxHasher};
use std::collections::hash_map::Entry;
use std::hash::{Hash, Hasher};
use vexel_result::{Error, Result};

use crate::base::AggregatorCore;
use crate::slot::Slot;
use crate::AggFuncDef;

/// Composite key of boxed scalars, one per grouping column of one row.
///
/// Hashing and equality delegate to the scalar's own implementations,
/// combined with the same order-sensitive combiner the numeric multi-key
/// strategy uses; null scalars contribute a fixed zero, and typed null
/// scalars of the same type already compare equal, which is exactly SQL
/// `GROUP BY` null semantics.
#[derive(Debug)]
struct ScalarKey(Vec<ScalarValue>);

impl PartialEq for ScalarKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ScalarKey {}

impl Hash for ScalarKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut seed = self.0.len() as u64;
        for scalar in &self.0 {
            let scalar_hash = if scalar.is_null() {
                0
            } else {
                let mut hasher = FxHasher::default();
                scalar.hash(&mut hasher);
                hasher.finish()
            };
            seed ^= scalar_hash
                .wrapping_add(0x9e37_79b9)
                .wrapping_add(seed << 6)
                .wrapping_add(seed >> 2);
        }
        state.write_u64(seed);
    }
}

/// Aggregator for `GROUP BY` keys of any type — strings, binaries,
/// decimals, nested values. Keys are captured by random access, so this
/// strategy needs no key cursors; it trades the numeric strategies' dense
/// tokens for full type coverage.
pub struct GenericHashAggregate {
    core: AggregatorCore,
    groups: FxHashMap<ScalarKey, Vec<Slot>>,
}

impl GenericHashAggregate {
    pub fn new(
        groupby_cols: Vec<String>,
        agg_cols: Vec<String>,
        agg_funcs: Vec<AggFuncDef>,
    ) -> Self {
        Self {
            core: AggregatorCore::new(groupby_cols, agg_cols, agg_funcs),
            groups: FxHashMap::default(),
        }
    }

    pub fn consume(&mut self, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();
        self.core.ensure_init(&schema)?;
        self.core.bind_batch(batch)?;

        for row in 0..batch.num_rows() {
            let mut scalars = Vec::with_capacity(self.core.groupby_col_indices.len());
            for idx in &self.core.groupby_col_indices {
                let scalar = ScalarValue::try_from_array(batch.column(*idx).as_ref(), row)
                    .map_err(|e| Error::Internal(e.to_string()))?;
                scalars.push(scalar);
            }

            match self.groups.entry(ScalarKey(scalars)) {
                Entry::Occupied(mut occupied) => self.core.update_entry(occupied.get_mut())?,
                Entry::Vacant(vacant) => {
                    let mut entry = Vec::with_capacity(self.core.num_funcs());
                    self.core.init_entry(row, &mut entry)?;
                    vacant.insert(entry);
                }
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<RecordBatch> {
        self.core.reserve(self.groups.len());
        for entry in self.groups.values() {
            self.core.summarize_entry(entry)?;
        }
        self.core.assemble()
    }
}
