//! Hash aggregation over several numeric grouping columns.

use arrow::array::RecordBatch;
use rustc_hash::{FxHashMap, FxHasher};
use std::collections::hash_map::Entry;
use std::hash::{Hash, Hasher};
use vexel_cursor::{key_cursor_for, Cursor, KeyCursor};
use vexel_result::Result;

use crate::base::AggregatorCore;
use crate::slot::Slot;
use crate::AggFuncDef;

/// One component of a composite key: the column's 64-bit token plus its
/// null bit. Two null components are equal regardless of their tokens.
#[derive(Debug)]
struct KeyPart {
    token: u64,
    is_null: bool,
}

impl PartialEq for KeyPart {
    fn eq(&self, other: &Self) -> bool {
        self.is_null == other.is_null && (self.is_null || self.token == other.token)
    }
}

impl Eq for KeyPart {}

/// Composite key over the grouping columns of one row, in declared order.
#[derive(Debug)]
struct MultiKey(Vec<KeyPart>);

impl PartialEq for MultiKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MultiKey {}

impl Hash for MultiKey {
    /// Order-sensitive boost-style combiner, seeded with the component
    /// count. Null components contribute a fixed zero. An unordered
    /// combiner (plain XOR) would collapse groups whose columns permute
    /// equal values, so order sensitivity is load-bearing here.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut seed = self.0.len() as u64;
        for part in &self.0 {
            let part_hash = if part.is_null {
                0
            } else {
                let mut hasher = FxHasher::default();
                hasher.write_u64(part.token);
                hasher.finish()
            };
            seed ^= part_hash
                .wrapping_add(0x9e37_79b9)
                .wrapping_add(seed << 6)
                .wrapping_add(seed >> 2);
        }
        state.write_u64(seed);
    }
}

/// Aggregator for N grouping columns, all of fixed-width numeric, boolean,
/// or temporal types. Null keys are encoded into the composite key itself
/// rather than diverted, so no out-of-band group is needed.
pub struct MultiNumericalHashAggregate {
    core: AggregatorCore,
    key_cursors: Vec<Box<dyn KeyCursor>>,
    groups: FxHashMap<MultiKey, Vec<Slot>>,
}

impl MultiNumericalHashAggregate {
    pub fn new(
        groupby_cols: Vec<String>,
        agg_cols: Vec<String>,
        agg_funcs: Vec<AggFuncDef>,
    ) -> Self {
        Self {
            core: AggregatorCore::new(groupby_cols, agg_cols, agg_funcs),
            key_cursors: Vec::new(),
            groups: FxHashMap::default(),
        }
    }

    pub fn consume(&mut self, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();
        self.core.ensure_init(&schema)?;

        if self.key_cursors.is_empty() {
            for idx in &self.core.groupby_col_indices {
                self.key_cursors
                    .push(key_cursor_for(schema.field(*idx).data_type())?);
            }
        }

        self.core.bind_batch(batch)?;
        for (cursor, idx) in self
            .key_cursors
            .iter_mut()
            .zip(&self.core.groupby_col_indices)
        {
            cursor.bind(batch.column(*idx))?;
        }

        for row in 0..batch.num_rows() {
            let mut parts = Vec::with_capacity(self.key_cursors.len());
            for cursor in self.key_cursors.iter_mut() {
                // Null bit first; the token read moves the cursor.
                let is_null = cursor.is_null_current();
                let token = cursor.next_as_u64();
                parts.push(KeyPart { token, is_null });
            }

            match self.groups.entry(MultiKey(parts)) {
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
