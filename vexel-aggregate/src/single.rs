//! Hash aggregation specialized for a single numeric grouping column.

use arrow::array::RecordBatch;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use vexel_cursor::{key_cursor_for, Cursor, KeyCursor};
use vexel_result::{Error, Result};

use crate::base::AggregatorCore;
use crate::slot::Slot;
use crate::AggFuncDef;

/// Aggregator for exactly one grouping column of a fixed-width numeric,
/// boolean, or temporal type.
///
/// The group key is the column's raw 64-bit token, so the map stays dense
/// and hashing is a single integer hash. Rows with a null key are diverted
/// into an out-of-band null group beside the map, which preserves SQL
/// `GROUP BY` null equality without polluting the numeric key space; that
/// group is summarized last.
pub struct SingleNumericalHashAggregate {
    core: AggregatorCore,
    key_cursor: Option<Box<dyn KeyCursor>>,
    groups: FxHashMap<u64, Vec<Slot>>,
    null_group: Option<Vec<Slot>>,
}

impl SingleNumericalHashAggregate {
    pub fn new(
        groupby_cols: Vec<String>,
        agg_cols: Vec<String>,
        agg_funcs: Vec<AggFuncDef>,
    ) -> Self {
        Self {
            core: AggregatorCore::new(groupby_cols, agg_cols, agg_funcs),
            key_cursor: None,
            groups: FxHashMap::default(),
            null_group: None,
        }
    }

    pub fn consume(&mut self, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();
        self.core.ensure_init(&schema)?;

        if self.key_cursor.is_none() {
            if self.core.groupby_col_indices.len() != 1 {
                return Err(Error::InvalidArgumentError(
                    "single-key aggregation requires exactly one grouping column".into(),
                ));
            }
            let key_idx = self.core.groupby_col_indices[0];
            self.key_cursor = Some(key_cursor_for(schema.field(key_idx).data_type())?);
        }

        self.core.bind_batch(batch)?;
        let key_idx = self.core.groupby_col_indices[0];
        let key_cursor = self
            .key_cursor
            .as_mut()
            .ok_or_else(|| Error::Internal("key cursor missing after init".into()))?;
        key_cursor.bind(batch.column(key_idx))?;

        for row in 0..batch.num_rows() {
            // The null bit must be read before the token consumes the position.
            let is_null = key_cursor.is_null_current();
            let token = key_cursor.next_as_u64();

            if is_null {
                match &mut self.null_group {
                    Some(entry) => self.core.update_entry(entry)?,
                    None => {
                        let mut entry = Vec::with_capacity(self.core.num_funcs());
                        self.core.init_entry(row, &mut entry)?;
                        self.null_group = Some(entry);
                    }
                }
            } else {
                match self.groups.entry(token) {
                    Entry::Occupied(mut occupied) => self.core.update_entry(occupied.get_mut())?,
                    Entry::Vacant(vacant) => {
                        let mut entry = Vec::with_capacity(self.core.num_funcs());
                        self.core.init_entry(row, &mut entry)?;
                        vacant.insert(entry);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<RecordBatch> {
        let num_groups = self.groups.len() + usize::from(self.null_group.is_some());
        self.core.reserve(num_groups);

        for entry in self.groups.values() {
            self.core.summarize_entry(entry)?;
        }
        if let Some(entry) = &self.null_group {
            self.core.summarize_entry(entry)?;
        }

        self.core.assemble()
    }
}
