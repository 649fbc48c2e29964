//! Shared orchestration for the aggregation strategies.
//!
//! `AggregatorCore` owns the declared specs, the resolved column indices,
//! and the heterogeneous aggregate function list. On the first batch it
//! prepends one group builder per grouping column (in declared order) ahead
//! of the user aggregates, so every group's slot vector starts with the
//! captured key values and the output columns come out in the declared
//! order. The strategies own only their group map.

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{Field, Schema, SchemaRef};
use vexel_result::{Error, Result};

use crate::factory::agg_func_for;
use crate::funcs::AggFunc;
use crate::slot::Slot;
use crate::{AggFuncDef, AggFuncKind};

pub(crate) struct AggregatorCore {
    groupby_col_names: Vec<String>,
    agg_col_names: Vec<String>,
    input_specs: Vec<AggFuncDef>,
    specs: Vec<AggFuncDef>,
    pub(crate) groupby_col_indices: Vec<usize>,
    agg_col_indices: Vec<usize>,
    func_col_indices: Vec<Option<usize>>,
    pub(crate) funcs: Vec<Box<dyn AggFunc>>,
}

impl AggregatorCore {
    pub(crate) fn new(
        groupby_cols: Vec<String>,
        agg_cols: Vec<String>,
        agg_funcs: Vec<AggFuncDef>,
    ) -> Self {
        Self {
            groupby_col_names: groupby_cols,
            agg_col_names: agg_cols,
            input_specs: agg_funcs,
            specs: Vec::new(),
            groupby_col_indices: Vec::new(),
            agg_col_indices: Vec::new(),
            func_col_indices: Vec::new(),
            funcs: Vec::new(),
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        !self.funcs.is_empty()
    }

    /// Resolves column indices and instantiates the function list on the
    /// first batch; later calls are no-ops.
    pub(crate) fn ensure_init(&mut self, schema: &SchemaRef) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        self.groupby_col_indices = lookup_col_indices(&self.groupby_col_names, schema)?;
        self.agg_col_indices = lookup_col_indices(&self.agg_col_names, schema)?;

        let mut specs = Vec::with_capacity(self.agg_col_names.len() + self.input_specs.len());
        for col_name in &self.agg_col_names {
            specs.push(AggFuncDef::new(
                AggFuncKind::GroupBuilder,
                col_name.clone(),
                col_name.clone(),
            ));
        }
        specs.extend(self.input_specs.iter().cloned());

        tracing::debug!(
            group_cols = self.groupby_col_names.len(),
            aggregates = self.input_specs.len(),
            "binding aggregate functions to the input schema"
        );

        let mut funcs = Vec::with_capacity(specs.len());
        let mut func_col_indices = Vec::with_capacity(specs.len());
        for spec in &specs {
            funcs.push(agg_func_for(spec, schema)?);
            let col_idx = if spec.column.is_empty() {
                None
            } else {
                Some(schema.index_of(&spec.column).map_err(|_| {
                    Error::InvalidArgumentError(format!("column not found: {}", spec.column))
                })?)
            };
            func_col_indices.push(col_idx);
        }

        self.specs = specs;
        self.funcs = funcs;
        self.func_col_indices = func_col_indices;
        Ok(())
    }

    /// Re-binds every function's cursor to the current batch's columns.
    pub(crate) fn bind_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        if batch.num_columns() == 0 {
            return Err(Error::InvalidArgumentError(
                "record batch must contain at least one column".into(),
            ));
        }
        for (func, col_idx) in self.funcs.iter_mut().zip(&self.func_col_indices) {
            let array = match col_idx {
                Some(idx) => batch.column(*idx),
                None => batch.column(0),
            };
            func.bind_column(array)?;
        }
        Ok(())
    }

    pub(crate) fn num_funcs(&self) -> usize {
        self.funcs.len()
    }

    /// Length of the group-builder prefix in the function list.
    pub(crate) fn agg_start(&self) -> usize {
        self.agg_col_indices.len()
    }

    /// Initializes a freshly created group: every function, group builders
    /// included, creates its slot from the representative row.
    pub(crate) fn init_entry(&mut self, row_idx: usize, entry: &mut Vec<Slot>) -> Result<()> {
        for func in self.funcs.iter_mut() {
            entry.push(func.init_row(row_idx)?);
        }
        Ok(())
    }

    /// Folds the current row into an existing group. The group-builder
    /// prefix is skipped: builders captured their value when the group was
    /// created and their cursors never advance.
    pub(crate) fn update_entry(&mut self, entry: &mut [Slot]) -> Result<()> {
        for idx in self.agg_start()..self.funcs.len() {
            self.funcs[idx].update_row(&mut entry[idx])?;
        }
        Ok(())
    }

    pub(crate) fn reserve(&mut self, num_groups: usize) {
        for func in self.funcs.iter_mut() {
            func.reserve(num_groups);
        }
    }

    pub(crate) fn summarize_entry(&mut self, entry: &[Slot]) -> Result<()> {
        for (idx, func) in self.funcs.iter_mut().enumerate() {
            func.summarize(&entry[idx])?;
        }
        Ok(())
    }

    /// Assembles the result batch. Output types are read after
    /// summarization so a decimal promotion is reflected in the schema.
    pub(crate) fn assemble(&mut self) -> Result<RecordBatch> {
        if self.funcs.is_empty() {
            return Err(Error::InvalidArgumentError(
                "finish() requires at least one consumed batch".into(),
            ));
        }
        let mut fields = Vec::with_capacity(self.funcs.len());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.funcs.len());
        for (func, spec) in self.funcs.iter_mut().zip(&self.specs) {
            fields.push(Field::new(spec.alias.clone(), func.output_type(), true));
            columns.push(func.finish()?);
        }
        let schema = Arc::new(Schema::new(fields));
        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

fn lookup_col_indices(col_names: &[String], schema: &SchemaRef) -> Result<Vec<usize>> {
    col_names
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .map_err(|_| Error::InvalidArgumentError(format!("column not found: {name}")))
        })
        .collect()
}
