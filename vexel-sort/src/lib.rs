//! In-memory sort operator sharing the aggregators' streaming contract.
//!
//! `Sort` accumulates every batch it is fed, and on `finish` concatenates
//! them, computes stable sort indices over the requested key columns, and
//! applies a take to produce a single reordered batch. Everything happens
//! in memory; there is no spill path.

use arrow::array::RecordBatch;
use arrow::compute::{concat_batches, lexsort_to_indices, take, SortColumn, SortOptions};
use vexel_result::{Error, Result};

/// Direction of one sort key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Accumulates record batches and emits one batch sorted by the given
/// `(column, order)` keys. Nulls sort last. The underlying sort is stable,
/// so rows equal under all keys keep their arrival order.
pub struct Sort {
    sort_cols: Vec<String>,
    sort_order: Vec<SortOrder>,
    batches: Vec<RecordBatch>,
}

impl Sort {
    pub fn new(cols: Vec<String>, order: Vec<SortOrder>) -> Self {
        Self {
            sort_cols: cols,
            sort_order: order,
            batches: Vec::new(),
        }
    }

    /// Accepts one batch. Batches are kept in arrival order until `finish`.
    pub fn consume(&mut self, batch: &RecordBatch) -> Result<()> {
        self.batches.push(batch.clone());
        Ok(())
    }

    /// Produces the single sorted batch.
    pub fn finish(&mut self) -> Result<RecordBatch> {
        if self.batches.is_empty() {
            return Err(Error::InvalidArgumentError(
                "finish() requires at least one consumed batch".into(),
            ));
        }
        if self.sort_cols.len() != self.sort_order.len() {
            return Err(Error::InvalidArgumentError(
                "each sort column needs exactly one sort order".into(),
            ));
        }

        let schema = self.batches[0].schema();
        let combined = concat_batches(&schema, &self.batches)?;

        let mut sort_columns = Vec::with_capacity(self.sort_cols.len());
        for (name, order) in self.sort_cols.iter().zip(&self.sort_order) {
            let idx = schema
                .index_of(name)
                .map_err(|_| Error::InvalidArgumentError(format!("column not found: {name}")))?;
            sort_columns.push(SortColumn {
                values: combined.column(idx).clone(),
                options: Some(SortOptions {
                    descending: matches!(order, SortOrder::Desc),
                    nulls_first: false,
                }),
            });
        }

        let indices = lexsort_to_indices(&sort_columns, None)?;
        let columns = combined
            .columns()
            .iter()
            .map(|column| take(column, &indices, None).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;

        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn batch(ids: Vec<Option<i64>>, names: Vec<&str>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(names)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn sorts_across_batches_ascending() {
        let mut sort = Sort::new(vec!["id".to_string()], vec![SortOrder::Asc]);
        sort.consume(&batch(vec![Some(3), Some(1)], vec!["c", "a"]))
            .unwrap();
        sort.consume(&batch(vec![Some(2)], vec!["b"])).unwrap();

        let sorted = sort.finish().unwrap();
        let ids = sorted
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(&ids.values()[..], &[1, 2, 3]);
    }

    #[test]
    fn nulls_sort_last() {
        let mut sort = Sort::new(vec!["id".to_string()], vec![SortOrder::Asc]);
        sort.consume(&batch(vec![None, Some(5)], vec!["n", "v"]))
            .unwrap();

        let sorted = sort.finish().unwrap();
        let ids = sorted
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert!(ids.is_valid(0));
        assert!(ids.is_null(1));
    }

    #[test]
    fn secondary_key_descends_and_sort_is_stable() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("lat", DataType::Float64, false),
            Field::new("lng", DataType::Float64, false),
            Field::new("row", DataType::Int64, false),
        ]));
        let make = |lat: Vec<f64>, lng: Vec<f64>, row: Vec<i64>| {
            RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(Float64Array::from(lat)),
                    Arc::new(Float64Array::from(lng)),
                    Arc::new(Int64Array::from(row)),
                ],
            )
            .unwrap()
        };

        let mut sort = Sort::new(
            vec!["lat".to_string(), "lng".to_string()],
            vec![SortOrder::Asc, SortOrder::Desc],
        );
        sort.consume(&make(
            vec![44.89, 44.89, 42.89],
            vec![14.23, 15.0, 15.89],
            vec![0, 1, 2],
        ))
        .unwrap();
        sort.consume(&make(vec![44.89], vec![14.23], vec![3])).unwrap();

        let sorted = sort.finish().unwrap();
        let rows = sorted
            .column(2)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        // 42.89 first, then 44.89 with lng descending; equal (lat, lng)
        // rows 0 and 3 keep arrival order.
        assert_eq!(&rows.values()[..], &[2, 1, 0, 3]);
    }

    #[test]
    fn unknown_sort_column_is_rejected() {
        let mut sort = Sort::new(vec!["missing".to_string()], vec![SortOrder::Asc]);
        sort.consume(&batch(vec![Some(1)], vec!["a"])).unwrap();
        assert!(matches!(
            sort.finish(),
            Err(Error::InvalidArgumentError(_))
        ));
    }
}
