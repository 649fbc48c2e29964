//! Vexel: a columnar, push-based aggregation engine over Arrow record
//! batches.
//!
//! This crate is the primary entrypoint for the Vexel toolkit. It re-exports
//! the public surface of the underlying `vexel-*` crates so downstream code
//! sees a single interface for grouping, aggregation, sorting, and batch
//! re-chunking, with [`arrow::record_batch::RecordBatch`] as the interchange
//! format throughout.
//!
//! # Model
//!
//! The caller instantiates one operator, pushes record batches through
//! `consume`, and collects the single result batch from `finish`:
//!
//! - [`SingleNumericalHashAggregate`], [`MultiNumericalHashAggregate`], and
//!   [`GenericHashAggregate`] implement `GROUP BY` over one numeric key, N
//!   numeric keys, and arbitrary keys respectively. Strategy selection is
//!   the caller's job; all three agree on results wherever they overlap.
//! - [`OneGroupAggregate`] collapses the whole input into one row when
//!   there is no `GROUP BY`.
//! - [`Sort`] accumulates batches and emits one stably sorted batch.
//! - [`TableBatchReader`] slices an in-memory table into caller-sized
//!   chunks to feed the push-based operators.
//!
//! Aggregates follow SQL null semantics: null grouping keys collapse into
//! one null group, `COUNT` ignores null values while `COUNT(*)` does not,
//! and an aggregate that never saw a non-null value yields NULL. `SUM` over
//! 64-bit integers accumulates in 128 bits and promotes its output column
//! to `Decimal128(38, 0)` instead of overflowing.
//!
//! # Crate Topology
//!
//! - [`vexel-aggregate`](vexel_aggregate): aggregate functions, the
//!   `(kind, type)` factory, and the four aggregation strategies.
//! - [`vexel-cursor`](vexel_cursor): null-aware typed cursors over Arrow
//!   arrays, with 64-bit key tokens for the numeric strategies.
//! - [`vexel-hugeint`](vexel_hugeint): the signed 128-bit integer behind
//!   overflow-safe `SUM` and `AVG`.
//! - [`vexel-sort`](vexel_sort) and [`vexel-table`](vexel_table): the sort
//!   operator and the table re-chunking reader.
//! - [`vexel-result`](vexel_result): the unified error type.

pub use vexel_aggregate::{
    agg_func_for, AggFunc, AggFuncDef, AggFuncKind, GenericHashAggregate,
    MultiNumericalHashAggregate, OneGroupAggregate, SingleNumericalHashAggregate, Slot,
};
pub use vexel_hugeint::HugeInt;
pub use vexel_result::{Error, Result};
pub use vexel_sort::{Sort, SortOrder};
pub use vexel_table::TableBatchReader;

pub use vexel_cursor as cursor;
