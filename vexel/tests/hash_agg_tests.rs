//! Integration tests for the aggregation strategies over a shared fixture.
//!
//! Each test feeds the fixture table through an aggregator in two chunks,
//! sorts the result for determinism, and checks the grouped values. Where
//! several strategies admit the same key types, the tests assert that they
//! produce identical batches.

use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, Date64Array, Float64Array, Int8Array, Int64Array, PrimitiveArray,
    RecordBatch, StringArray, Time32MillisecondArray, TimestampMillisecondArray, UInt64Array,
};
use arrow::compute::{lexsort_to_indices, take, SortColumn, SortOptions};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Decimal128Type, Field, Float32Type, Float64Type, Int8Type,
    Int64Type, Schema, Time32MillisecondType, TimeUnit, TimestampMillisecondType, UInt64Type,
};
use vexel::{
    AggFuncDef, AggFuncKind, Error, GenericHashAggregate, MultiNumericalHashAggregate,
    OneGroupAggregate, SingleNumericalHashAggregate, TableBatchReader,
};

trait Aggregate {
    fn consume(&mut self, batch: &RecordBatch) -> vexel::Result<()>;
    fn finish(&mut self) -> vexel::Result<RecordBatch>;
}

macro_rules! impl_aggregate {
    ($($t:ty),*) => {$(
        impl Aggregate for $t {
            fn consume(&mut self, batch: &RecordBatch) -> vexel::Result<()> {
                <$t>::consume(self, batch)
            }

            fn finish(&mut self) -> vexel::Result<RecordBatch> {
                <$t>::finish(self)
            }
        }
    )*};
}

impl_aggregate!(
    SingleNumericalHashAggregate,
    MultiNumericalHashAggregate,
    GenericHashAggregate,
    OneGroupAggregate
);

/// 8-row fixture with null patterns across string, boolean, float, int8,
/// and temporal columns.
fn test_table() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("timestamp_int64", DataType::Int64, true),
        Field::new("date", DataType::Utf8, true),
        Field::new("is_vendor", DataType::Boolean, true),
        Field::new("city_from", DataType::Utf8, true),
        Field::new("lat", DataType::Float64, false),
        Field::new("lng", DataType::Float64, false),
        Field::new("total", DataType::Float64, true),
        Field::new("grp_int8", DataType::Int8, true),
        Field::new("grp_neg_int8", DataType::Int8, true),
        Field::new("date64", DataType::Date64, true),
        Field::new("time32", DataType::Time32(TimeUnit::Millisecond), true),
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            true,
        ),
        Field::new("grp_neg_int64", DataType::Int64, false),
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5, 6, 7, 8])),
            Arc::new(Int64Array::from(vec![
                Some(1602127614),
                Some(1602217613),
                Some(1602304012),
                Some(1602390411),
                None,
                Some(1602563209),
                None,
                Some(1602736007),
            ])),
            Arc::new(StringArray::from(vec![
                None,
                Some("2020-10-09T04:26:53"),
                Some("2020-10-10T04:26:52"),
                Some("2020-10-11T04:26:51"),
                Some("2020-10-12T04:26:50"),
                Some("2020-10-13T04:26:49"),
                None,
                Some("2020-10-15T04:26:47"),
            ])),
            Arc::new(BooleanArray::from(vec![
                Some(true),
                Some(true),
                Some(false),
                None,
                Some(true),
                None,
                None,
                None,
            ])),
            Arc::new(StringArray::from(vec![
                None,
                Some("Munich"),
                None,
                Some("San Francisco"),
                Some("Berlin"),
                Some("Munich"),
                Some("Berlin"),
                Some("Berlin"),
            ])),
            Arc::new(Float64Array::from(vec![
                52.51, 48.51, 44.89, 42.89, 44.89, 48.51, 44.89, 52.51,
            ])),
            Arc::new(Float64Array::from(vec![
                13.66, 12.3, 14.23, 15.89, 14.23, 12.3, 14.23, 13.66,
            ])),
            Arc::new(Float64Array::from(vec![
                None,
                Some(143.15),
                Some(33.4),
                Some(53.1),
                None,
                None,
                Some(33.4),
                None,
            ])),
            Arc::new(Int8Array::from(vec![
                None,
                Some(2),
                None,
                Some(3),
                Some(1),
                Some(2),
                Some(1),
                Some(1),
            ])),
            Arc::new(Int8Array::from(vec![
                None,
                Some(-1),
                None,
                Some(3),
                Some(1),
                Some(-1),
                Some(1),
                Some(1),
            ])),
            Arc::new(Date64Array::from(vec![
                None,
                Some(1611664426386),
                Some(1611664426519),
                Some(1611664416382),
                None,
                Some(1611664426519),
                Some(1611664416382),
                Some(1611664426386),
            ])),
            Arc::new(Time32MillisecondArray::from(vec![
                None,
                Some(7),
                None,
                Some(7),
                Some(41),
                Some(130),
                None,
                Some(130),
            ])),
            Arc::new(TimestampMillisecondArray::from(vec![
                Some(1611664420588),
                Some(1611663913570),
                None,
                Some(1611664414385),
                Some(1611664420588),
                None,
                None,
                Some(1611664414385),
            ])),
            Arc::new(Int64Array::from(vec![
                -9223372036854775807,
                -9223372036854775806,
                9223372036854775807,
                -9223372036854775807,
                9223372036854775806,
                9223372036854775806,
                9223372036854775807,
                -9223372036854775806,
            ])),
        ],
    )
    .unwrap()
}

fn overflow_table() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("int_64", DataType::Int64, true),
        Field::new("uint_64", DataType::UInt64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 1, 1, 2, 2, 1, 1])),
            Arc::new(Int64Array::from(vec![
                Some(9223372036854775807),
                Some(9223372036854775806),
                Some(9223372036854775805),
                Some(9223372036854775804),
                None,
                Some(9223372036854775802),
                None,
                Some(9223372036854775799),
            ])),
            Arc::new(UInt64Array::from(vec![
                Some(18446744073709551615),
                Some(18446744073709551614),
                Some(18446744073709551613),
                Some(18446744073709551612),
                None,
                Some(18446744073709551610),
                None,
                Some(18446744073709551608),
            ])),
        ],
    )
    .unwrap()
}

/// Feeds the table in two chunks, mimicking a streamed scan.
fn aggregate_in_two_chunks(agg: &mut dyn Aggregate, table: &RecordBatch) -> RecordBatch {
    let mid = table.num_rows() / 2;
    let mut reader = TableBatchReader::new(vec![table.clone()]);
    if mid > 0 {
        reader.set_batch_size(mid);
    }
    for chunk in reader {
        agg.consume(&chunk).unwrap();
    }
    agg.finish().unwrap()
}

/// Group maps iterate in arbitrary order; sort the result for assertions.
fn sort_by_columns(batch: &RecordBatch, col_indices: &[usize]) -> RecordBatch {
    if batch.num_rows() == 0 {
        return batch.clone();
    }
    let sort_columns: Vec<SortColumn> = col_indices
        .iter()
        .map(|idx| SortColumn {
            values: batch.column(*idx).clone(),
            options: Some(SortOptions {
                descending: false,
                nulls_first: false,
            }),
        })
        .collect();
    let indices = lexsort_to_indices(&sort_columns, None).unwrap();
    let columns = batch
        .columns()
        .iter()
        .map(|column| take(column, &indices, None).unwrap())
        .collect();
    RecordBatch::try_new(batch.schema(), columns).unwrap()
}

fn primitive_values<T: ArrowPrimitiveType>(
    batch: &RecordBatch,
    idx: usize,
) -> Vec<Option<T::Native>> {
    let col = batch
        .column(idx)
        .as_any()
        .downcast_ref::<PrimitiveArray<T>>()
        .unwrap();
    (0..col.len())
        .map(|i| col.is_valid(i).then(|| col.value(i)))
        .collect()
}

fn str_values(batch: &RecordBatch, idx: usize) -> Vec<Option<String>> {
    let col = batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    (0..col.len())
        .map(|i| col.is_valid(i).then(|| col.value(i).to_string()))
        .collect()
}

fn bool_values(batch: &RecordBatch, idx: usize) -> Vec<Option<bool>> {
    let col = batch
        .column(idx)
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    (0..col.len())
        .map(|i| col.is_valid(i).then(|| col.value(i)))
        .collect()
}

fn assert_f64_near(actual: &[Option<f64>], expected: &[Option<f64>]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        match (a, e) {
            (Some(a), Some(e)) => {
                let tolerance = 1e-9 * e.abs().max(1.0);
                assert!((a - e).abs() <= tolerance, "expected {e}, got {a}");
            }
            (None, None) => {}
            other => panic!("null pattern mismatch: {other:?}"),
        }
    }
}

fn assert_batches_identical(a: &RecordBatch, b: &RecordBatch) {
    assert_eq!(a.schema(), b.schema());
    assert_eq!(a.num_rows(), b.num_rows());
    for (col_a, col_b) in a.columns().iter().zip(b.columns()) {
        assert_eq!(col_a.to_data(), col_b.to_data());
    }
}

fn double_arg_funcs() -> Vec<AggFuncDef> {
    vec![
        AggFuncDef::count_star("count"),
        AggFuncDef::new(AggFuncKind::Count, "total", "count_total"),
        AggFuncDef::new(AggFuncKind::Min, "lat", "min_lat"),
        AggFuncDef::new(AggFuncKind::Max, "lat", "max_lat"),
        AggFuncDef::new(AggFuncKind::Sum, "lat", "sum_lat"),
        AggFuncDef::new(AggFuncKind::Avg, "lat", "avg_lat"),
    ]
}

fn assert_double_arg_result(result: &RecordBatch) {
    assert_eq!(
        primitive_values::<UInt64Type>(result, 1),
        vec![Some(3), Some(2), Some(1), Some(2)]
    );
    assert_eq!(
        primitive_values::<UInt64Type>(result, 2),
        vec![Some(1), Some(1), Some(1), Some(1)]
    );
    assert_f64_near(
        &primitive_values::<Float64Type>(result, 3),
        &[Some(44.89), Some(48.51), Some(42.89), Some(44.89)],
    );
    assert_f64_near(
        &primitive_values::<Float64Type>(result, 4),
        &[Some(52.51), Some(48.51), Some(42.89), Some(52.51)],
    );
    assert_f64_near(
        &primitive_values::<Float64Type>(result, 5),
        &[Some(142.29), Some(97.02), Some(42.89), Some(97.4)],
    );
    assert_f64_near(
        &primitive_values::<Float64Type>(result, 6),
        &[Some(47.43), Some(48.51), Some(42.89), Some(48.7)],
    );
}

#[test]
fn generic_string_group_with_double_args() {
    let table = test_table();
    let mut agg = GenericHashAggregate::new(
        vec!["city_from".to_string()],
        vec!["city_from".to_string()],
        double_arg_funcs(),
    );

    let result = sort_by_columns(&aggregate_in_two_chunks(&mut agg, &table), &[0]);

    let schema = result.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec![
            "city_from",
            "count",
            "count_total",
            "min_lat",
            "max_lat",
            "sum_lat",
            "avg_lat"
        ]
    );
    assert_eq!(
        str_values(&result, 0),
        vec![
            Some("Berlin".to_string()),
            Some("Munich".to_string()),
            Some("San Francisco".to_string()),
            None
        ]
    );
    assert_double_arg_result(&result);
}

#[test]
fn int8_group_diverts_null_keys_under_single_and_multi() {
    let table = test_table();
    let cols = vec!["grp_int8".to_string()];

    let mut single = SingleNumericalHashAggregate::new(cols.clone(), cols.clone(), double_arg_funcs());
    let mut multi = MultiNumericalHashAggregate::new(cols.clone(), cols.clone(), double_arg_funcs());

    let single_result = sort_by_columns(&aggregate_in_two_chunks(&mut single, &table), &[0]);
    let multi_result = sort_by_columns(&aggregate_in_two_chunks(&mut multi, &table), &[0]);

    assert_eq!(
        primitive_values::<Int8Type>(&single_result, 0),
        vec![Some(1), Some(2), Some(3), None]
    );
    assert_double_arg_result(&single_result);
    assert_batches_identical(&single_result, &multi_result);
}

#[test]
fn all_strategies_agree_on_a_double_key() {
    let table = test_table();
    let cols = vec!["lat".to_string()];
    let funcs = vec![
        AggFuncDef::count_star("count"),
        AggFuncDef::new(AggFuncKind::Min, "id", "min_id"),
        AggFuncDef::new(AggFuncKind::Max, "id", "max_id"),
        AggFuncDef::new(AggFuncKind::Sum, "id", "sum_id"),
        AggFuncDef::new(AggFuncKind::Avg, "id", "avg_id"),
    ];

    let mut single = SingleNumericalHashAggregate::new(cols.clone(), cols.clone(), funcs.clone());
    let mut multi = MultiNumericalHashAggregate::new(cols.clone(), cols.clone(), funcs.clone());
    let mut generic = GenericHashAggregate::new(cols.clone(), cols.clone(), funcs.clone());

    let single_result = sort_by_columns(&aggregate_in_two_chunks(&mut single, &table), &[0]);
    let multi_result = sort_by_columns(&aggregate_in_two_chunks(&mut multi, &table), &[0]);
    let generic_result = sort_by_columns(&aggregate_in_two_chunks(&mut generic, &table), &[0]);

    assert_f64_near(
        &primitive_values::<Float64Type>(&single_result, 0),
        &[Some(42.89), Some(44.89), Some(48.51), Some(52.51)],
    );
    assert_eq!(
        primitive_values::<UInt64Type>(&single_result, 1),
        vec![Some(1), Some(3), Some(2), Some(2)]
    );
    assert_eq!(
        primitive_values::<Int64Type>(&single_result, 2),
        vec![Some(4), Some(3), Some(2), Some(1)]
    );
    assert_eq!(
        primitive_values::<Int64Type>(&single_result, 3),
        vec![Some(4), Some(7), Some(6), Some(8)]
    );
    assert_eq!(
        primitive_values::<Int64Type>(&single_result, 4),
        vec![Some(4), Some(15), Some(8), Some(9)]
    );
    assert_f64_near(
        &primitive_values::<Float64Type>(&single_result, 5),
        &[Some(4.0), Some(5.0), Some(4.0), Some(4.5)],
    );

    assert_batches_identical(&single_result, &multi_result);
    assert_batches_identical(&single_result, &generic_result);
}

#[test]
fn sum_of_64_bit_integers_promotes_to_decimal128() {
    let table = overflow_table();
    let cols = vec!["id".to_string()];
    let mut agg = SingleNumericalHashAggregate::new(
        cols.clone(),
        cols,
        vec![
            AggFuncDef::new(AggFuncKind::Sum, "int_64", "sum_int64"),
            AggFuncDef::new(AggFuncKind::Sum, "uint_64", "sum_uint64"),
            AggFuncDef::new(AggFuncKind::Avg, "int_64", "avg_int64"),
            AggFuncDef::new(AggFuncKind::Avg, "uint_64", "avg_uint64"),
        ],
    );

    let result = sort_by_columns(&aggregate_in_two_chunks(&mut agg, &table), &[0]);

    assert_eq!(result.num_rows(), 2);
    assert_eq!(
        result.schema().field(1).data_type(),
        &DataType::Decimal128(38, 0)
    );
    assert_eq!(
        result.schema().field(2).data_type(),
        &DataType::Decimal128(38, 0)
    );
    assert_eq!(
        primitive_values::<Decimal128Type>(&result, 1),
        vec![Some(36893488147419103215), Some(18446744073709551608)]
    );
    assert_eq!(
        primitive_values::<Decimal128Type>(&result, 2),
        vec![Some(73786976294838206448), Some(36893488147419103224)]
    );
    assert_f64_near(
        &primitive_values::<Float64Type>(&result, 3),
        &[Some(9.223372036854776e18), Some(9.223372036854776e18)],
    );
    assert_f64_near(
        &primitive_values::<Float64Type>(&result, 4),
        &[Some(1.8446744073709552e19), Some(1.8446744073709552e19)],
    );
}

#[test]
fn one_group_collapses_the_whole_input() {
    let table = test_table();
    let mut agg = OneGroupAggregate::new(vec![
        AggFuncDef::count_star("count_star"),
        AggFuncDef::new(AggFuncKind::Count, "timestamp_int64", "count_int64"),
        AggFuncDef::new(AggFuncKind::Min, "timestamp_int64", "min_int64"),
        AggFuncDef::new(AggFuncKind::Max, "timestamp_int64", "max_int64"),
        AggFuncDef::new(AggFuncKind::Sum, "timestamp_int64", "sum_int64"),
        AggFuncDef::new(AggFuncKind::Avg, "timestamp_int64", "avg_int64"),
    ]);

    let result = aggregate_in_two_chunks(&mut agg, &table);

    assert_eq!(result.num_rows(), 1);
    assert_eq!(primitive_values::<UInt64Type>(&result, 0), vec![Some(8)]);
    assert_eq!(primitive_values::<UInt64Type>(&result, 1), vec![Some(6)]);
    assert_eq!(
        primitive_values::<Int64Type>(&result, 2),
        vec![Some(1602127614)]
    );
    assert_eq!(
        primitive_values::<Int64Type>(&result, 3),
        vec![Some(1602736007)]
    );
    assert_eq!(result.schema().field(4).data_type(), &DataType::Int64);
    assert_eq!(
        primitive_values::<Int64Type>(&result, 4),
        vec![Some(9614338866)]
    );
    assert_f64_near(
        &primitive_values::<Float64Type>(&result, 5),
        &[Some(1602389811.0)],
    );
}

#[test]
fn generic_boolean_group_keeps_a_null_group() {
    let table = test_table();
    let cols = vec!["is_vendor".to_string()];
    let mut agg = GenericHashAggregate::new(
        cols.clone(),
        cols,
        vec![
            AggFuncDef::count_star("count"),
            AggFuncDef::new(AggFuncKind::Min, "time32", "min_time32"),
            AggFuncDef::new(AggFuncKind::Max, "time32", "max_time32"),
            AggFuncDef::new(AggFuncKind::Sum, "time32", "sum_time32"),
            AggFuncDef::new(AggFuncKind::Avg, "time32", "avg_time32"),
        ],
    );

    // Group sizes are distinct, so sorting by the count column gives a
    // deterministic row order even with a null key present.
    let result = sort_by_columns(&aggregate_in_two_chunks(&mut agg, &table), &[1]);

    assert_eq!(result.num_rows(), 3);
    assert_eq!(
        bool_values(&result, 0),
        vec![Some(false), Some(true), None]
    );
    assert_eq!(
        primitive_values::<UInt64Type>(&result, 1),
        vec![Some(1), Some(3), Some(4)]
    );
    assert_eq!(
        result.schema().field(3).data_type(),
        &DataType::Time32(TimeUnit::Millisecond)
    );
    assert_eq!(
        primitive_values::<Time32MillisecondType>(&result, 2),
        vec![None, Some(7), Some(7)]
    );
    assert_eq!(
        primitive_values::<Time32MillisecondType>(&result, 3),
        vec![None, Some(41), Some(130)]
    );
    assert_eq!(
        primitive_values::<Time32MillisecondType>(&result, 4),
        vec![None, Some(48), Some(267)]
    );
    assert_f64_near(
        &primitive_values::<Float64Type>(&result, 5),
        &[None, Some(24.0), Some(89.0)],
    );
}

#[test]
fn string_min_max_per_group_across_strategies() {
    let table = test_table();
    let cols = vec!["id".to_string()];
    let funcs = vec![
        AggFuncDef::new(AggFuncKind::Count, "date", "count_date"),
        AggFuncDef::new(AggFuncKind::Min, "date", "min_date"),
        AggFuncDef::new(AggFuncKind::Max, "date", "max_date"),
    ];

    let mut single = SingleNumericalHashAggregate::new(cols.clone(), cols.clone(), funcs.clone());
    let mut multi = MultiNumericalHashAggregate::new(cols.clone(), cols.clone(), funcs.clone());
    let mut generic = GenericHashAggregate::new(cols.clone(), cols.clone(), funcs.clone());

    let single_result = sort_by_columns(&aggregate_in_two_chunks(&mut single, &table), &[0]);
    let multi_result = sort_by_columns(&aggregate_in_two_chunks(&mut multi, &table), &[0]);
    let generic_result = sort_by_columns(&aggregate_in_two_chunks(&mut generic, &table), &[0]);

    let expected_dates = str_values(&table, 2);
    assert_eq!(
        primitive_values::<UInt64Type>(&single_result, 1),
        vec![
            Some(0),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(0),
            Some(1)
        ]
    );
    // Every id is its own group, so min and max echo the input values.
    assert_eq!(str_values(&single_result, 2), expected_dates);
    assert_eq!(str_values(&single_result, 3), expected_dates);

    assert_batches_identical(&single_result, &multi_result);
    assert_batches_identical(&single_result, &generic_result);
}

#[test]
fn multi_key_temporal_grouping_with_null_components() {
    let table = test_table();
    let cols = vec![
        "grp_neg_int8".to_string(),
        "date64".to_string(),
        "time32".to_string(),
        "timestamp".to_string(),
    ];
    let mut agg = MultiNumericalHashAggregate::new(
        cols.clone(),
        cols,
        vec![
            AggFuncDef::count_star("count"),
            AggFuncDef::new(AggFuncKind::Min, "date64", "min_date64"),
            AggFuncDef::new(AggFuncKind::Max, "timestamp", "max_timestamp"),
            AggFuncDef::new(AggFuncKind::Sum, "time32", "sum_time32"),
        ],
    );

    let result = aggregate_in_two_chunks(&mut agg, &table);

    // Every row in the fixture has a distinct key tuple, so each group has
    // one row and the aggregates echo the key columns.
    assert_eq!(result.num_rows(), 8);
    assert_eq!(
        primitive_values::<UInt64Type>(&result, 4),
        vec![Some(1); 8]
    );
    assert_eq!(result.column(5).to_data(), result.column(1).to_data());
    assert_eq!(result.column(6).to_data(), result.column(3).to_data());
    assert_eq!(result.column(7).to_data(), result.column(2).to_data());
}

#[test]
fn extreme_int64_keys_group_correctly() {
    let table = test_table();
    let cols = vec!["grp_neg_int64".to_string()];
    let funcs = vec![
        AggFuncDef::count_star("count"),
        AggFuncDef::new(AggFuncKind::Count, "timestamp", "count_ts"),
        AggFuncDef::new(AggFuncKind::Min, "timestamp", "min_ts"),
        AggFuncDef::new(AggFuncKind::Max, "timestamp", "max_ts"),
        AggFuncDef::new(AggFuncKind::Avg, "grp_int8", "avg_int8"),
    ];

    let mut single = SingleNumericalHashAggregate::new(cols.clone(), cols.clone(), funcs.clone());
    let mut multi = MultiNumericalHashAggregate::new(cols.clone(), cols.clone(), funcs.clone());

    let single_result = sort_by_columns(&aggregate_in_two_chunks(&mut single, &table), &[0]);
    let multi_result = sort_by_columns(&aggregate_in_two_chunks(&mut multi, &table), &[0]);

    assert_eq!(
        primitive_values::<Int64Type>(&single_result, 0),
        vec![
            Some(-9223372036854775807),
            Some(-9223372036854775806),
            Some(9223372036854775806),
            Some(9223372036854775807)
        ]
    );
    assert_eq!(
        primitive_values::<UInt64Type>(&single_result, 1),
        vec![Some(2), Some(2), Some(2), Some(2)]
    );
    assert_eq!(
        primitive_values::<UInt64Type>(&single_result, 2),
        vec![Some(2), Some(2), Some(1), Some(0)]
    );
    assert_eq!(
        primitive_values::<TimestampMillisecondType>(&single_result, 3),
        vec![
            Some(1611664414385),
            Some(1611663913570),
            Some(1611664420588),
            None
        ]
    );
    assert_eq!(
        primitive_values::<TimestampMillisecondType>(&single_result, 4),
        vec![
            Some(1611664420588),
            Some(1611664414385),
            Some(1611664420588),
            None
        ]
    );
    let avg_int8: Vec<Option<f64>> = primitive_values::<Float32Type>(&single_result, 5)
        .into_iter()
        .map(|v| v.map(f64::from))
        .collect();
    assert_f64_near(&avg_int8, &[Some(3.0), Some(1.5), Some(1.5), Some(1.0)]);

    assert_batches_identical(&single_result, &multi_result);
}

#[test]
fn one_group_over_an_empty_batch_yields_zero_count_and_nulls() {
    let table = test_table().slice(0, 0);
    let mut agg = OneGroupAggregate::new(vec![
        AggFuncDef::count_star("count_star"),
        AggFuncDef::new(AggFuncKind::Min, "id", "min_id"),
    ]);

    agg.consume(&table).unwrap();
    let result = agg.finish().unwrap();

    assert_eq!(result.num_rows(), 1);
    assert_eq!(primitive_values::<UInt64Type>(&result, 0), vec![Some(0)]);
    assert_eq!(primitive_values::<Int64Type>(&result, 1), vec![None]);
}

#[test]
fn zero_row_batches_do_not_disturb_groups() {
    let table = test_table();
    let cols = vec!["lat".to_string()];
    let funcs = vec![
        AggFuncDef::count_star("count"),
        AggFuncDef::new(AggFuncKind::Sum, "id", "sum_id"),
    ];

    let mut plain = SingleNumericalHashAggregate::new(cols.clone(), cols.clone(), funcs.clone());
    plain.consume(&table).unwrap();
    let plain_result = sort_by_columns(&plain.finish().unwrap(), &[0]);

    let mut interleaved = SingleNumericalHashAggregate::new(cols.clone(), cols, funcs);
    interleaved.consume(&table.slice(0, 4)).unwrap();
    interleaved.consume(&table.slice(0, 0)).unwrap();
    interleaved.consume(&table.slice(4, 4)).unwrap();
    let interleaved_result = sort_by_columns(&interleaved.finish().unwrap(), &[0]);

    assert_batches_identical(&plain_result, &interleaved_result);
}

#[test]
fn unsupported_aggregate_argument_is_a_configuration_error() {
    let table = test_table();
    let mut agg = OneGroupAggregate::new(vec![AggFuncDef::new(
        AggFuncKind::Sum,
        "date",
        "sum_date",
    )]);
    assert!(matches!(
        agg.consume(&table),
        Err(Error::InvalidArgumentError(_))
    ));
}

#[test]
fn missing_column_is_a_configuration_error() {
    let table = test_table();
    let mut agg = OneGroupAggregate::new(vec![AggFuncDef::new(
        AggFuncKind::Min,
        "no_such_column",
        "min_nothing",
    )]);
    assert!(matches!(
        agg.consume(&table),
        Err(Error::InvalidArgumentError(_))
    ));
}

#[test]
fn string_key_is_rejected_by_the_numeric_strategy() {
    let table = test_table();
    let cols = vec!["city_from".to_string()];
    let mut agg =
        SingleNumericalHashAggregate::new(cols.clone(), cols, vec![AggFuncDef::count_star("count")]);
    assert!(matches!(
        agg.consume(&table),
        Err(Error::InvalidArgumentError(_))
    ));
}
