//! Maps `(aggregate kind, column type)` pairs to concrete functions.
//!
//! The factory is a full enumeration: every supported pair is listed, and
//! anything else is a configuration error raised before a single row is
//! processed. The widening rules live here — SUM of signed integers goes to
//! `Int64`, unsigned to `UInt64`, floats to `Float64`, temporal sums keep
//! their own type family, and the 64-bit integer SUM/AVG take the 128-bit
//! overflow-aware path.

use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, DurationMicrosecondType,
    DurationMillisecondType, DurationNanosecondType, DurationSecondType, Float16Type, Float32Type,
    Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, SchemaRef, Time32MillisecondType,
    Time32SecondType, Time64MicrosecondType, Time64NanosecondType, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use vexel_result::{Error, Result};

use crate::funcs::{
    AggFunc, AvgFunc, AvgWideFunc, BinaryGroupBuilder, BoolGroupBuilder, CountFunc, CountStarFunc,
    GroupBuilderFunc, MinMaxBinaryFunc, MinMaxBoolFunc, MinMaxFunc, MinMaxStringFunc,
    ScalarGroupBuilder, StringGroupBuilder, SumFunc, SumOverflowFunc,
};
use crate::{AggFuncDef, AggFuncKind};

/// Instantiates the aggregate function for one spec against the input
/// schema. `CountStar` ignores the column; everything else resolves its
/// argument column's type here and fails fast when the pair is unsupported.
pub fn agg_func_for(def: &AggFuncDef, schema: &SchemaRef) -> Result<Box<dyn AggFunc>> {
    let data_type = if def.column.is_empty() {
        DataType::UInt64
    } else {
        let field = schema.field_with_name(&def.column).map_err(|_| {
            Error::InvalidArgumentError(format!("column not found: {}", def.column))
        })?;
        field.data_type().clone()
    };

    match def.kind {
        AggFuncKind::Count => Ok(Box::new(CountFunc::new())),
        AggFuncKind::CountStar => Ok(Box::new(CountStarFunc::new())),
        AggFuncKind::Min => min_max_func(false, &data_type),
        AggFuncKind::Max => min_max_func(true, &data_type),
        AggFuncKind::Sum => sum_func(&data_type),
        AggFuncKind::Avg => avg_func(&data_type),
        AggFuncKind::GroupBuilder => Ok(group_builder_func(&data_type)),
    }
}

fn min_max_func(is_max: bool, data_type: &DataType) -> Result<Box<dyn AggFunc>> {
    let func: Box<dyn AggFunc> = match data_type {
        DataType::Boolean => Box::new(MinMaxBoolFunc::new(is_max)),
        DataType::Int8 => Box::new(MinMaxFunc::<Int8Type>::new(is_max, data_type.clone())),
        DataType::Int16 => Box::new(MinMaxFunc::<Int16Type>::new(is_max, data_type.clone())),
        DataType::Int32 => Box::new(MinMaxFunc::<Int32Type>::new(is_max, data_type.clone())),
        DataType::Int64 => Box::new(MinMaxFunc::<Int64Type>::new(is_max, data_type.clone())),
        DataType::UInt8 => Box::new(MinMaxFunc::<UInt8Type>::new(is_max, data_type.clone())),
        DataType::UInt16 => Box::new(MinMaxFunc::<UInt16Type>::new(is_max, data_type.clone())),
        DataType::UInt32 => Box::new(MinMaxFunc::<UInt32Type>::new(is_max, data_type.clone())),
        DataType::UInt64 => Box::new(MinMaxFunc::<UInt64Type>::new(is_max, data_type.clone())),
        DataType::Float16 => Box::new(MinMaxFunc::<Float16Type>::new(is_max, data_type.clone())),
        DataType::Float32 => Box::new(MinMaxFunc::<Float32Type>::new(is_max, data_type.clone())),
        DataType::Float64 => Box::new(MinMaxFunc::<Float64Type>::new(is_max, data_type.clone())),
        DataType::Date32 => Box::new(MinMaxFunc::<Date32Type>::new(is_max, data_type.clone())),
        DataType::Date64 => Box::new(MinMaxFunc::<Date64Type>::new(is_max, data_type.clone())),
        DataType::Time32(TimeUnit::Second) => {
            Box::new(MinMaxFunc::<Time32SecondType>::new(is_max, data_type.clone()))
        }
        DataType::Time32(TimeUnit::Millisecond) => Box::new(MinMaxFunc::<Time32MillisecondType>::new(
            is_max,
            data_type.clone(),
        )),
        DataType::Time64(TimeUnit::Microsecond) => Box::new(MinMaxFunc::<Time64MicrosecondType>::new(
            is_max,
            data_type.clone(),
        )),
        DataType::Time64(TimeUnit::Nanosecond) => {
            Box::new(MinMaxFunc::<Time64NanosecondType>::new(is_max, data_type.clone()))
        }
        DataType::Timestamp(TimeUnit::Second, _) => {
            Box::new(MinMaxFunc::<TimestampSecondType>::new(is_max, data_type.clone()))
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => Box::new(MinMaxFunc::<
            TimestampMillisecondType,
        >::new(is_max, data_type.clone())),
        DataType::Timestamp(TimeUnit::Microsecond, _) => Box::new(MinMaxFunc::<
            TimestampMicrosecondType,
        >::new(is_max, data_type.clone())),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => Box::new(MinMaxFunc::<
            TimestampNanosecondType,
        >::new(is_max, data_type.clone())),
        DataType::Duration(TimeUnit::Second) => {
            Box::new(MinMaxFunc::<DurationSecondType>::new(is_max, data_type.clone()))
        }
        DataType::Duration(TimeUnit::Millisecond) => Box::new(MinMaxFunc::<
            DurationMillisecondType,
        >::new(is_max, data_type.clone())),
        DataType::Duration(TimeUnit::Microsecond) => Box::new(MinMaxFunc::<
            DurationMicrosecondType,
        >::new(is_max, data_type.clone())),
        DataType::Duration(TimeUnit::Nanosecond) => Box::new(MinMaxFunc::<
            DurationNanosecondType,
        >::new(is_max, data_type.clone())),
        DataType::Decimal128(_, _) => {
            Box::new(MinMaxFunc::<Decimal128Type>::new(is_max, data_type.clone()))
        }
        DataType::Utf8 => Box::new(MinMaxStringFunc::<i32>::new(is_max, data_type.clone())),
        DataType::LargeUtf8 => Box::new(MinMaxStringFunc::<i64>::new(is_max, data_type.clone())),
        DataType::Binary => Box::new(MinMaxBinaryFunc::<i32>::new(is_max, data_type.clone())),
        DataType::LargeBinary => Box::new(MinMaxBinaryFunc::<i64>::new(is_max, data_type.clone())),
        other => {
            return Err(Error::InvalidArgumentError(format!(
                "column type {other} is not supported by min()/max()"
            )));
        }
    };
    Ok(func)
}

fn sum_func(data_type: &DataType) -> Result<Box<dyn AggFunc>> {
    let func: Box<dyn AggFunc> = match data_type {
        DataType::Int8 => Box::new(SumFunc::<Int8Type, Int64Type>::new(DataType::Int64)),
        DataType::Int16 => Box::new(SumFunc::<Int16Type, Int64Type>::new(DataType::Int64)),
        DataType::Int32 => Box::new(SumFunc::<Int32Type, Int64Type>::new(DataType::Int64)),
        DataType::Int64 => Box::new(SumOverflowFunc::<Int64Type>::new()),
        DataType::UInt8 => Box::new(SumFunc::<UInt8Type, UInt64Type>::new(DataType::UInt64)),
        DataType::UInt16 => Box::new(SumFunc::<UInt16Type, UInt64Type>::new(DataType::UInt64)),
        DataType::UInt32 => Box::new(SumFunc::<UInt32Type, UInt64Type>::new(DataType::UInt64)),
        DataType::UInt64 => Box::new(SumOverflowFunc::<UInt64Type>::new()),
        DataType::Float16 => Box::new(SumFunc::<Float16Type, Float64Type>::new(DataType::Float64)),
        DataType::Float32 => Box::new(SumFunc::<Float32Type, Float64Type>::new(DataType::Float64)),
        DataType::Float64 => Box::new(SumFunc::<Float64Type, Float64Type>::new(DataType::Float64)),
        DataType::Time32(TimeUnit::Second) => Box::new(SumFunc::<Time32SecondType, Time32SecondType>::new(
            data_type.clone(),
        )),
        DataType::Time32(TimeUnit::Millisecond) => Box::new(SumFunc::<
            Time32MillisecondType,
            Time32MillisecondType,
        >::new(data_type.clone())),
        DataType::Time64(TimeUnit::Microsecond) => Box::new(SumFunc::<
            Time64MicrosecondType,
            Time64MicrosecondType,
        >::new(data_type.clone())),
        DataType::Time64(TimeUnit::Nanosecond) => Box::new(SumFunc::<
            Time64NanosecondType,
            Time64NanosecondType,
        >::new(data_type.clone())),
        DataType::Duration(TimeUnit::Second) => Box::new(SumFunc::<
            DurationSecondType,
            DurationSecondType,
        >::new(data_type.clone())),
        DataType::Duration(TimeUnit::Millisecond) => Box::new(SumFunc::<
            DurationMillisecondType,
            DurationMillisecondType,
        >::new(data_type.clone())),
        DataType::Duration(TimeUnit::Microsecond) => Box::new(SumFunc::<
            DurationMicrosecondType,
            DurationMicrosecondType,
        >::new(data_type.clone())),
        DataType::Duration(TimeUnit::Nanosecond) => Box::new(SumFunc::<
            DurationNanosecondType,
            DurationNanosecondType,
        >::new(data_type.clone())),
        other => {
            return Err(Error::InvalidArgumentError(format!(
                "column type {other} is not supported by sum()"
            )));
        }
    };
    Ok(func)
}

fn avg_func(data_type: &DataType) -> Result<Box<dyn AggFunc>> {
    let func: Box<dyn AggFunc> = match data_type {
        DataType::Int8 => Box::new(AvgFunc::<Int8Type, Float32Type>::new()),
        DataType::Int16 => Box::new(AvgFunc::<Int16Type, Float32Type>::new()),
        DataType::Int32 => Box::new(AvgFunc::<Int32Type, Float64Type>::new()),
        DataType::Int64 => Box::new(AvgWideFunc::<Int64Type>::new()),
        DataType::UInt8 => Box::new(AvgFunc::<UInt8Type, Float32Type>::new()),
        DataType::UInt16 => Box::new(AvgFunc::<UInt16Type, Float32Type>::new()),
        DataType::UInt32 => Box::new(AvgFunc::<UInt32Type, Float64Type>::new()),
        DataType::UInt64 => Box::new(AvgWideFunc::<UInt64Type>::new()),
        DataType::Float16 => Box::new(AvgFunc::<Float16Type, Float64Type>::new()),
        DataType::Float32 => Box::new(AvgFunc::<Float32Type, Float64Type>::new()),
        DataType::Float64 => Box::new(AvgFunc::<Float64Type, Float64Type>::new()),
        DataType::Time32(TimeUnit::Second) => {
            Box::new(AvgFunc::<Time32SecondType, Float64Type>::new())
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            Box::new(AvgFunc::<Time32MillisecondType, Float64Type>::new())
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            Box::new(AvgFunc::<Time64MicrosecondType, Float64Type>::new())
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            Box::new(AvgFunc::<Time64NanosecondType, Float64Type>::new())
        }
        DataType::Duration(TimeUnit::Second) => {
            Box::new(AvgFunc::<DurationSecondType, Float64Type>::new())
        }
        DataType::Duration(TimeUnit::Millisecond) => {
            Box::new(AvgFunc::<DurationMillisecondType, Float64Type>::new())
        }
        DataType::Duration(TimeUnit::Microsecond) => {
            Box::new(AvgFunc::<DurationMicrosecondType, Float64Type>::new())
        }
        DataType::Duration(TimeUnit::Nanosecond) => {
            Box::new(AvgFunc::<DurationNanosecondType, Float64Type>::new())
        }
        other => {
            return Err(Error::InvalidArgumentError(format!(
                "column type {other} is not supported by avg()"
            )));
        }
    };
    Ok(func)
}

/// Group builders cover every type that is legal as a `GROUP BY` key under
/// the generic strategy; types without a typed cursor fall back to the
/// boxed-scalar path.
fn group_builder_func(data_type: &DataType) -> Box<dyn AggFunc> {
    match data_type {
        DataType::Boolean => Box::new(BoolGroupBuilder::new()),
        DataType::Int8 => Box::new(GroupBuilderFunc::<Int8Type>::new(data_type.clone())),
        DataType::Int16 => Box::new(GroupBuilderFunc::<Int16Type>::new(data_type.clone())),
        DataType::Int32 => Box::new(GroupBuilderFunc::<Int32Type>::new(data_type.clone())),
        DataType::Int64 => Box::new(GroupBuilderFunc::<Int64Type>::new(data_type.clone())),
        DataType::UInt8 => Box::new(GroupBuilderFunc::<UInt8Type>::new(data_type.clone())),
        DataType::UInt16 => Box::new(GroupBuilderFunc::<UInt16Type>::new(data_type.clone())),
        DataType::UInt32 => Box::new(GroupBuilderFunc::<UInt32Type>::new(data_type.clone())),
        DataType::UInt64 => Box::new(GroupBuilderFunc::<UInt64Type>::new(data_type.clone())),
        DataType::Float16 => Box::new(GroupBuilderFunc::<Float16Type>::new(data_type.clone())),
        DataType::Float32 => Box::new(GroupBuilderFunc::<Float32Type>::new(data_type.clone())),
        DataType::Float64 => Box::new(GroupBuilderFunc::<Float64Type>::new(data_type.clone())),
        DataType::Date32 => Box::new(GroupBuilderFunc::<Date32Type>::new(data_type.clone())),
        DataType::Date64 => Box::new(GroupBuilderFunc::<Date64Type>::new(data_type.clone())),
        DataType::Time32(TimeUnit::Second) => {
            Box::new(GroupBuilderFunc::<Time32SecondType>::new(data_type.clone()))
        }
        DataType::Time32(TimeUnit::Millisecond) => Box::new(GroupBuilderFunc::<
            Time32MillisecondType,
        >::new(data_type.clone())),
        DataType::Time64(TimeUnit::Microsecond) => Box::new(GroupBuilderFunc::<
            Time64MicrosecondType,
        >::new(data_type.clone())),
        DataType::Time64(TimeUnit::Nanosecond) => Box::new(GroupBuilderFunc::<
            Time64NanosecondType,
        >::new(data_type.clone())),
        DataType::Timestamp(TimeUnit::Second, _) => Box::new(GroupBuilderFunc::<
            TimestampSecondType,
        >::new(data_type.clone())),
        DataType::Timestamp(TimeUnit::Millisecond, _) => Box::new(GroupBuilderFunc::<
            TimestampMillisecondType,
        >::new(data_type.clone())),
        DataType::Timestamp(TimeUnit::Microsecond, _) => Box::new(GroupBuilderFunc::<
            TimestampMicrosecondType,
        >::new(data_type.clone())),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => Box::new(GroupBuilderFunc::<
            TimestampNanosecondType,
        >::new(data_type.clone())),
        DataType::Duration(TimeUnit::Second) => Box::new(GroupBuilderFunc::<
            DurationSecondType,
        >::new(data_type.clone())),
        DataType::Duration(TimeUnit::Millisecond) => Box::new(GroupBuilderFunc::<
            DurationMillisecondType,
        >::new(data_type.clone())),
        DataType::Duration(TimeUnit::Microsecond) => Box::new(GroupBuilderFunc::<
            DurationMicrosecondType,
        >::new(data_type.clone())),
        DataType::Duration(TimeUnit::Nanosecond) => Box::new(GroupBuilderFunc::<
            DurationNanosecondType,
        >::new(data_type.clone())),
        DataType::Decimal128(_, _) => {
            Box::new(GroupBuilderFunc::<Decimal128Type>::new(data_type.clone()))
        }
        DataType::Utf8 => Box::new(StringGroupBuilder::<i32>::new(data_type.clone())),
        DataType::LargeUtf8 => Box::new(StringGroupBuilder::<i64>::new(data_type.clone())),
        DataType::Binary => Box::new(BinaryGroupBuilder::<i32>::new(data_type.clone())),
        DataType::LargeBinary => Box::new(BinaryGroupBuilder::<i64>::new(data_type.clone())),
        other => Box::new(ScalarGroupBuilder::new(other.clone())),
    }
}
