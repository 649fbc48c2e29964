//! Type-specialized aggregate functions.
//!
//! Each aggregate is a small state machine over one [`Slot`] per group. The
//! factory instantiates the right specialization for a `(kind, input type)`
//! pair; the aggregators then drive every function through the object-safe
//! [`AggFunc`] surface, so the per-batch dispatch stays monomorphic inside
//! each function while the function list itself is heterogeneous.
//!
//! Row-wise functions consume exactly one cursor position per row (`init_row`
//! on the row that creates a group, `update_row` on every later row), which
//! keeps all argument cursors in lockstep with the batch row index. Group
//! builders are the exception: they capture by random access and never
//! advance.

use std::sync::Arc;

use arrow::array::{
    ArrayBuilder, ArrayRef, BooleanBuilder, GenericBinaryBuilder, GenericStringBuilder,
    OffsetSizeTrait, PrimitiveBuilder,
};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Decimal128Type, Float16Type, Float32Type, Float64Type,
    Int64Type, UInt64Type, DECIMAL128_MAX_PRECISION,
};
use arrow::util::bit_util;
use datafusion_common::ScalarValue;
use half::f16;
use vexel_cursor::{
    BinaryCursor, BooleanCursor, Cursor, GenericCursor, PrimitiveCursor, StringCursor,
};
use vexel_hugeint::HugeInt;
use vexel_result::{Error, Result};

use crate::slot::{Carrier, Slot};

/// Uniform surface of one aggregate function.
///
/// Lifecycle per batch: `bind_column` once, then either the row-wise pair
/// (`init_row` / `update_row`) or the batch-wise pair (`init_batch` /
/// `update_batch`). At finalize time: `reserve` once with the group count,
/// `summarize` once per group, then `finish` for the output column.
pub trait AggFunc {
    /// Re-binds the function's cursor to its argument column. Called at the
    /// start of every `consume`.
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()>;

    /// Creates a slot from the row the cursor is positioned at, advancing
    /// the cursor by one (group builders read `row_idx` instead).
    fn init_row(&mut self, row_idx: usize) -> Result<Slot>;

    /// Folds the current row into an existing slot, advancing the cursor.
    fn update_row(&mut self, slot: &mut Slot) -> Result<()>;

    /// Creates an empty slot for whole-batch aggregation.
    fn init_batch(&mut self) -> Result<Slot>;

    /// Folds the remainder of the cursor into the slot, draining it.
    fn update_batch(&mut self, slot: &mut Slot) -> Result<()>;

    /// Reserves output capacity for `capacity` result rows. Called once,
    /// before the first `summarize`.
    fn reserve(&mut self, capacity: usize);

    /// Appends one group's final value (or null) to the output builder.
    fn summarize(&mut self, slot: &Slot) -> Result<()>;

    /// Emits the completed output column.
    fn finish(&mut self) -> Result<ArrayRef>;

    /// Declared element type of the output column.
    fn output_type(&self) -> DataType;
}

/// Ties an Arrow primitive type to its widened accumulator carrier.
pub trait AggNative: ArrowPrimitiveType {
    type Carrier: Carrier;

    fn widen(value: Self::Native) -> Self::Carrier;

    fn narrow(carrier: Self::Carrier) -> Self::Native;
}

macro_rules! agg_native {
    ($($t:ty, $native:ty => $carrier:ty);* $(;)?) => {$(
        impl AggNative for $t {
            type Carrier = $carrier;

            #[inline]
            fn widen(value: $native) -> $carrier {
                value as $carrier
            }

            #[inline]
            fn narrow(carrier: $carrier) -> $native {
                carrier as $native
            }
        }
    )*};
}

agg_native! {
    arrow::datatypes::Int8Type, i8 => i64;
    arrow::datatypes::Int16Type, i16 => i64;
    arrow::datatypes::Int32Type, i32 => i64;
    arrow::datatypes::Int64Type, i64 => i64;
    arrow::datatypes::Date32Type, i32 => i64;
    arrow::datatypes::Date64Type, i64 => i64;
    arrow::datatypes::Time32SecondType, i32 => i64;
    arrow::datatypes::Time32MillisecondType, i32 => i64;
    arrow::datatypes::Time64MicrosecondType, i64 => i64;
    arrow::datatypes::Time64NanosecondType, i64 => i64;
    arrow::datatypes::TimestampSecondType, i64 => i64;
    arrow::datatypes::TimestampMillisecondType, i64 => i64;
    arrow::datatypes::TimestampMicrosecondType, i64 => i64;
    arrow::datatypes::TimestampNanosecondType, i64 => i64;
    arrow::datatypes::DurationSecondType, i64 => i64;
    arrow::datatypes::DurationMillisecondType, i64 => i64;
    arrow::datatypes::DurationMicrosecondType, i64 => i64;
    arrow::datatypes::DurationNanosecondType, i64 => i64;
    arrow::datatypes::UInt8Type, u8 => u64;
    arrow::datatypes::UInt16Type, u16 => u64;
    arrow::datatypes::UInt32Type, u32 => u64;
    arrow::datatypes::UInt64Type, u64 => u64;
    arrow::datatypes::Float32Type, f32 => f64;
    arrow::datatypes::Float64Type, f64 => f64;
}

impl AggNative for Float16Type {
    type Carrier = f64;

    #[inline]
    fn widen(value: f16) -> f64 {
        value.to_f64()
    }

    #[inline]
    fn narrow(carrier: f64) -> f16 {
        f16::from_f64(carrier)
    }
}

impl AggNative for Decimal128Type {
    type Carrier = HugeInt;

    #[inline]
    fn widen(value: i128) -> HugeInt {
        HugeInt::from_i128(value)
    }

    #[inline]
    fn narrow(carrier: HugeInt) -> i128 {
        carrier.to_i128()
    }
}

/// 64-bit integer types whose SUM accumulates in 128 bits and narrows back
/// at finalize time.
pub trait Narrow64: ArrowPrimitiveType {
    fn to_huge(value: Self::Native) -> HugeInt;

    fn try_narrow(total: HugeInt) -> Option<Self::Native>;
}

impl Narrow64 for Int64Type {
    #[inline]
    fn to_huge(value: i64) -> HugeInt {
        HugeInt::from(value)
    }

    #[inline]
    fn try_narrow(total: HugeInt) -> Option<i64> {
        total.try_to_i64()
    }
}

impl Narrow64 for UInt64Type {
    #[inline]
    fn to_huge(value: u64) -> HugeInt {
        HugeInt::from(value)
    }

    #[inline]
    fn try_narrow(total: HugeInt) -> Option<u64> {
        total.try_to_u64()
    }
}

/// Float output types for AVG.
pub trait FloatOut: ArrowPrimitiveType {
    fn from_f64(value: f64) -> Self::Native;
}

impl FloatOut for Float32Type {
    #[inline]
    fn from_f64(value: f64) -> f32 {
        value as f32
    }
}

impl FloatOut for Float64Type {
    #[inline]
    fn from_f64(value: f64) -> f64 {
        value
    }
}

fn group_builder_misuse(method: &'static str) -> Error {
    Error::Internal(format!("{method} must never be invoked on a group builder"))
}

/// `COUNT(*)`: counts rows, including rows that are null in every column.
pub struct CountStarFunc {
    cursor: GenericCursor,
    builder: PrimitiveBuilder<UInt64Type>,
}

impl CountStarFunc {
    pub fn new() -> Self {
        Self {
            cursor: GenericCursor::new(),
            builder: PrimitiveBuilder::new(),
        }
    }
}

impl AggFunc for CountStarFunc {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        Ok(Slot::Count(1))
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        *slot.count_mut()? += 1;
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        Ok(Slot::Count(0))
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        *slot.count_mut()? += self.cursor.len() as u64;
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = PrimitiveBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        self.builder.append_value(slot.count()?);
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        DataType::UInt64
    }
}

/// `COUNT(column)`: counts non-null values; works over any column type.
pub struct CountFunc {
    cursor: GenericCursor,
    builder: PrimitiveBuilder<UInt64Type>,
}

impl CountFunc {
    pub fn new() -> Self {
        Self {
            cursor: GenericCursor::new(),
            builder: PrimitiveBuilder::new(),
        }
    }
}

impl AggFunc for CountFunc {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        let initial = if self.cursor.next_null() { 0 } else { 1 };
        Ok(Slot::Count(initial))
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        let increment = if self.cursor.next_null() { 0 } else { 1 };
        *slot.count_mut()? += increment;
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        Ok(Slot::Count(0))
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        *slot.count_mut()? += self.cursor.non_null_count() as u64;
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = PrimitiveBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        self.builder.append_value(slot.count()?);
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        DataType::UInt64
    }
}

/// MIN / MAX over fixed-width primitive columns.
///
/// Comparison happens on the widened carrier, whose order agrees with the
/// input's natural order for every supported type (including decimal, which
/// compares its `i128` representation numerically).
pub struct MinMaxFunc<T: AggNative> {
    is_max: bool,
    cursor: PrimitiveCursor<T>,
    builder: PrimitiveBuilder<T>,
    output_type: DataType,
}

impl<T: AggNative> MinMaxFunc<T> {
    pub fn new(is_max: bool, output_type: DataType) -> Self {
        Self {
            is_max,
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::<T>::new().with_data_type(output_type.clone()),
            output_type,
        }
    }
}

impl<T: AggNative> AggFunc for MinMaxFunc<T> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        if self.cursor.next_if_null() {
            Ok(T::Carrier::slot(None))
        } else {
            Ok(T::Carrier::slot(Some(T::widen(self.cursor.next_value()))))
        }
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = T::widen(self.cursor.next_value());
        let current = T::Carrier::get_mut(slot)?;
        match current {
            None => *current = Some(value),
            Some(best) => {
                if (value < *best) ^ self.is_max {
                    *best = value;
                }
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        if !self.cursor.has_more() {
            return Ok(T::Carrier::slot(None));
        }
        self.init_row(0)
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        while self.cursor.has_more() {
            self.update_row(slot)?;
        }
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder =
            PrimitiveBuilder::<T>::with_capacity(capacity).with_data_type(self.output_type.clone());
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match T::Carrier::get(slot)? {
            Some(best) => self.builder.append_value(T::narrow(best)),
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        self.output_type.clone()
    }
}

/// MIN / MAX over boolean columns (`false < true`).
pub struct MinMaxBoolFunc {
    is_max: bool,
    cursor: BooleanCursor,
    builder: BooleanBuilder,
}

impl MinMaxBoolFunc {
    pub fn new(is_max: bool) -> Self {
        Self {
            is_max,
            cursor: BooleanCursor::new(),
            builder: BooleanBuilder::new(),
        }
    }
}

impl AggFunc for MinMaxBoolFunc {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        if self.cursor.next_if_null() {
            Ok(Slot::UInt(None))
        } else {
            Ok(Slot::UInt(Some(self.cursor.next_value() as u64)))
        }
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value() as u64;
        let current = u64::get_mut(slot)?;
        match current {
            None => *current = Some(value),
            Some(best) => {
                if (value < *best) ^ self.is_max {
                    *best = value;
                }
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        if !self.cursor.has_more() {
            return Ok(Slot::UInt(None));
        }
        self.init_row(0)
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        while self.cursor.has_more() {
            self.update_row(slot)?;
        }
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = BooleanBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match u64::get(slot)? {
            Some(best) => self.builder.append_value(best != 0),
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        DataType::Boolean
    }
}

/// MIN / MAX over utf8 columns; lexicographic on the underlying bytes, with
/// an owned copy of the current extremum so input batches stay releasable.
pub struct MinMaxStringFunc<O: OffsetSizeTrait> {
    is_max: bool,
    cursor: StringCursor<O>,
    builder: GenericStringBuilder<O>,
    output_type: DataType,
}

impl<O: OffsetSizeTrait> MinMaxStringFunc<O> {
    pub fn new(is_max: bool, output_type: DataType) -> Self {
        Self {
            is_max,
            cursor: StringCursor::new(),
            builder: GenericStringBuilder::new(),
            output_type,
        }
    }
}

impl<O: OffsetSizeTrait> AggFunc for MinMaxStringFunc<O> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        if self.cursor.next_if_null() {
            Ok(Slot::Bytes(None))
        } else {
            Ok(Slot::Bytes(Some(self.cursor.next_view().as_bytes().to_vec())))
        }
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let is_max = self.is_max;
        let view = self.cursor.next_view();
        let current = slot.bytes_mut()?;
        match current {
            None => *current = Some(view.as_bytes().to_vec()),
            Some(best) => {
                if (view.as_bytes() < best.as_slice()) ^ is_max {
                    best.clear();
                    best.extend_from_slice(view.as_bytes());
                }
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        if !self.cursor.has_more() {
            return Ok(Slot::Bytes(None));
        }
        self.init_row(0)
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        while self.cursor.has_more() {
            self.update_row(slot)?;
        }
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = GenericStringBuilder::with_capacity(capacity, 0);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match slot.bytes()? {
            Some(bytes) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| Error::Internal(format!("min/max held invalid utf-8: {e}")))?;
                self.builder.append_value(text);
            }
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        self.output_type.clone()
    }
}

/// MIN / MAX over binary columns; unsigned-byte lexicographic order.
pub struct MinMaxBinaryFunc<O: OffsetSizeTrait> {
    is_max: bool,
    cursor: BinaryCursor<O>,
    builder: GenericBinaryBuilder<O>,
    output_type: DataType,
}

impl<O: OffsetSizeTrait> MinMaxBinaryFunc<O> {
    pub fn new(is_max: bool, output_type: DataType) -> Self {
        Self {
            is_max,
            cursor: BinaryCursor::new(),
            builder: GenericBinaryBuilder::new(),
            output_type,
        }
    }
}

impl<O: OffsetSizeTrait> AggFunc for MinMaxBinaryFunc<O> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        if self.cursor.next_if_null() {
            Ok(Slot::Bytes(None))
        } else {
            Ok(Slot::Bytes(Some(self.cursor.next_view().to_vec())))
        }
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let is_max = self.is_max;
        let view = self.cursor.next_view();
        let current = slot.bytes_mut()?;
        match current {
            None => *current = Some(view.to_vec()),
            Some(best) => {
                if (view < best.as_slice()) ^ is_max {
                    best.clear();
                    best.extend_from_slice(view);
                }
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        if !self.cursor.has_more() {
            return Ok(Slot::Bytes(None));
        }
        self.init_row(0)
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        while self.cursor.has_more() {
            self.update_row(slot)?;
        }
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = GenericBinaryBuilder::with_capacity(capacity, 0);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match slot.bytes()? {
            Some(bytes) => self.builder.append_value(bytes.as_slice()),
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        self.output_type.clone()
    }
}

/// SUM over inputs whose widened carrier cannot overflow within a realistic
/// stream: small integers, floats, and the sub-64-bit temporal types.
/// Accumulation wraps rather than checks, per SQL SUM semantics.
pub struct SumFunc<T: AggNative, O: AggNative<Carrier = T::Carrier>> {
    cursor: PrimitiveCursor<T>,
    builder: PrimitiveBuilder<O>,
    output_type: DataType,
}

impl<T: AggNative, O: AggNative<Carrier = T::Carrier>> SumFunc<T, O> {
    pub fn new(output_type: DataType) -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::<O>::new().with_data_type(output_type.clone()),
            output_type,
        }
    }
}

impl<T: AggNative, O: AggNative<Carrier = T::Carrier>> AggFunc for SumFunc<T, O> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        if self.cursor.next_if_null() {
            Ok(T::Carrier::slot(None))
        } else {
            Ok(T::Carrier::slot(Some(T::widen(self.cursor.next_value()))))
        }
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = T::widen(self.cursor.next_value());
        let current = T::Carrier::get_mut(slot)?;
        match current {
            None => *current = Some(value),
            Some(total) => *total = (*total).accumulate(value),
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        if !self.cursor.has_more() {
            return Ok(T::Carrier::slot(None));
        }
        self.init_row(0)
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        while self.cursor.has_more() {
            self.update_row(slot)?;
        }
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder =
            PrimitiveBuilder::<O>::with_capacity(capacity).with_data_type(self.output_type.clone());
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match T::Carrier::get(slot)? {
            Some(total) => self.builder.append_value(O::narrow(total)),
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        self.output_type.clone()
    }
}

/// SUM over `Int64` / `UInt64` with a 128-bit accumulator.
///
/// Summarization starts in narrow mode, appending to a builder of the
/// input's own type. The first group whose total does not narrow back to 64
/// bits flips the function into wide mode: a `Decimal128(38, 0)` builder is
/// allocated, every previously appended value is transferred into it with
/// null positions preserved, and all remaining groups append decimals.
/// `output_type` reports the promotion.
pub struct SumOverflowFunc<T: Narrow64> {
    cursor: PrimitiveCursor<T>,
    builder: PrimitiveBuilder<T>,
    wide_builder: Option<PrimitiveBuilder<Decimal128Type>>,
    reserved: usize,
}

impl<T: Narrow64> SumOverflowFunc<T> {
    pub fn new() -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::new(),
            wide_builder: None,
            reserved: 0,
        }
    }

    fn decimal_type() -> DataType {
        DataType::Decimal128(DECIMAL128_MAX_PRECISION, 0)
    }

    fn promote(&mut self) {
        let capacity = self.reserved.max(self.builder.len() + 1);
        let mut wide = PrimitiveBuilder::<Decimal128Type>::with_capacity(capacity)
            .with_data_type(Self::decimal_type());
        let values = self.builder.values_slice();
        match self.builder.validity_slice() {
            Some(validity) => {
                for (idx, value) in values.iter().enumerate() {
                    if bit_util::get_bit(validity, idx) {
                        wide.append_value(T::to_huge(*value).to_i128());
                    } else {
                        wide.append_null();
                    }
                }
            }
            None => {
                for value in values {
                    wide.append_value(T::to_huge(*value).to_i128());
                }
            }
        }
        self.wide_builder = Some(wide);
    }
}

impl<T: Narrow64> AggFunc for SumOverflowFunc<T> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        if self.cursor.next_if_null() {
            Ok(Slot::Wide(None))
        } else {
            Ok(Slot::Wide(Some(T::to_huge(self.cursor.next_value()))))
        }
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = T::to_huge(self.cursor.next_value());
        let current = <HugeInt as Carrier>::get_mut(slot)?;
        match current {
            None => *current = Some(value),
            Some(total) => {
                if !total.checked_add_assign(value) {
                    return Err(Error::Internal(
                        "128-bit SUM accumulator overflowed".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        if !self.cursor.has_more() {
            return Ok(Slot::Wide(None));
        }
        self.init_row(0)
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        while self.cursor.has_more() {
            self.update_row(slot)?;
        }
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.reserved = capacity;
        self.builder = PrimitiveBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match <HugeInt as Carrier>::get(slot)? {
            Some(total) => {
                if self.wide_builder.is_none() {
                    if let Some(narrowed) = T::try_narrow(total) {
                        self.builder.append_value(narrowed);
                        return Ok(());
                    }
                    tracing::debug!(
                        %total,
                        "sum exceeds the 64-bit output range; promoting column to decimal128"
                    );
                    self.promote();
                }
                match self.wide_builder.as_mut() {
                    Some(wide) => {
                        wide.append_value(total.to_i128());
                        Ok(())
                    }
                    None => Err(Error::Internal(
                        "decimal builder missing after promotion".into(),
                    )),
                }
            }
            None => {
                match self.wide_builder.as_mut() {
                    Some(wide) => wide.append_null(),
                    None => self.builder.append_null(),
                }
                Ok(())
            }
        }
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        match self.wide_builder.as_mut() {
            Some(wide) => Ok(Arc::new(wide.finish())),
            None => Ok(Arc::new(self.builder.finish())),
        }
    }

    fn output_type(&self) -> DataType {
        if self.wide_builder.is_some() {
            Self::decimal_type()
        } else {
            T::DATA_TYPE
        }
    }
}

/// AVG over inputs whose running sum fits the widened carrier; the output
/// is a float of the factory-chosen width.
pub struct AvgFunc<T: AggNative, O: FloatOut> {
    cursor: PrimitiveCursor<T>,
    builder: PrimitiveBuilder<O>,
}

impl<T: AggNative, O: FloatOut> AvgFunc<T, O> {
    pub fn new() -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::new(),
        }
    }
}

impl<T: AggNative, O: FloatOut> AggFunc for AvgFunc<T, O> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        if self.cursor.next_if_null() {
            Ok(T::Carrier::pair_slot(None))
        } else {
            let value = T::widen(self.cursor.next_value());
            Ok(T::Carrier::pair_slot(Some((value, 1))))
        }
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = T::widen(self.cursor.next_value());
        let current = T::Carrier::pair_mut(slot)?;
        match current {
            None => *current = Some((value, 1)),
            Some((sum, count)) => {
                *sum = (*sum).accumulate(value);
                *count += 1;
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        if !self.cursor.has_more() {
            return Ok(T::Carrier::pair_slot(None));
        }
        self.init_row(0)
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        while self.cursor.has_more() {
            self.update_row(slot)?;
        }
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = PrimitiveBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match T::Carrier::pair(slot)? {
            Some((sum, count)) => {
                let avg = sum.to_f64() / count as f64;
                self.builder.append_value(O::from_f64(avg));
            }
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        O::DATA_TYPE
    }
}

/// AVG over `Int64` / `UInt64` with a 128-bit running sum.
///
/// Summarization splits the division into a whole part and a remainder so
/// the fractional precision survives the cast to `f64`; a direct
/// cast-then-divide would round the 128-bit sum first.
pub struct AvgWideFunc<T: Narrow64> {
    cursor: PrimitiveCursor<T>,
    builder: PrimitiveBuilder<Float64Type>,
}

impl<T: Narrow64> AvgWideFunc<T> {
    pub fn new() -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::new(),
        }
    }
}

impl<T: Narrow64> AggFunc for AvgWideFunc<T> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, _row_idx: usize) -> Result<Slot> {
        if self.cursor.next_if_null() {
            Ok(Slot::WidePair(None))
        } else {
            Ok(Slot::WidePair(Some((
                T::to_huge(self.cursor.next_value()),
                1,
            ))))
        }
    }

    fn update_row(&mut self, slot: &mut Slot) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = T::to_huge(self.cursor.next_value());
        let current = <HugeInt as Carrier>::pair_mut(slot)?;
        match current {
            None => *current = Some((value, 1)),
            Some((sum, count)) => {
                if !sum.checked_add_assign(value) {
                    return Err(Error::Internal(
                        "128-bit AVG accumulator overflowed".into(),
                    ));
                }
                *count += 1;
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<Slot> {
        if !self.cursor.has_more() {
            return Ok(Slot::WidePair(None));
        }
        self.init_row(0)
    }

    fn update_batch(&mut self, slot: &mut Slot) -> Result<()> {
        while self.cursor.has_more() {
            self.update_row(slot)?;
        }
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = PrimitiveBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match <HugeInt as Carrier>::pair(slot)? {
            Some((sum, count)) => {
                let divisor = HugeInt::from(count);
                let whole = sum / divisor;
                let remainder = sum % divisor;
                let avg = whole.to_f64() + remainder.to_f64() / count as f64;
                self.builder.append_value(avg);
            }
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        DataType::Float64
    }
}

/// Captures a grouping column's value for each group's representative row.
///
/// Group builders read by random access and never advance a cursor; the
/// update and batch entry points are dispatcher bugs by definition.
pub struct GroupBuilderFunc<T: AggNative> {
    cursor: PrimitiveCursor<T>,
    builder: PrimitiveBuilder<T>,
    output_type: DataType,
}

impl<T: AggNative> GroupBuilderFunc<T> {
    pub fn new(output_type: DataType) -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::<T>::new().with_data_type(output_type.clone()),
            output_type,
        }
    }
}

impl<T: AggNative> AggFunc for GroupBuilderFunc<T> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, row_idx: usize) -> Result<Slot> {
        if self.cursor.is_null_at(row_idx) {
            Ok(T::Carrier::slot(None))
        } else {
            Ok(T::Carrier::slot(Some(T::widen(
                self.cursor.value_at(row_idx),
            ))))
        }
    }

    fn update_row(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_row"))
    }

    fn init_batch(&mut self) -> Result<Slot> {
        Err(group_builder_misuse("init_batch"))
    }

    fn update_batch(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_batch"))
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder =
            PrimitiveBuilder::<T>::with_capacity(capacity).with_data_type(self.output_type.clone());
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match T::Carrier::get(slot)? {
            Some(value) => self.builder.append_value(T::narrow(value)),
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        self.output_type.clone()
    }
}

/// Group builder for boolean keys.
pub struct BoolGroupBuilder {
    cursor: BooleanCursor,
    builder: BooleanBuilder,
}

impl BoolGroupBuilder {
    pub fn new() -> Self {
        Self {
            cursor: BooleanCursor::new(),
            builder: BooleanBuilder::new(),
        }
    }
}

impl AggFunc for BoolGroupBuilder {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, row_idx: usize) -> Result<Slot> {
        if self.cursor.is_null_at(row_idx) {
            Ok(Slot::UInt(None))
        } else {
            Ok(Slot::UInt(Some(self.cursor.value_at(row_idx) as u64)))
        }
    }

    fn update_row(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_row"))
    }

    fn init_batch(&mut self) -> Result<Slot> {
        Err(group_builder_misuse("init_batch"))
    }

    fn update_batch(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_batch"))
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = BooleanBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match u64::get(slot)? {
            Some(value) => self.builder.append_value(value != 0),
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        DataType::Boolean
    }
}

/// Group builder for utf8 keys; owns a copy of the representative value.
pub struct StringGroupBuilder<O: OffsetSizeTrait> {
    cursor: StringCursor<O>,
    builder: GenericStringBuilder<O>,
    output_type: DataType,
}

impl<O: OffsetSizeTrait> StringGroupBuilder<O> {
    pub fn new(output_type: DataType) -> Self {
        Self {
            cursor: StringCursor::new(),
            builder: GenericStringBuilder::new(),
            output_type,
        }
    }
}

impl<O: OffsetSizeTrait> AggFunc for StringGroupBuilder<O> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, row_idx: usize) -> Result<Slot> {
        if self.cursor.is_null_at(row_idx) {
            Ok(Slot::Bytes(None))
        } else {
            Ok(Slot::Bytes(Some(
                self.cursor.string_at(row_idx).into_bytes(),
            )))
        }
    }

    fn update_row(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_row"))
    }

    fn init_batch(&mut self) -> Result<Slot> {
        Err(group_builder_misuse("init_batch"))
    }

    fn update_batch(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_batch"))
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = GenericStringBuilder::with_capacity(capacity, 0);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match slot.bytes()? {
            Some(bytes) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| Error::Internal(format!("group key held invalid utf-8: {e}")))?;
                self.builder.append_value(text);
            }
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        self.output_type.clone()
    }
}

/// Group builder for binary keys.
pub struct BinaryGroupBuilder<O: OffsetSizeTrait> {
    cursor: BinaryCursor<O>,
    builder: GenericBinaryBuilder<O>,
    output_type: DataType,
}

impl<O: OffsetSizeTrait> BinaryGroupBuilder<O> {
    pub fn new(output_type: DataType) -> Self {
        Self {
            cursor: BinaryCursor::new(),
            builder: GenericBinaryBuilder::new(),
            output_type,
        }
    }
}

impl<O: OffsetSizeTrait> AggFunc for BinaryGroupBuilder<O> {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.bind(array)
    }

    fn init_row(&mut self, row_idx: usize) -> Result<Slot> {
        if self.cursor.is_null_at(row_idx) {
            Ok(Slot::Bytes(None))
        } else {
            Ok(Slot::Bytes(Some(self.cursor.bytes_at(row_idx))))
        }
    }

    fn update_row(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_row"))
    }

    fn init_batch(&mut self) -> Result<Slot> {
        Err(group_builder_misuse("init_batch"))
    }

    fn update_batch(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_batch"))
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = GenericBinaryBuilder::with_capacity(capacity, 0);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        match slot.bytes()? {
            Some(bytes) => self.builder.append_value(bytes.as_slice()),
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn output_type(&self) -> DataType {
        self.output_type.clone()
    }
}

/// Group builder for columns without a typed cursor (nested, dictionary,
/// fixed-size binary). Captures boxed scalars and materializes the output
/// column from them in one pass.
pub struct ScalarGroupBuilder {
    column: ArrayRef,
    values: Vec<ScalarValue>,
    output_type: DataType,
}

impl ScalarGroupBuilder {
    pub fn new(output_type: DataType) -> Self {
        Self {
            column: arrow::array::new_empty_array(&DataType::Null),
            values: Vec::new(),
            output_type,
        }
    }
}

impl AggFunc for ScalarGroupBuilder {
    fn bind_column(&mut self, array: &ArrayRef) -> Result<()> {
        self.column = array.clone();
        Ok(())
    }

    fn init_row(&mut self, row_idx: usize) -> Result<Slot> {
        ScalarValue::try_from_array(self.column.as_ref(), row_idx)
            .map(Slot::Scalar)
            .map_err(|e| Error::Internal(e.to_string()))
    }

    fn update_row(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_row"))
    }

    fn init_batch(&mut self) -> Result<Slot> {
        Err(group_builder_misuse("init_batch"))
    }

    fn update_batch(&mut self, _slot: &mut Slot) -> Result<()> {
        Err(group_builder_misuse("update_batch"))
    }

    fn reserve(&mut self, capacity: usize) {
        self.values = Vec::with_capacity(capacity);
    }

    fn summarize(&mut self, slot: &Slot) -> Result<()> {
        self.values.push(slot.scalar()?.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        if self.values.is_empty() {
            return Ok(arrow::array::new_empty_array(&self.output_type));
        }
        ScalarValue::iter_to_array(std::mem::take(&mut self.values))
            .map_err(|e| Error::Internal(e.to_string()))
    }

    fn output_type(&self) -> DataType {
        self.output_type.clone()
    }
}
