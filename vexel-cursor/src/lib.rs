//! Null-aware forward cursors over typed Arrow arrays.
//!
//! A cursor abstracts one column of a record batch as a forward iterator
//! with random-access null probes. Aggregate functions own a cursor for
//! their argument column and re-bind it at the start of every batch; the
//! numeric hash strategies additionally use cursors to produce 64-bit key
//! tokens ([`KeyCursor::next_as_u64`]) for their group maps.
//!
//! Cursors hold a cheap clone of the underlying `Arc`-backed array, so the
//! input batch can be released as soon as `consume` returns.

use arrow::array::{
    Array, ArrayRef, BooleanArray, GenericBinaryArray, GenericStringArray, OffsetSizeTrait,
    PrimitiveArray,
};
use arrow::datatypes::{ArrowPrimitiveType, DataType, TimeUnit};
use arrow::datatypes::{
    Date32Type, Date64Type, DurationMicrosecondType, DurationMillisecondType,
    DurationNanosecondType, DurationSecondType, Float16Type, Float32Type, Float64Type, Int8Type,
    Int16Type, Int32Type, Int64Type, Time32MillisecondType, Time32SecondType,
    Time64MicrosecondType, Time64NanosecondType, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type,
    UInt32Type, UInt64Type,
};
use half::f16;
use vexel_result::{Error, Result};

/// Forward cursor over one typed column.
///
/// Binding resets the position to zero. `advance` and the `next_*` helpers
/// move forward one element; the `*_at` probes are random access and do not
/// move the cursor.
pub trait Cursor {
    /// Attach the cursor to a column, resetting the position to zero.
    ///
    /// Returns [`Error::InvalidArgumentError`] when the array's type is not
    /// one this cursor can read. The check happens here, at bind time, never
    /// silently at read time.
    fn bind(&mut self, array: &ArrayRef) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_more(&self) -> bool;

    fn non_null_count(&self) -> usize;

    /// Null probe at an arbitrary position; does not move the cursor.
    fn is_null_at(&self, idx: usize) -> bool;

    /// Null probe at the current position.
    fn is_null_current(&self) -> bool;

    fn advance(&mut self);

    /// Reads the current null bit and advances unconditionally.
    fn next_null(&mut self) -> bool {
        let is_null = self.is_null_current();
        self.advance();
        is_null
    }

    /// Reads the current null bit and advances only when it is set.
    fn next_if_null(&mut self) -> bool {
        let is_null = self.is_null_current();
        if is_null {
            self.advance();
        }
        is_null
    }
}

/// Cursor over a column whose values can serve as 64-bit group-key tokens.
///
/// Integer tokens are the value itself (sign-extended for signed inputs),
/// float tokens are the IEEE-754 bit pattern zero-extended to 64 bits, and
/// boolean tokens are 0 or 1. Key equality compares these tokens, so
/// `+0.0`/`-0.0` and non-identical NaNs land in distinct groups.
pub trait KeyCursor: Cursor {
    /// Consumes the current element and returns its token.
    fn next_as_u64(&mut self) -> u64;
}

/// Bit-pattern widening of a native value into a key token.
pub trait KeyToken: Copy {
    fn to_u64_token(self) -> u64;
}

macro_rules! key_token_cast {
    ($($t:ty),*) => {
        $(
            impl KeyToken for $t {
                #[inline]
                fn to_u64_token(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

key_token_cast!(i8, i16, i32, i64, u8, u16, u32, u64);

impl KeyToken for f16 {
    #[inline]
    fn to_u64_token(self) -> u64 {
        self.to_bits() as u64
    }
}

impl KeyToken for f32 {
    #[inline]
    fn to_u64_token(self) -> u64 {
        self.to_bits() as u64
    }
}

impl KeyToken for f64 {
    #[inline]
    fn to_u64_token(self) -> u64 {
        self.to_bits()
    }
}

/// Cursor over any fixed-width primitive array (integers, floats, decimal,
/// and the temporal families).
pub struct PrimitiveCursor<T: ArrowPrimitiveType> {
    array: PrimitiveArray<T>,
    pos: usize,
}

impl<T: ArrowPrimitiveType> Default for PrimitiveCursor<T> {
    fn default() -> Self {
        Self {
            array: PrimitiveArray::<T>::new_null(0),
            pos: 0,
        }
    }
}

impl<T: ArrowPrimitiveType> PrimitiveCursor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes and returns the current value. The caller is responsible for
    /// probing nulls first; the value read at a null position is arbitrary.
    #[inline]
    pub fn next_value(&mut self) -> T::Native {
        let value = self.array.value(self.pos);
        self.pos += 1;
        value
    }

    /// Random-access read; does not move the cursor.
    #[inline]
    pub fn value_at(&self, idx: usize) -> T::Native {
        self.array.value(idx)
    }
}

impl<T: ArrowPrimitiveType> Cursor for PrimitiveCursor<T> {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        let typed = array
            .as_any()
            .downcast_ref::<PrimitiveArray<T>>()
            .ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "cursor for {} cannot be bound to a {} column",
                    T::DATA_TYPE,
                    array.data_type()
                ))
            })?;
        self.array = typed.clone();
        self.pos = 0;
        Ok(())
    }

    fn len(&self) -> usize {
        self.array.len()
    }

    fn has_more(&self) -> bool {
        self.pos < self.array.len()
    }

    fn non_null_count(&self) -> usize {
        self.array.len() - self.array.null_count()
    }

    fn is_null_at(&self, idx: usize) -> bool {
        self.array.is_null(idx)
    }

    fn is_null_current(&self) -> bool {
        self.array.is_null(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

impl<T: ArrowPrimitiveType> KeyCursor for PrimitiveCursor<T>
where
    T::Native: KeyToken,
{
    #[inline]
    fn next_as_u64(&mut self) -> u64 {
        self.next_value().to_u64_token()
    }
}

/// Cursor over boolean arrays; tokens are 0 or 1.
pub struct BooleanCursor {
    array: BooleanArray,
    pos: usize,
}

impl Default for BooleanCursor {
    fn default() -> Self {
        Self {
            array: BooleanArray::new_null(0),
            pos: 0,
        }
    }
}

impl BooleanCursor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn next_value(&mut self) -> bool {
        let value = self.array.value(self.pos);
        self.pos += 1;
        value
    }

    #[inline]
    pub fn value_at(&self, idx: usize) -> bool {
        self.array.value(idx)
    }
}

impl Cursor for BooleanCursor {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        let typed = array
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "boolean cursor cannot be bound to a {} column",
                    array.data_type()
                ))
            })?;
        self.array = typed.clone();
        self.pos = 0;
        Ok(())
    }

    fn len(&self) -> usize {
        self.array.len()
    }

    fn has_more(&self) -> bool {
        self.pos < self.array.len()
    }

    fn non_null_count(&self) -> usize {
        self.array.len() - self.array.null_count()
    }

    fn is_null_at(&self, idx: usize) -> bool {
        self.array.is_null(idx)
    }

    fn is_null_current(&self) -> bool {
        self.array.is_null(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

impl KeyCursor for BooleanCursor {
    #[inline]
    fn next_as_u64(&mut self) -> u64 {
        self.next_value() as u64
    }
}

/// Cursor over (large) utf8 arrays with borrowed views and owning reads.
pub struct StringCursor<O: OffsetSizeTrait> {
    array: GenericStringArray<O>,
    pos: usize,
}

impl<O: OffsetSizeTrait> Default for StringCursor<O> {
    fn default() -> Self {
        Self {
            array: GenericStringArray::<O>::new_null(0),
            pos: 0,
        }
    }
}

impl<O: OffsetSizeTrait> StringCursor<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the current element and returns a borrowed view of it.
    #[inline]
    pub fn next_view(&mut self) -> &str {
        let value = self.array.value(self.pos);
        self.pos += 1;
        value
    }

    #[inline]
    pub fn view_at(&self, idx: usize) -> &str {
        self.array.value(idx)
    }

    /// Owning copy of the element at `idx`.
    #[inline]
    pub fn string_at(&self, idx: usize) -> String {
        self.array.value(idx).to_owned()
    }
}

impl<O: OffsetSizeTrait> Cursor for StringCursor<O> {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        let typed = array
            .as_any()
            .downcast_ref::<GenericStringArray<O>>()
            .ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "string cursor cannot be bound to a {} column",
                    array.data_type()
                ))
            })?;
        self.array = typed.clone();
        self.pos = 0;
        Ok(())
    }

    fn len(&self) -> usize {
        self.array.len()
    }

    fn has_more(&self) -> bool {
        self.pos < self.array.len()
    }

    fn non_null_count(&self) -> usize {
        self.array.len() - self.array.null_count()
    }

    fn is_null_at(&self, idx: usize) -> bool {
        self.array.is_null(idx)
    }

    fn is_null_current(&self) -> bool {
        self.array.is_null(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

/// Cursor over (large) binary arrays.
pub struct BinaryCursor<O: OffsetSizeTrait> {
    array: GenericBinaryArray<O>,
    pos: usize,
}

impl<O: OffsetSizeTrait> Default for BinaryCursor<O> {
    fn default() -> Self {
        Self {
            array: GenericBinaryArray::<O>::new_null(0),
            pos: 0,
        }
    }
}

impl<O: OffsetSizeTrait> BinaryCursor<O> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn next_view(&mut self) -> &[u8] {
        let value = self.array.value(self.pos);
        self.pos += 1;
        value
    }

    #[inline]
    pub fn view_at(&self, idx: usize) -> &[u8] {
        self.array.value(idx)
    }

    #[inline]
    pub fn bytes_at(&self, idx: usize) -> Vec<u8> {
        self.array.value(idx).to_vec()
    }
}

impl<O: OffsetSizeTrait> Cursor for BinaryCursor<O> {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        let typed = array
            .as_any()
            .downcast_ref::<GenericBinaryArray<O>>()
            .ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "binary cursor cannot be bound to a {} column",
                    array.data_type()
                ))
            })?;
        self.array = typed.clone();
        self.pos = 0;
        Ok(())
    }

    fn len(&self) -> usize {
        self.array.len()
    }

    fn has_more(&self) -> bool {
        self.pos < self.array.len()
    }

    fn non_null_count(&self) -> usize {
        self.array.len() - self.array.null_count()
    }

    fn is_null_at(&self, idx: usize) -> bool {
        self.array.is_null(idx)
    }

    fn is_null_current(&self) -> bool {
        self.array.is_null(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

/// Cursor over any array type, supporting null probing only.
///
/// This is the cursor behind `COUNT` and `COUNT(*)`, which never read
/// values, and the fallback for nested and dictionary-encoded columns.
pub struct GenericCursor {
    array: ArrayRef,
    pos: usize,
}

impl Default for GenericCursor {
    fn default() -> Self {
        Self {
            array: arrow::array::new_empty_array(&DataType::Null),
            pos: 0,
        }
    }
}

impl GenericCursor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cursor for GenericCursor {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.array = array.clone();
        self.pos = 0;
        Ok(())
    }

    fn len(&self) -> usize {
        self.array.len()
    }

    fn has_more(&self) -> bool {
        self.pos < self.array.len()
    }

    fn non_null_count(&self) -> usize {
        self.array.len() - self.array.null_count()
    }

    fn is_null_at(&self, idx: usize) -> bool {
        self.array.is_null(idx)
    }

    fn is_null_current(&self) -> bool {
        self.array.is_null(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

/// Builds the key cursor for a grouping column of the numeric strategies.
///
/// Only fixed-width numeric, boolean, and temporal columns produce 64-bit
/// key tokens; anything else must group through the generic strategy.
pub fn key_cursor_for(data_type: &DataType) -> Result<Box<dyn KeyCursor>> {
    let cursor: Box<dyn KeyCursor> = match data_type {
        DataType::Boolean => Box::new(BooleanCursor::new()),
        DataType::Int8 => Box::new(PrimitiveCursor::<Int8Type>::new()),
        DataType::Int16 => Box::new(PrimitiveCursor::<Int16Type>::new()),
        DataType::Int32 => Box::new(PrimitiveCursor::<Int32Type>::new()),
        DataType::Int64 => Box::new(PrimitiveCursor::<Int64Type>::new()),
        DataType::UInt8 => Box::new(PrimitiveCursor::<UInt8Type>::new()),
        DataType::UInt16 => Box::new(PrimitiveCursor::<UInt16Type>::new()),
        DataType::UInt32 => Box::new(PrimitiveCursor::<UInt32Type>::new()),
        DataType::UInt64 => Box::new(PrimitiveCursor::<UInt64Type>::new()),
        DataType::Float16 => Box::new(PrimitiveCursor::<Float16Type>::new()),
        DataType::Float32 => Box::new(PrimitiveCursor::<Float32Type>::new()),
        DataType::Float64 => Box::new(PrimitiveCursor::<Float64Type>::new()),
        DataType::Date32 => Box::new(PrimitiveCursor::<Date32Type>::new()),
        DataType::Date64 => Box::new(PrimitiveCursor::<Date64Type>::new()),
        DataType::Time32(TimeUnit::Second) => Box::new(PrimitiveCursor::<Time32SecondType>::new()),
        DataType::Time32(TimeUnit::Millisecond) => {
            Box::new(PrimitiveCursor::<Time32MillisecondType>::new())
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            Box::new(PrimitiveCursor::<Time64MicrosecondType>::new())
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            Box::new(PrimitiveCursor::<Time64NanosecondType>::new())
        }
        DataType::Timestamp(TimeUnit::Second, _) => {
            Box::new(PrimitiveCursor::<TimestampSecondType>::new())
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            Box::new(PrimitiveCursor::<TimestampMillisecondType>::new())
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            Box::new(PrimitiveCursor::<TimestampMicrosecondType>::new())
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            Box::new(PrimitiveCursor::<TimestampNanosecondType>::new())
        }
        DataType::Duration(TimeUnit::Second) => {
            Box::new(PrimitiveCursor::<DurationSecondType>::new())
        }
        DataType::Duration(TimeUnit::Millisecond) => {
            Box::new(PrimitiveCursor::<DurationMillisecondType>::new())
        }
        DataType::Duration(TimeUnit::Microsecond) => {
            Box::new(PrimitiveCursor::<DurationMicrosecondType>::new())
        }
        DataType::Duration(TimeUnit::Nanosecond) => {
            Box::new(PrimitiveCursor::<DurationNanosecondType>::new())
        }
        other => {
            return Err(Error::InvalidArgumentError(format!(
                "column type {other} is not supported as a numeric grouping key"
            )));
        }
    };
    Ok(cursor)
}
