//! Per-group accumulator slots.
//!
//! A slot is one group's state for one aggregate. The group maps store a
//! `Vec<Slot>` per group, in the same order as the aggregate function list;
//! each function knows which variant its slots hold and unpacks it through
//! the [`Carrier`] helpers, keeping the dispatcher untyped.

use datafusion_common::ScalarValue;
use vexel_hugeint::HugeInt;
use vexel_result::{Error, Result};

/// One group's state for one aggregate.
///
/// Numeric state is kept in a widened carrier (`i64` for the signed and
/// temporal families, `u64` for unsigned, `f64` for floats, [`HugeInt`] for
/// 64-bit totals and decimals). `None` means the slot has never seen a
/// non-null input value and summarizes as NULL.
#[derive(Clone, Debug)]
pub enum Slot {
    /// COUNT / COUNT(*) totals; never null.
    Count(u64),
    Int(Option<i64>),
    UInt(Option<u64>),
    Float(Option<f64>),
    Wide(Option<HugeInt>),
    /// Owned byte extremum or captured group value; strings store their
    /// utf-8 bytes.
    Bytes(Option<Vec<u8>>),
    /// AVG state: running sum plus non-null count.
    IntPair(Option<(i64, u64)>),
    UIntPair(Option<(u64, u64)>),
    FloatPair(Option<(f64, u64)>),
    WidePair(Option<(HugeInt, u64)>),
    /// Captured group value for types without a typed cursor; the scalar
    /// encodes its own nullness.
    Scalar(ScalarValue),
}

impl Slot {
    fn variant_name(&self) -> &'static str {
        match self {
            Slot::Count(_) => "Count",
            Slot::Int(_) => "Int",
            Slot::UInt(_) => "UInt",
            Slot::Float(_) => "Float",
            Slot::Wide(_) => "Wide",
            Slot::Bytes(_) => "Bytes",
            Slot::IntPair(_) => "IntPair",
            Slot::UIntPair(_) => "UIntPair",
            Slot::FloatPair(_) => "FloatPair",
            Slot::WidePair(_) => "WidePair",
            Slot::Scalar(_) => "Scalar",
        }
    }

    pub(crate) fn mismatch(&self, expected: &'static str) -> Error {
        Error::Internal(format!(
            "aggregate slot holds {} where {expected} was expected",
            self.variant_name()
        ))
    }

    pub(crate) fn count(&self) -> Result<u64> {
        match self {
            Slot::Count(value) => Ok(*value),
            other => Err(other.mismatch("Count")),
        }
    }

    pub(crate) fn count_mut(&mut self) -> Result<&mut u64> {
        match self {
            Slot::Count(value) => Ok(value),
            other => Err(other.mismatch("Count")),
        }
    }

    pub(crate) fn bytes(&self) -> Result<&Option<Vec<u8>>> {
        match self {
            Slot::Bytes(value) => Ok(value),
            other => Err(other.mismatch("Bytes")),
        }
    }

    pub(crate) fn bytes_mut(&mut self) -> Result<&mut Option<Vec<u8>>> {
        match self {
            Slot::Bytes(value) => Ok(value),
            other => Err(other.mismatch("Bytes")),
        }
    }

    pub(crate) fn scalar(&self) -> Result<&ScalarValue> {
        match self {
            Slot::Scalar(value) => Ok(value),
            other => Err(other.mismatch("Scalar")),
        }
    }
}

/// Widened accumulator type shared by a family of input types.
///
/// The carrier ties a [`Slot`] variant to the arithmetic the aggregate
/// functions need: wrapping totals for the integer carriers, plain IEEE
/// addition for floats, and checked 128-bit addition for [`HugeInt`].
pub trait Carrier: Copy + PartialOrd {
    fn slot(value: Option<Self>) -> Slot;

    fn get(slot: &Slot) -> Result<Option<Self>>;

    fn get_mut(slot: &mut Slot) -> Result<&mut Option<Self>>;

    fn pair_slot(value: Option<(Self, u64)>) -> Slot;

    fn pair(slot: &Slot) -> Result<Option<(Self, u64)>>;

    fn pair_mut(slot: &mut Slot) -> Result<&mut Option<(Self, u64)>>;

    /// Accumulating addition; wraps for the integer carriers.
    fn accumulate(self, rhs: Self) -> Self;

    fn to_f64(self) -> f64;
}

impl Carrier for i64 {
    fn slot(value: Option<Self>) -> Slot {
        Slot::Int(value)
    }

    fn get(slot: &Slot) -> Result<Option<Self>> {
        match slot {
            Slot::Int(value) => Ok(*value),
            other => Err(other.mismatch("Int")),
        }
    }

    fn get_mut(slot: &mut Slot) -> Result<&mut Option<Self>> {
        match slot {
            Slot::Int(value) => Ok(value),
            other => Err(other.mismatch("Int")),
        }
    }

    fn pair_slot(value: Option<(Self, u64)>) -> Slot {
        Slot::IntPair(value)
    }

    fn pair(slot: &Slot) -> Result<Option<(Self, u64)>> {
        match slot {
            Slot::IntPair(value) => Ok(*value),
            other => Err(other.mismatch("IntPair")),
        }
    }

    fn pair_mut(slot: &mut Slot) -> Result<&mut Option<(Self, u64)>> {
        match slot {
            Slot::IntPair(value) => Ok(value),
            other => Err(other.mismatch("IntPair")),
        }
    }

    fn accumulate(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Carrier for u64 {
    fn slot(value: Option<Self>) -> Slot {
        Slot::UInt(value)
    }

    fn get(slot: &Slot) -> Result<Option<Self>> {
        match slot {
            Slot::UInt(value) => Ok(*value),
            other => Err(other.mismatch("UInt")),
        }
    }

    fn get_mut(slot: &mut Slot) -> Result<&mut Option<Self>> {
        match slot {
            Slot::UInt(value) => Ok(value),
            other => Err(other.mismatch("UInt")),
        }
    }

    fn pair_slot(value: Option<(Self, u64)>) -> Slot {
        Slot::UIntPair(value)
    }

    fn pair(slot: &Slot) -> Result<Option<(Self, u64)>> {
        match slot {
            Slot::UIntPair(value) => Ok(*value),
            other => Err(other.mismatch("UIntPair")),
        }
    }

    fn pair_mut(slot: &mut Slot) -> Result<&mut Option<(Self, u64)>> {
        match slot {
            Slot::UIntPair(value) => Ok(value),
            other => Err(other.mismatch("UIntPair")),
        }
    }

    fn accumulate(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Carrier for f64 {
    fn slot(value: Option<Self>) -> Slot {
        Slot::Float(value)
    }

    fn get(slot: &Slot) -> Result<Option<Self>> {
        match slot {
            Slot::Float(value) => Ok(*value),
            other => Err(other.mismatch("Float")),
        }
    }

    fn get_mut(slot: &mut Slot) -> Result<&mut Option<Self>> {
        match slot {
            Slot::Float(value) => Ok(value),
            other => Err(other.mismatch("Float")),
        }
    }

    fn pair_slot(value: Option<(Self, u64)>) -> Slot {
        Slot::FloatPair(value)
    }

    fn pair(slot: &Slot) -> Result<Option<(Self, u64)>> {
        match slot {
            Slot::FloatPair(value) => Ok(*value),
            other => Err(other.mismatch("FloatPair")),
        }
    }

    fn pair_mut(slot: &mut Slot) -> Result<&mut Option<(Self, u64)>> {
        match slot {
            Slot::FloatPair(value) => Ok(value),
            other => Err(other.mismatch("FloatPair")),
        }
    }

    fn accumulate(self, rhs: Self) -> Self {
        self + rhs
    }

    fn to_f64(self) -> f64 {
        self
    }
}

impl Carrier for HugeInt {
    fn slot(value: Option<Self>) -> Slot {
        Slot::Wide(value)
    }

    fn get(slot: &Slot) -> Result<Option<Self>> {
        match slot {
            Slot::Wide(value) => Ok(*value),
            other => Err(other.mismatch("Wide")),
        }
    }

    fn get_mut(slot: &mut Slot) -> Result<&mut Option<Self>> {
        match slot {
            Slot::Wide(value) => Ok(value),
            other => Err(other.mismatch("Wide")),
        }
    }

    fn pair_slot(value: Option<(Self, u64)>) -> Slot {
        Slot::WidePair(value)
    }

    fn pair(slot: &Slot) -> Result<Option<(Self, u64)>> {
        match slot {
            Slot::WidePair(value) => Ok(*value),
            other => Err(other.mismatch("WidePair")),
        }
    }

    fn pair_mut(slot: &mut Slot) -> Result<&mut Option<(Self, u64)>> {
        match slot {
            Slot::WidePair(value) => Ok(value),
            other => Err(other.mismatch("WidePair")),
        }
    }

    fn accumulate(self, rhs: Self) -> Self {
        self + rhs
    }

    fn to_f64(self) -> f64 {
        HugeInt::to_f64(self)
    }
}
