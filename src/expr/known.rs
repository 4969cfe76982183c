//! This module contains a representation of concrete bit-vector values that
//! are known during symbolic execution and produced by model completion.
//!
//! # Representation
//!
//! Packet data has no natural word size, so a [`KnownBits`] is a bit-vector of
//! arbitrary width stored most-significant bit first. Bit numbering in the
//! public interface (for example [`KnownBits::slice`]) counts from the least
//! significant bit, matching how packet fields are usually specified.
//!
//! Addition, subtraction, comparison and the bitwise operations work for any
//! width. Multiplication goes through [`U256`] and is therefore limited to
//! [`MAX_ARITHMETIC_WIDTH_BITS`].

use std::fmt::{Display, Formatter};

use bitvec::prelude::{BitVec, Msb0};
use ethnum::U256;

use crate::{
    constant::{BYTE_SIZE_BITS, MAX_ARITHMETIC_WIDTH_BITS},
    error::execution::{Error, UnlocatedResult},
};

/// A concrete bit-vector of arbitrary width.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct KnownBits {
    bits: BitVec<u8, Msb0>,
}

impl KnownBits {
    /// Creates the zero-width value, used to represent an empty packet.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a value of `width` bits that are all unset.
    #[must_use]
    pub fn zero(width: usize) -> Self {
        let bits = BitVec::repeat(false, width);
        Self { bits }
    }

    /// Creates a value of `width` bits that are all set.
    #[must_use]
    pub fn ones(width: usize) -> Self {
        let bits = BitVec::repeat(true, width);
        Self { bits }
    }

    /// Creates a single-bit value from `value`.
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        let mut bits = BitVec::new();
        bits.push(value);
        Self { bits }
    }

    /// Creates a `width`-bit value from the low bits of `value`. Bits above
    /// 128 are zero.
    #[must_use]
    pub fn from_u128(value: u128, width: usize) -> Self {
        let bits = (0..width)
            .rev()
            .map(|index| index < 128 && (value >> index) & 1 == 1)
            .collect();
        Self { bits }
    }

    /// Creates a `width`-bit value from the low bits of `value`. Bits above
    /// 256 are zero.
    #[must_use]
    pub fn from_u256(value: U256, width: usize) -> Self {
        let bits = (0..width)
            .rev()
            .map(|index| {
                u32::try_from(index)
                    .ok()
                    .filter(|index| *index < 256)
                    .is_some_and(|index| (value >> index) & U256::ONE == U256::ONE)
            })
            .collect();
        Self { bits }
    }

    /// Creates a value from `bytes`, the first byte being the most significant.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let bits = BitVec::from_slice(bytes);
        Self { bits }
    }

    /// Gets the width of the value in bits.
    #[must_use]
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Checks if every bit of the value is unset.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.bits.not_any()
    }

    /// Gets the bit at `index`, counted from the least significant bit.
    #[must_use]
    pub fn bit(&self, index: usize) -> Option<bool> {
        let width = self.width();
        (index < width).then(|| self.bits[width - 1 - index])
    }

    /// Converts the value to a [`U256`].
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is wider than
    /// [`MAX_ARITHMETIC_WIDTH_BITS`].
    pub fn to_u256(&self) -> UnlocatedResult<U256> {
        if self.width() > MAX_ARITHMETIC_WIDTH_BITS {
            return Err(Error::ArithmeticTooWide {
                width: self.width(),
            });
        }

        Ok(self.bits.iter().by_vals().fold(U256::ZERO, |acc, bit| {
            let shifted = acc << 1u32;
            if bit {
                shifted | U256::ONE
            } else {
                shifted
            }
        }))
    }

    /// Converts the value to a [`u128`] if it fits.
    #[must_use]
    pub fn to_u128(&self) -> Option<u128> {
        let leading = self.width().saturating_sub(128);
        if self.bits[..leading].any() {
            return None;
        }

        Some(
            self.bits[leading..]
                .iter()
                .by_vals()
                .fold(0u128, |acc, bit| (acc << 1) | u128::from(bit)),
        )
    }

    /// Gets the bytes of the value, most significant first, padding the most
    /// significant byte with zeroes when the width is not a whole number of
    /// bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let padding = (BYTE_SIZE_BITS - self.width() % BYTE_SIZE_BITS) % BYTE_SIZE_BITS;
        let mut padded: BitVec<u8, Msb0> = BitVec::repeat(false, padding);
        padded.extend_from_bitslice(&self.bits);
        padded.into_vec()
    }

    /// Gets the hex encoding of [`Self::to_bytes`].
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Concatenates `low` below `self`.
    #[must_use]
    pub fn concat(&self, low: &Self) -> Self {
        let mut bits = self.bits.clone();
        bits.extend_from_bitslice(&low.bits);
        Self { bits }
    }

    /// Extracts the bits from `high` down to `low` inclusive, counted from the
    /// least significant bit.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the range is empty or out of bounds.
    pub fn slice(&self, high: usize, low: usize) -> UnlocatedResult<Self> {
        let width = self.width();
        if high < low || high >= width {
            return Err(Error::InvalidSlice { high, low, width });
        }

        let bits = self.bits[width - 1 - high..width - low].to_bitvec();
        Ok(Self { bits })
    }

    /// Wrapping addition.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the widths of the operands differ.
    pub fn add(&self, other: &Self) -> UnlocatedResult<Self> {
        self.check_width(other)?;
        Ok(self.ripple(other, false, false))
    }

    /// Wrapping subtraction.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the widths of the operands differ.
    pub fn sub(&self, other: &Self) -> UnlocatedResult<Self> {
        self.check_width(other)?;
        Ok(self.ripple(other, true, true))
    }

    /// Wrapping multiplication.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the widths of the operands differ or exceed
    /// [`MAX_ARITHMETIC_WIDTH_BITS`].
    pub fn mul(&self, other: &Self) -> UnlocatedResult<Self> {
        self.check_width(other)?;
        let product = self.to_u256()?.wrapping_mul(other.to_u256()?);
        Ok(Self::from_u256(product, self.width()))
    }

    /// Bitwise conjunction.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the widths of the operands differ.
    pub fn bit_and(&self, other: &Self) -> UnlocatedResult<Self> {
        self.zip_with(other, |a, b| a & b)
    }

    /// Bitwise disjunction.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the widths of the operands differ.
    pub fn bit_or(&self, other: &Self) -> UnlocatedResult<Self> {
        self.zip_with(other, |a, b| a | b)
    }

    /// Bitwise exclusive disjunction.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the widths of the operands differ.
    pub fn bit_xor(&self, other: &Self) -> UnlocatedResult<Self> {
        self.zip_with(other, |a, b| a ^ b)
    }

    /// Bitwise negation.
    #[must_use]
    pub fn bit_not(&self) -> Self {
        let bits = self.bits.iter().by_vals().map(|bit| !bit).collect();
        Self { bits }
    }

    /// Unsigned less-than.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the widths of the operands differ.
    pub fn ult(&self, other: &Self) -> UnlocatedResult<bool> {
        self.check_width(other)?;

        // Most significant bit first, so lexicographic order is numeric order.
        Ok(self.bits.iter().by_vals().lt(other.bits.iter().by_vals()))
    }

    /// Unsigned less-than-or-equal.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the widths of the operands differ.
    pub fn ule(&self, other: &Self) -> UnlocatedResult<bool> {
        self.check_width(other)?;
        Ok(self.bits.iter().by_vals().le(other.bits.iter().by_vals()))
    }

    /// Adds `other` to `self` bit by bit from the least significant end,
    /// optionally inverting `other` and starting with a carry.
    fn ripple(&self, other: &Self, invert_other: bool, carry_in: bool) -> Self {
        let width = self.width();
        let mut bits: BitVec<u8, Msb0> = BitVec::repeat(false, width);
        let mut carry = carry_in;
        for index in (0..width).rev() {
            let a = self.bits[index];
            let b = other.bits[index] ^ invert_other;
            bits.set(index, a ^ b ^ carry);
            carry = (a & b) | (carry & (a ^ b));
        }
        Self { bits }
    }

    fn zip_with(&self, other: &Self, op: impl Fn(bool, bool) -> bool) -> UnlocatedResult<Self> {
        self.check_width(other)?;
        let bits = self
            .bits
            .iter()
            .by_vals()
            .zip(other.bits.iter().by_vals())
            .map(|(a, b)| op(a, b))
            .collect();
        Ok(Self { bits })
    }

    fn check_width(&self, other: &Self) -> UnlocatedResult<()> {
        if self.width() == other.width() {
            Ok(())
        } else {
            Err(Error::WidthMismatch {
                expected: self.width(),
                found:    other.width(),
            })
        }
    }
}

/// Displays the value in the `<width>w0x<hex>` form.
impl Display for KnownBits {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}w0x{}", self.width(), self.to_hex())
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::expr::known::KnownBits;

    #[test]
    fn round_trips_through_integers() {
        let value = KnownBits::from_u128(0x1234, 16);
        assert_eq!(value.width(), 16);
        assert_eq!(value.to_u128(), Some(0x1234));
        assert_eq!(value.to_u256().unwrap(), U256::from(0x1234u32));
        assert_eq!(value.to_hex(), "1234");
    }

    #[test]
    fn pads_partial_bytes_at_the_front() {
        let value = KnownBits::from_u128(0b101, 3);
        assert_eq!(value.to_bytes(), vec![0b101]);
        assert_eq!(value.to_string(), "3w0x05");
    }

    #[test]
    fn arithmetic_wraps_at_the_width() -> anyhow::Result<()> {
        let max = KnownBits::ones(8);
        let one = KnownBits::from_u128(1, 8);

        assert!(max.add(&one)?.is_zero());
        assert_eq!(KnownBits::zero(8).sub(&one)?, max);
        assert_eq!(
            KnownBits::from_u128(16, 8).mul(&KnownBits::from_u128(17, 8))?,
            KnownBits::from_u128((16 * 17) % 256, 8)
        );

        Ok(())
    }

    #[test]
    fn arithmetic_works_beyond_word_sizes() -> anyhow::Result<()> {
        let wide = KnownBits::ones(300);
        let one = KnownBits::from_u128(1, 300);

        assert!(wide.add(&one)?.is_zero());
        assert!(one.ult(&wide)?);
        assert!(wide.mul(&one).is_err());

        Ok(())
    }

    #[test]
    fn slices_and_concatenates() -> anyhow::Result<()> {
        let high = KnownBits::from_u128(0xab, 8);
        let low = KnownBits::from_u128(0xcd, 8);
        let joined = high.concat(&low);

        assert_eq!(joined.to_u128(), Some(0xabcd));
        assert_eq!(joined.slice(15, 8)?, high);
        assert_eq!(joined.slice(7, 0)?, low);
        assert_eq!(joined.slice(3, 0)?.to_u128(), Some(0xd));
        assert!(joined.slice(16, 0).is_err());

        Ok(())
    }

    #[test]
    fn rejects_mismatched_widths() {
        let a = KnownBits::zero(8);
        let b = KnownBits::zero(16);
        assert!(a.add(&b).is_err());
        assert!(a.bit_and(&b).is_err());
    }
}
