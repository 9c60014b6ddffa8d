//! Per-point payload and its fixed-size on-disk encoding.
//!
//! Every lattice point owns one [`Cell`] with two independent slots. Whether
//! the slots are read as vertex data or as the up/right edges leaving the
//! point is a convention of the caller; storage is identical.

use std::fmt;

/// Fixed-size scalar stored in a cell slot.
///
/// `encode` writes exactly `ENCODED_LEN` bytes and `decode` reads exactly
/// `ENCODED_LEN` bytes. Both panic if handed a shorter slice; the pager only
/// calls them on buffers whose length it has already checked.
pub trait CellValue: Copy + fmt::Debug + 'static {
    /// Bytes occupied by one encoded value.
    const ENCODED_LEN: usize;

    fn encode(&self, out: &mut [u8]);

    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_cell_value_le {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CellValue for $ty {
                const ENCODED_LEN: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn encode(&self, out: &mut [u8]) {
                    out[..Self::ENCODED_LEN].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0_u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::ENCODED_LEN]);
                    Self::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_cell_value_le!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl CellValue for bool {
    const ENCODED_LEN: usize = 1;

    #[inline]
    fn encode(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    #[inline]
    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// Two payload slots attached to one lattice point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell<V> {
    pub vertical: V,
    pub horizontal: V,
}

impl<V> Cell<V> {
    #[inline]
    #[must_use]
    pub const fn new(vertical: V, horizontal: V) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }
}

impl<V> From<(V, V)> for Cell<V> {
    #[inline]
    fn from((vertical, horizontal): (V, V)) -> Self {
        Self::new(vertical, horizontal)
    }
}

impl<V: CellValue> Cell<V> {
    /// Bytes occupied by one encoded cell (`vertical` then `horizontal`).
    pub const ENCODED_LEN: usize = 2 * V::ENCODED_LEN;

    /// Write this cell into the first `ENCODED_LEN` bytes of `out`.
    #[inline]
    pub fn encode_into(&self, out: &mut [u8]) {
        let (vertical, horizontal) = out[..Self::ENCODED_LEN].split_at_mut(V::ENCODED_LEN);
        self.vertical.encode(vertical);
        self.horizontal.encode(horizontal);
    }

    /// Read a cell from the first `ENCODED_LEN` bytes of `bytes`.
    #[inline]
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            vertical: V::decode(&bytes[..V::ENCODED_LEN]),
            horizontal: V::decode(&bytes[V::ENCODED_LEN..Self::ENCODED_LEN]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_len_matches_primitive_width() {
        assert_eq!(<u8 as CellValue>::ENCODED_LEN, 1);
        assert_eq!(<i32 as CellValue>::ENCODED_LEN, 4);
        assert_eq!(<f64 as CellValue>::ENCODED_LEN, 8);
        assert_eq!(Cell::<f64>::ENCODED_LEN, 16, "case=cell_is_two_slots");
        assert_eq!(Cell::<bool>::ENCODED_LEN, 2);
    }

    #[test]
    fn cell_layout_is_vertical_then_horizontal_little_endian() {
        let cell = Cell::new(0x0102_u16, 0x0304_u16);
        let mut out = [0_u8; 4];
        cell.encode_into(&mut out);
        assert_eq!(out, [0x02, 0x01, 0x04, 0x03], "case=le_layout");
        assert_eq!(Cell::<u16>::decode(&out), cell);
    }

    #[test]
    fn float_payload_survives_encoding() {
        let cell = Cell::new(-0.25_f64, f64::MAX);
        let mut out = vec![0_u8; Cell::<f64>::ENCODED_LEN];
        cell.encode_into(&mut out);
        let back = Cell::<f64>::decode(&out);
        assert_eq!(back.vertical, -0.25);
        assert_eq!(back.horizontal, f64::MAX);
    }

    #[test]
    fn bool_decodes_any_nonzero_as_true() {
        assert!(bool::decode(&[7]));
        assert!(!bool::decode(&[0]));
    }

    #[test]
    fn tuple_conversion_orders_slots() {
        let cell: Cell<i8> = (3, -4).into();
        assert_eq!(cell.vertical, 3);
        assert_eq!(cell.horizontal, -4);
    }
}
