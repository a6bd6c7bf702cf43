//! Struct codec - fixed-layout records ↔ host values
//!
//! Every record exchanged with the native library has a `#[repr(C)]` raw
//! mirror with explicit padding. `BinaryRecord` converts between the raw bytes
//! and the host value:
//! - `decode()`: bytes → value; a buffer shorter than the layout panics
//! - `encode()` / `encode_into()`: value → bytes in the native layout
//!
//! Pointer fields decode to [`ForeignPtr`], which records who owns the
//! pointee; encoding writes the raw address back unchanged.

use bytemuck::Pod;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Record validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// A field value cannot be represented in the native layout
    #[error("{record}.{field} = {value} is out of range (expected {min}..={max})")]
    OutOfRange {
        record: &'static str,
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// A fixed-layout record shared with the native library
pub trait BinaryRecord: Sized {
    /// Raw `#[repr(C)]` mirror of the native struct
    type Raw: Pod;

    /// C type name, used in diagnostics
    const NAME: &'static str;

    /// Size of the native layout in bytes
    const SIZE: usize = std::mem::size_of::<Self::Raw>();

    fn from_raw(raw: &Self::Raw) -> Self;

    fn to_raw(&self) -> Self::Raw;

    /// Decode from the start of `bytes`; trailing bytes are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than [`Self::SIZE`].
    #[track_caller]
    fn decode(bytes: &[u8]) -> Self {
        check_len::<Self>(bytes.len(), "decode");
        let raw: Self::Raw = bytemuck::pod_read_unaligned(&bytes[..Self::SIZE]);
        Self::from_raw(&raw)
    }

    fn encode(&self) -> Vec<u8> {
        bytemuck::bytes_of(&self.to_raw()).to_vec()
    }

    /// Write the native layout into the start of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`Self::SIZE`].
    #[track_caller]
    fn encode_into(&self, out: &mut [u8]) {
        check_len::<Self>(out.len(), "encode_into");
        out[..Self::SIZE].copy_from_slice(bytemuck::bytes_of(&self.to_raw()));
    }

    /// Read a record straight out of native memory.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of [`Self::SIZE`] bytes.
    unsafe fn read_from(ptr: *const Self::Raw) -> Self {
        Self::from_raw(&std::ptr::read_unaligned(ptr))
    }
}

#[track_caller]
fn check_len<R: BinaryRecord>(len: usize, operation: &str) {
    if len < R::SIZE {
        panic!(
            "{} {}: buffer of {} bytes is shorter than the {}-byte layout",
            R::NAME,
            operation,
            len,
            R::SIZE
        );
    }
}

/// Validate that `value` fits a `u8` field
pub(crate) fn component_u8(record: &'static str, field: &'static str, value: i64) -> CodecResult<u8> {
    u8::try_from(value).map_err(|_| CodecError::OutOfRange {
        record,
        field,
        value,
        min: 0,
        max: u8::MAX as i64,
    })
}

/// Who is responsible for the memory behind a pointer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Owned by the native library; valid only while the owning record lives
    Foreign,
    /// Allocated by the caller, who must release it
    Caller,
    /// Lent for the duration of one call
    Borrowed,
}

/// A pointer field read out of a record
pub struct ForeignPtr<T> {
    addr: usize,
    ownership: Ownership,
    _pointee: PhantomData<*const T>,
}

impl<T> ForeignPtr<T> {
    pub fn new(addr: usize, ownership: Ownership) -> Self {
        Self {
            addr,
            ownership,
            _pointee: PhantomData,
        }
    }

    /// A foreign-owned pointer, the classification used when decoding
    pub fn foreign(addr: usize) -> Self {
        Self::new(addr, Ownership::Foreign)
    }

    pub fn null() -> Self {
        Self::foreign(0)
    }

    pub fn addr(&self) -> usize {
        self.addr
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_null(&self) -> bool {
        self.addr == 0
    }

    pub fn as_ptr(&self) -> *const T {
        self.addr as *const T
    }
}

impl<T> Clone for ForeignPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ForeignPtr<T> {}

impl<T> PartialEq for ForeignPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr && self.ownership == other.ownership
    }
}

impl<T> Eq for ForeignPtr<T> {}

impl<T> fmt::Debug for ForeignPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForeignPtr({:#x}, {:?})", self.addr, self.ownership)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[repr(C)]
    #[derive(Clone, Copy, Zeroable, Pod)]
    struct RawPair {
        a: u16,
        _pad: [u8; 2],
        b: i32,
    }

    #[derive(Debug, PartialEq)]
    struct Pair {
        a: u16,
        b: i32,
    }

    impl BinaryRecord for Pair {
        type Raw = RawPair;
        const NAME: &'static str = "Pair";

        fn from_raw(raw: &RawPair) -> Self {
            Pair { a: raw.a, b: raw.b }
        }

        fn to_raw(&self) -> RawPair {
            RawPair {
                a: self.a,
                _pad: [0; 2],
                b: self.b,
            }
        }
    }

    #[test]
    fn test_size_includes_padding() {
        assert_eq!(Pair::SIZE, 8);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut bytes = Pair { a: 7, b: -3 }.encode();
        bytes.extend_from_slice(&[0xAA; 4]);
        assert_eq!(Pair::decode(&bytes), Pair { a: 7, b: -3 });
    }

    #[test]
    #[should_panic(expected = "Pair decode: buffer of 5 bytes is shorter than the 8-byte layout")]
    fn test_short_buffer_panics() {
        Pair::decode(&[0; 5]);
    }

    #[test]
    #[should_panic(expected = "shorter than the 8-byte layout")]
    fn test_encode_into_short_buffer_panics() {
        let mut out = [0u8; 4];
        Pair { a: 1, b: 2 }.encode_into(&mut out);
    }

    #[test]
    fn test_encode_into_leaves_tail_untouched() {
        let mut out = [0xFFu8; 10];
        Pair { a: 1, b: 2 }.encode_into(&mut out);
        assert_eq!(&out[8..], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_component_u8_bounds() {
        assert_eq!(component_u8("SDL_Color", "r", 255), Ok(255));
        assert_eq!(
            component_u8("SDL_Color", "g", 256),
            Err(CodecError::OutOfRange {
                record: "SDL_Color",
                field: "g",
                value: 256,
                min: 0,
                max: 255,
            })
        );
        assert!(component_u8("SDL_Color", "b", -1).is_err());
    }

    #[test]
    fn test_foreign_ptr_classification() {
        let ptr = ForeignPtr::<u8>::foreign(0x1000);
        assert_eq!(ptr.ownership(), Ownership::Foreign);
        assert!(!ptr.is_null());
        assert!(ForeignPtr::<u8>::null().is_null());
        assert_eq!(format!("{:?}", ptr), "ForeignPtr(0x1000, Foreign)");
    }
}
