//! Byte juggling between raw info results / transfer buffers and typed
//! values.

use std::mem;
use std::ptr;
use std::slice;

use crate::error::{Error, Result};
use crate::types::ClPrm;

/// Decodes a single scalar from a raw info result, validating the declared
/// size against the expected one.
pub fn scalar_from_bytes<T: ClPrm>(bytes: &[u8]) -> Result<T> {
    if bytes.len() != mem::size_of::<T>() {
        return Err(Error::InvalidData(format!(
            "scalar size mismatch: expected {} bytes, native reported {}",
            mem::size_of::<T>(),
            bytes.len()
        )));
    }
    Ok(unsafe { ptr::read_unaligned(bytes.as_ptr() as *const T) })
}

/// Decodes an array-shaped info result, validating that the declared size is
/// a whole number of elements.
pub fn vec_from_bytes<T: ClPrm>(bytes: &[u8]) -> Result<Vec<T>> {
    let elem = mem::size_of::<T>();
    if bytes.len() % elem != 0 {
        return Err(Error::InvalidData(format!(
            "array size mismatch: {} bytes is not a multiple of element size {}",
            bytes.len(),
            elem
        )));
    }
    let count = bytes.len() / elem;
    let mut out = Vec::with_capacity(count);
    for chunk in bytes.chunks(elem) {
        out.push(unsafe { ptr::read_unaligned(chunk.as_ptr() as *const T) });
    }
    Ok(out)
}

/// Decodes a native string info result, trimming the trailing nul(s) the
/// native API appends.
pub fn string_from_bytes(bytes: &[u8]) -> Result<String> {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or_else(|| bytes.len());
    String::from_utf8(bytes[..end].to_vec()).map_err(Error::from)
}

/// Views a typed slice as raw bytes for a native transfer.
pub fn as_bytes<T: ClPrm>(slice: &[T]) -> &[u8] {
    unsafe { slice::from_raw_parts(slice.as_ptr() as *const u8, slice.len() * mem::size_of::<T>()) }
}

/// Mutable byte view of a typed slice.
pub fn as_bytes_mut<T: ClPrm>(slice: &mut [T]) -> &mut [u8] {
    unsafe {
        slice::from_raw_parts_mut(slice.as_mut_ptr() as *mut u8, slice.len() * mem::size_of::<T>())
    }
}

/// Rebuilds a typed vector from bytes produced by a native transfer.
pub fn vec_from_transfer<T: ClPrm>(bytes: Vec<u8>) -> Result<Vec<T>> {
    vec_from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_decoding_validates_size() {
        let bytes = 42u32.to_ne_bytes();
        assert_eq!(scalar_from_bytes::<u32>(&bytes).unwrap(), 42);
        assert!(matches!(
            scalar_from_bytes::<u64>(&bytes),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn strings_are_nul_trimmed() {
        assert_eq!(string_from_bytes(b"OpenCL 1.2\0").unwrap(), "OpenCL 1.2");
        assert_eq!(string_from_bytes(b"").unwrap(), "");
    }

    #[test]
    fn typed_byte_views_round_trip() {
        let vals = [1u16, 2, 3];
        let bytes = as_bytes(&vals);
        assert_eq!(bytes.len(), 6);
        assert_eq!(vec_from_bytes::<u16>(bytes).unwrap(), vec![1, 2, 3]);
    }
}
