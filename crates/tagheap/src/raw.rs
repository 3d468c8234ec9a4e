//! Low-level primitives for arena memory operations.
//!
//! Tags and free-list links live inside the caller's buffer as
//! native-endian `usize` words. Every access is a bounds-checked slice
//! copy, so the arena needs no particular alignment and a corrupted
//! offset panics instead of reaching outside the buffer.

/// Size in bytes of one stored word.
pub(crate) const WORD: usize = std::mem::size_of::<usize>();

/// Read the word stored at `offset`.
///
/// # Panics
///
/// Panics if `offset + WORD` exceeds `bytes.len()`.
#[inline]
pub(crate) fn read_word(bytes: &[u8], offset: usize) -> usize {
    let mut word = [0u8; WORD];
    word.copy_from_slice(&bytes[offset..offset + WORD]);
    usize::from_ne_bytes(word)
}

/// Write `value` as a word at `offset`.
///
/// # Panics
///
/// Panics if `offset + WORD` exceeds `bytes.len()`.
#[inline]
pub(crate) fn write_word(bytes: &mut [u8], offset: usize, value: usize) {
    bytes[offset..offset + WORD].copy_from_slice(&value.to_ne_bytes());
}

/// Like [`read_word`], but returns `None` when the word is out of range.
pub(crate) fn try_read_word(bytes: &[u8], offset: usize) -> Option<usize> {
    let end = offset.checked_add(WORD)?;
    let src = bytes.get(offset..end)?;
    let mut word = [0u8; WORD];
    word.copy_from_slice(src);
    Some(usize::from_ne_bytes(word))
}
