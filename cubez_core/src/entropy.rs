use crate::error::{CubezError, Result};

/// Lossless byte-level entropy backend (SPEC_FULL.md §4.2).
///
/// Uses owned-`Vec` ownership transfer rather than an in-place
/// `encode_in_place(buf, len, cap)` contract (DESIGN.md, Open Question 4)
/// since the caller is about to replace the buffer's contents wholesale
/// anyway and this avoids unsafe raw-buffer juggling for a component with
/// no state carried between calls.
pub trait EntropyBackend: Send + Sync {
    /// Short identifier written into the archive's `Encoder:` field.
    fn name(&self) -> &'static str;

    /// Encode `data`, failing with [`CubezError::Resource`] if the result
    /// would exceed `cap` bytes (the flush path's `2 * BUFFERSIZE` ceiling).
    fn encode(&self, data: &[u8], cap: usize) -> Result<Vec<u8>>;

    /// Decode `data` into at most `out_cap` bytes, failing with
    /// [`CubezError::Corruption`] on a malformed or over-long stream.
    fn decode(&self, data: &[u8], out_cap: usize) -> Result<Vec<u8>>;
}

/// Checks a freshly encoded buffer against the flush path's capacity rule.
pub fn check_cap(encoded: &[u8], cap: usize) -> Result<()> {
    if encoded.len() > cap {
        return Err(CubezError::Resource(format!(
            "entropy encoder produced {} bytes, exceeding cap {}",
            encoded.len(),
            cap
        )));
    }
    Ok(())
}
