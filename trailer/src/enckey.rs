//! Per-slot encryption key storage.
//!
//! When images are encrypted, the key material for each slot rides along in
//! the trailer, just below the swap-type field, so an interrupted swap can
//! resume decrypting where it left off.  Two storage modes exist, chosen at
//! build time:
//!
//! - bare key (default): the 16-byte encrypted key is stored directly;
//! - `enc-tlv`: the whole 48-byte key TLV is stored, and reading a slot
//!   hands the blob to the external unwrap routine to recover the key.
//!
//! A slot whose every byte still reads as the erased value was never
//! written; it reads back as absent and no unwrap is attempted.

use flashmap::FlashArea;

use crate::fields::write_field;
use crate::geometry::{self, ENC_KEY_SZ};
use crate::{current_image, Result};

#[cfg(feature = "enc-tlv")]
use crate::geometry::ENC_TLV_SZ;

/// External key-unwrap routine.  Consumed, not implemented, here.
#[cfg(feature = "enc-tlv")]
pub trait KeyUnwrap {
    /// Recover the plaintext image key from its stored TLV.  Implementations
    /// report rejection with [`crate::Error::KeyUnwrap`].
    fn unwrap_key(&self, tlv: &[u8; ENC_TLV_SZ], key: &mut [u8; ENC_KEY_SZ]) -> Result<()>;
}

#[cfg(not(feature = "enc-tlv"))]
pub fn write_enc_key<A: FlashArea>(area: &mut A, slot: u8, key: &[u8; ENC_KEY_SZ]) -> Result<()> {
    log::trace!("image {}: saving key for slot {}", current_image(), slot);
    let off = geometry::enc_key_off(area, slot);
    let unit = geometry::enc_align(area.align());
    let pad = area.erased_val();
    write_field(area, off, key, pad, unit)
}

#[cfg(feature = "enc-tlv")]
pub fn write_enc_key<A: FlashArea>(area: &mut A, slot: u8, tlv: &[u8; ENC_TLV_SZ]) -> Result<()> {
    log::trace!("image {}: saving key TLV for slot {}", current_image(), slot);
    let off = geometry::enc_key_off(area, slot);
    let unit = geometry::enc_align(area.align());
    let pad = area.erased_val();
    write_field(area, off, tlv, pad, unit)
}

/// Read the key for `slot`, or `None` when the slot was never written.
#[cfg(not(feature = "enc-tlv"))]
pub fn read_enc_key<A: FlashArea>(area: &mut A, slot: u8) -> Result<Option<[u8; ENC_KEY_SZ]>> {
    let off = geometry::enc_key_off(area, slot);
    let mut key = [0u8; ENC_KEY_SZ];
    area.read(off, &mut key)?;
    let erased_val = area.erased_val();
    if key.iter().all(|&b| b == erased_val) {
        return Ok(None);
    }
    Ok(Some(key))
}

/// Read and unwrap the key for `slot`, or `None` when the slot was never
/// written (the unwrap routine is not invoked in that case).
#[cfg(feature = "enc-tlv")]
pub fn read_enc_key<A: FlashArea, U: KeyUnwrap>(
    area: &mut A,
    slot: u8,
    unwrap: &U,
) -> Result<Option<[u8; ENC_KEY_SZ]>> {
    let off = geometry::enc_key_off(area, slot);
    let mut tlv = [0u8; ENC_TLV_SZ];
    area.read(off, &mut tlv)?;
    let erased_val = area.erased_val();
    if tlv.iter().all(|&b| b == erased_val) {
        return Ok(None);
    }
    let mut key = [0u8; ENC_KEY_SZ];
    unwrap.unwrap_key(&tlv, &mut key)?;
    Ok(Some(key))
}
