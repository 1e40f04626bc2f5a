//! Trailer geometry.
//!
//! Pure arithmetic: given the device write unit and an area's sector table,
//! where does every trailer field live, and how much room does the whole
//! record take?  Nothing here touches flash contents.
//!
//! Three alignment quantities drive the layout, all derived from the write
//! unit `w` (a power of two, 1..=32):
//!
//! - `magic_align(w)`: the 16-byte magic rounded up to `w`.
//! - `max_align(w)`: the unit of the one-byte flags and the swap size,
//!   `max(8, w)`.
//! - `enc_align(w)`: the per-slot key unit, the bare key (16) or the whole
//!   key TLV (48) rounded up to `w`.  Only present with `enc-images`.
//!
//! Status entries sit below the fixed fields and grow upward: three `w`-wide
//! cells per sector-pair operation, with room for [`STATUS_MAX_ENTRIES`]
//! operations in a slot trailer.  A scratch trailer holds exactly one
//! operation's worth, since scratch only ever stages one sector.

use flashmap::{AreaId, FlashArea};

use crate::Result;

pub const MAGIC_SZ: usize = 16;

/// Bare encryption key length.
pub const ENC_KEY_SZ: usize = 16;

/// Length of the stored key TLV when the whole blob is kept.
pub const ENC_TLV_SZ: usize = 48;

/// Progress markers recorded per sector-pair operation: pre-swap, post-move,
/// post-copy.
pub const STATUS_STATE_COUNT: usize = 3;

/// Maximum sector-pair operations per swap, and so the entry capacity of a
/// slot trailer.
pub const STATUS_MAX_ENTRIES: usize = 128;

/// Largest device write unit the layout supports.
pub const MAX_WRITE_ALIGN: usize = 32;

pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Write unit of the swap-size and single-byte fields.
pub const fn max_align(write_sz: usize) -> usize {
    if write_sz > 8 {
        write_sz
    } else {
        8
    }
}

pub const fn magic_align(write_sz: usize) -> usize {
    align_up(MAGIC_SZ, write_sz)
}

#[cfg(feature = "enc-images")]
pub const fn enc_align(write_sz: usize) -> usize {
    if cfg!(feature = "enc-tlv") {
        align_up(ENC_TLV_SZ, write_sz)
    } else {
        align_up(ENC_KEY_SZ, write_sz)
    }
}

/// Size of the fixed fields: key slots (if enabled), the four aligned
/// fields, and the magic.
pub const fn trailer_info_sz(write_sz: usize) -> usize {
    let fixed = 4 * max_align(write_sz) + magic_align(write_sz);
    #[cfg(feature = "enc-images")]
    let fixed = fixed + 2 * enc_align(write_sz);
    fixed
}

/// Size of one status entry: one cell per progress marker.
pub const fn status_entry_sz(write_sz: usize) -> usize {
    STATUS_STATE_COUNT * write_sz
}

pub const fn status_sz(write_sz: usize) -> usize {
    STATUS_MAX_ENTRIES * status_entry_sz(write_sz)
}

/// Full trailer size in a slot.
pub const fn trailer_sz(write_sz: usize) -> usize {
    status_sz(write_sz) + trailer_info_sz(write_sz)
}

/// Trailer size in the scratch area, which holds status for only the single
/// sector operation in flight.
pub const fn scratch_trailer_sz(write_sz: usize) -> usize {
    status_entry_sz(write_sz) + trailer_info_sz(write_sz)
}

pub fn magic_off<A: FlashArea + ?Sized>(area: &A) -> usize {
    area.size() - magic_align(area.align())
}

pub fn swap_size_off<A: FlashArea + ?Sized>(area: &A) -> usize {
    magic_off(area) - max_align(area.align())
}

pub fn image_ok_off<A: FlashArea + ?Sized>(area: &A) -> usize {
    swap_size_off(area) - max_align(area.align())
}

pub fn copy_done_off<A: FlashArea + ?Sized>(area: &A) -> usize {
    image_ok_off(area) - max_align(area.align())
}

pub fn swap_type_off<A: FlashArea + ?Sized>(area: &A) -> usize {
    copy_done_off(area) - max_align(area.align())
}

/// Offset of key slot `slot` (0 or 1).  The slots sit directly below the
/// swap-type field, slot 0 nearest it.
#[cfg(feature = "enc-images")]
pub fn enc_key_off<A: FlashArea + ?Sized>(area: &A, slot: u8) -> usize {
    swap_type_off(area) - (slot as usize + 1) * enc_align(area.align())
}

/// Where the status entries start.  For scratch this accounts for the
/// shorter scratch trailer.
pub fn status_off<A: FlashArea + ?Sized>(area: &A) -> usize {
    let sz = match area.id() {
        AreaId::ImageScratch => scratch_trailer_sz(area.align()),
        _ => trailer_sz(area.align()),
    };
    area.size() - sz
}

/// Index of the first sector that contains any trailer byte: walk backward
/// from the last sector, accumulating sizes until the trailer is covered.
/// Copes with sectors of differing size.
pub fn first_trailer_sector<A: FlashArea + ?Sized>(area: &A, trailer_sz: usize) -> Result<usize> {
    let mut covered = 0;
    let mut idx = area.sector_count();
    while idx > 0 {
        idx -= 1;
        covered += area.sector_at(idx)?.size;
        if covered >= trailer_sz {
            return Ok(idx);
        }
    }
    // The trailer does not fit in the area at all.
    Err(flashmap::Error::NoSuchSector.into())
}
