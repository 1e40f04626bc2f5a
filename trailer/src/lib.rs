//! Image upgrade trailer bookkeeping.
//!
//! An upgrade between two flash slots has to survive power loss at any
//! instant.  The record that makes this possible is the *trailer*: a small
//! amount of metadata placed at the very end of each slot, written strictly
//! field by field as the swap advances, and only ever trusted once its magic
//! number is in place.
//!
//! Growing downward from the end of a slot, the trailer looks like this (each
//! box starts on a write boundary of the device):
//!
//! +--------------------------------+
//! | status entries, growing upward |
//! |        ...                     |
//! | [enc key or TLV, slot 1]       |  (enc-images only)
//! | [enc key or TLV, slot 0]       |
//! | swap type                      |
//! | copy done                      |
//! | image ok                       |
//! | swap size                      |
//! | magic                          |  <- end of the slot
//! +--------------------------------+
//!
//! The status entries record per-sector swap progress; the fields above them
//! record the intent and outcome of the whole operation.  A scratch
//! partition, when the swap strategy uses one, carries the same record but
//! with room for only a single sector's worth of status, since scratch only
//! ever holds the one sector currently in flight.
//!
//! Everything here is driven by three facts about the flash:
//!
//! - Writes have a minimum size and alignment, anywhere from 1 to 32 bytes.
//!   Every field is padded out to a write unit so it can be written alone.
//! - A written cell cannot change again until its whole sector is erased.
//!   Fields are therefore written at most once per swap step, and the magic
//!   is always written last: its validity vouches for everything before it.
//! - Sectors within one slot can differ in size, so the trailer may straddle
//!   a mix of small and large sectors at the slot's tail.
//!
//! This crate computes the layout, reads and writes the individual fields,
//! finds the live status record after an unexpected reset, and reports how
//! large an image can be without colliding with the trailer.  It does not
//! decide what to boot, verify signatures, or drive the flash itself; those
//! belong to the outer engine and the [`flashmap`] abstraction.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

use core::sync::atomic::{AtomicU8, Ordering};

pub mod fih;
pub mod fields;
pub mod geometry;
pub mod magic;
pub mod mark;
pub mod sizing;
pub mod status;

#[cfg(feature = "enc-images")]
pub mod enckey;

pub use fields::{FlagState, SwapState, SwapType};
pub use geometry::{status_off, status_sz, trailer_sz};
pub use magic::MagicState;
pub use sizing::{max_image_size, LoaderState, Strategy};
pub use status::{find_status, status_entries};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    /// The flash driver failed; surfaced unchanged.
    Flash(flashmap::Error),
    /// No probed partition carried a good magic.
    StatusNotFound,
    /// The trailer magic is present but not the expected pattern.
    BadMagic,
    /// The external key-unwrap routine rejected a stored key TLV.
    #[cfg(feature = "enc-tlv")]
    KeyUnwrap,
}

impl From<flashmap::Error> for Error {
    fn from(e: flashmap::Error) -> Self {
        Error::Flash(e)
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Image index used as context in log records.
///
/// Set once per boot by the outer driver, before any trailer operation runs.
/// Nothing in this crate reads it for control flow.
static CURRENT_IMAGE: AtomicU8 = AtomicU8::new(0);

pub fn set_current_image(image: u8) {
    CURRENT_IMAGE.store(image, Ordering::Relaxed);
}

pub fn current_image() -> u8 {
    CURRENT_IMAGE.load(Ordering::Relaxed)
}
