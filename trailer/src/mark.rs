//! Requesting and confirming upgrades.
//!
//! These are the trailer transitions driven from outside a swap: staging a
//! request in the secondary slot's trailer, and confirming a freshly swapped
//! image in the primary's so the next boot does not revert it.  Both follow
//! the fixed write order, with the magic going down last.

use flashmap::FlashArea;

use crate::fields::{self, FlagState, SwapType};
use crate::geometry;
use crate::magic::MagicState;
use crate::{current_image, Error, Result};

/// Ask the boot engine to swap in the image staged in this slot's partner.
/// Runs against the secondary slot's trailer.  A `permanent` request skips
/// the test boot and confirms up front.
pub fn mark_pending<A: FlashArea>(area: &mut A, permanent: bool) -> Result<()> {
    let state = fields::read_swap_state(area)?;
    match state.magic {
        // Already requested; nothing to redo.
        MagicState::Good => Ok(()),
        MagicState::Unset => write_request(area, permanent),
        MagicState::Bad | MagicState::Any => {
            // Leftovers of an interrupted trailer write.  Erase the trailer
            // sectors and stage the request cleanly.
            log::warn!("image {}: corrupt request trailer, erasing", current_image());
            erase_trailer(area)?;
            write_request(area, permanent)
        }
    }
}

fn write_request<A: FlashArea>(area: &mut A, permanent: bool) -> Result<()> {
    let swap_type = if permanent { SwapType::Permanent } else { SwapType::Test };
    fields::write_swap_type(area, swap_type)?;
    if permanent {
        fields::write_image_ok(area)?;
    }
    // Magic last; it is what makes the request visible.
    fields::write_magic(area)
}

fn erase_trailer<A: FlashArea>(area: &mut A) -> Result<()> {
    let trailer_sz = geometry::trailer_sz(area.align());
    let first = geometry::first_trailer_sector(area, trailer_sz)?;
    let off = area.sector_at(first)?.off;
    area.erase(off, area.size() - off)?;
    Ok(())
}

/// Accept the currently running image: record `image_ok` in the primary
/// slot's trailer so the swap is not reverted on the next boot.
pub fn mark_confirmed<A: FlashArea>(area: &mut A) -> Result<()> {
    let state = fields::read_swap_state(area)?;
    match state.magic {
        // No swap record at all; nothing that could revert.
        MagicState::Unset => Ok(()),
        MagicState::Good => match state.image_ok {
            FlagState::Set => Ok(()),
            FlagState::Unset => fields::write_image_ok(area),
            FlagState::Bad => Err(Error::BadMagic),
        },
        MagicState::Bad | MagicState::Any => Err(Error::BadMagic),
    }
}
