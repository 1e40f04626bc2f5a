//! Largest image that can coexist with the trailer.
//!
//! The answer depends on the upgrade strategy, because each strategy parks
//! different state at the tail of a slot.  The strategies differ only here;
//! every other trailer operation is strategy-agnostic.
//!
//! The scratch-mediated swap is the delicate case.  When the last sector
//! pair goes through scratch, the scratch sector must hold that sector's
//! payload *and* the whole scratch trailer.  If the first sector containing
//! trailer bytes in either slot is too small for the scratch trailer, the
//! image has to end early to make up the difference.

use flashmap::FlashArea;

use crate::geometry;
use crate::current_image;

/// Upgrade strategy, fixed by the integrator for the life of the device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Strategy {
    /// Three-way swap through a scratch partition.
    Scratch,
    /// Sector-shuffling swap within the slots, no scratch.
    Move,
    /// The staged image simply replaces the primary.
    Overwrite,
    /// Execute whichever slot holds the newer image.
    DirectXip,
    /// Images are copied to RAM before execution.
    RamLoad,
    SingleSlot,
    FirmwareLoader,
}

impl Strategy {
    pub fn uses_scratch(self) -> bool {
        matches!(self, Strategy::Scratch)
    }
}

/// The open slots the size oracle consults.  Only the strategies that use a
/// slot need it present.
pub struct LoaderState<'a, A: FlashArea> {
    pub strategy: Strategy,
    pub primary: &'a A,
    pub secondary: Option<&'a A>,
    pub scratch: Option<&'a A>,
}

impl<'a, A: FlashArea> LoaderState<'a, A> {
    /// Write unit governing trailer layout: the coarsest unit among the
    /// areas taking part in the swap.
    fn write_sz(&self) -> usize {
        let mut w = self.primary.align();
        if let Some(area) = self.secondary {
            w = w.max(area.align());
        }
        if let Some(area) = self.scratch {
            w = w.max(area.align());
        }
        w
    }
}

/// Exclusive upper bound on the image bytes that may be placed at the start
/// of `area`.
///
/// A return of zero means no image can pass.  The move strategy reports a
/// failed sector lookup this way rather than with an error; the caller's
/// image-too-large check then rejects whatever was staged, instead of an
/// oversize image slipping through.
pub fn max_image_size<A: FlashArea>(state: &LoaderState<'_, A>, area: &A) -> usize {
    match state.strategy {
        Strategy::Scratch => scratch_max_size(state, area),
        Strategy::Move => {
            let Some(status_off) = area.size().checked_sub(geometry::trailer_sz(area.align()))
            else {
                return 0;
            };
            match area.sector_containing(status_off) {
                Ok(sector) => sector.off,
                Err(_) => {
                    log::warn!(
                        "image {}: no sector descriptor for status area",
                        current_image()
                    );
                    0
                }
            }
        }
        Strategy::Overwrite | Strategy::DirectXip | Strategy::RamLoad => {
            geometry::swap_type_off(area)
        }
        Strategy::SingleSlot | Strategy::FirmwareLoader => geometry::status_off(area),
    }
}

/// End offset of the first sector holding trailer bytes in `slot`.
fn first_trailer_sector_end<A: FlashArea>(slot: &A, trailer_sz: usize) -> Option<usize> {
    let idx = geometry::first_trailer_sector(slot, trailer_sz).ok()?;
    let sector = slot.sector_at(idx).ok()?;
    Some(sector.end())
}

fn scratch_max_size<A: FlashArea>(state: &LoaderState<'_, A>, area: &A) -> usize {
    let write_sz = state.write_sz();
    let trailer_sz = geometry::trailer_sz(write_sz);
    let scratch_trailer_sz = geometry::scratch_trailer_sz(write_sz);
    let Some(trailer_off) = area.size().checked_sub(trailer_sz) else {
        return 0;
    };

    let mut first_end = match first_trailer_sector_end(state.primary, trailer_sz) {
        Some(end) => end,
        None => return 0,
    };
    if let Some(secondary) = state.secondary {
        match first_trailer_sector_end(secondary, trailer_sz) {
            Some(end) => first_end = first_end.max(end),
            None => return 0,
        }
    }

    // Trailer bytes landing in the first trailer sector.  If that is less
    // than a scratch trailer, the image is pushed down by the shortfall so
    // the last-sector swap still fits in one scratch sector.
    let in_first = first_end.saturating_sub(trailer_off);
    let padding = scratch_trailer_sz.saturating_sub(in_first);
    trailer_off.saturating_sub(padding)
}
