//! Locating the live status record after a reset.
//!
//! A swap interrupted by power loss leaves its progress record in one of two
//! places.  While a sector pair is staged through scratch, the record (and
//! its magic) lives in the scratch trailer; once the pair lands, it lives in
//! the primary slot's trailer.  The secondary slot never holds it: the magic
//! migrates toward primary or scratch as the swap advances, so probing the
//! secondary could only find a stale request, never progress.
//!
//! The probe order therefore is scratch first (when the strategy has one),
//! then primary.  The first good magic wins and the still-open handle is
//! handed to the caller, who owns closing it.

use flashmap::{AreaId, FlashArea, FlashMap};
use heapless::Vec;

use crate::geometry::{STATUS_MAX_ENTRIES, STATUS_STATE_COUNT};
use crate::magic::MagicState;
use crate::sizing::Strategy;
use crate::{current_image, fields, Error, Result};

/// Find the partition holding the in-progress swap record for the given
/// image.  On success the returned area is open and positioned to be read;
/// on failure no handle stays open.
pub fn find_status<M: FlashMap>(map: &M, image_index: u8, strategy: Strategy) -> Result<M::Area> {
    let mut probe: Vec<AreaId, 2> = Vec::new();
    if strategy.uses_scratch() {
        probe.push(AreaId::ImageScratch).unwrap();
    }
    probe.push(AreaId::ImagePrimary(image_index)).unwrap();

    for id in probe {
        let mut area = map.open(id)?;
        if fields::read_magic(&mut area)? == MagicState::Good {
            log::debug!("image {}: status record in {:?}", current_image(), id);
            return Ok(area);
        }
        // Not this one; the handle closes on drop.
    }

    log::debug!("image {}: no status record", current_image());
    Err(Error::StatusNotFound)
}

/// How many status entries the given area holds for this image: one
/// operation's worth in scratch, the full set in a slot.  `None` when the
/// area does not belong to the image.
pub fn status_entries<A: FlashArea>(image_index: u8, area: &A) -> Option<usize> {
    match area.id() {
        AreaId::ImageScratch => Some(STATUS_STATE_COUNT),
        AreaId::ImagePrimary(idx) | AreaId::ImageSecondary(idx) if idx == image_index => {
            Some(STATUS_MAX_ENTRIES * STATUS_STATE_COUNT)
        }
        _ => None,
    }
}
