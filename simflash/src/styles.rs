//! Flash styles.
//!
//! Various microcontrollers have various types of flash memories available
//! to them.  The layouts here are modeled on real parts and chosen to cover
//! the corners the trailer code cares about: small uniform sectors, large
//! uniform sectors with a coarse write unit, mixed sector sizes, and slots
//! whose write alignment differs from their partner's.

use flashmap::AreaId;

use crate::{AreaLayout, SimMap};

/// K64-style: small uniform sectors, byte-ish writes.
pub static K64_SLOT: AreaLayout = AreaLayout {
    write_size: 8,
    erase_size: 4 * 1024,
    sectors: 32,
    erased_val: 0xff,
};
pub static K64_SCRATCH: AreaLayout = AreaLayout {
    write_size: 8,
    erase_size: 4 * 1024,
    sectors: 1,
    erased_val: 0xff,
};

/// STM32H-style: a handful of large sectors and a 32-byte write unit, the
/// coarsest the trailer layout supports.
pub static STM32H_SLOT: AreaLayout = AreaLayout {
    write_size: 32,
    erase_size: 128 * 1024,
    sectors: 1,
    erased_val: 0xff,
};

/// External QSPI-style upgrade partition: sectors match the internal part
/// but the write unit is coarser, which drags the shared trailer layout up
/// to 16-byte units.
pub static EXT_UPGRADE: AreaLayout = AreaLayout {
    write_size: 16,
    erase_size: 4 * 1024,
    sectors: 32,
    erased_val: 0xff,
};

/// STM32F4-style mixed sector table for one 224 KiB slot.
pub static STM32F_SECTORS: [usize; 4] = [16 * 1024, 16 * 1024, 64 * 1024, 128 * 1024];

/// The common three-partition swap layout on a K64-style device.
pub fn k64_map() -> anyhow::Result<SimMap> {
    let mut map = SimMap::new();
    map.add(AreaId::ImagePrimary(0), &K64_SLOT)?;
    map.add(AreaId::ImageSecondary(0), &K64_SLOT)?;
    map.add(AreaId::ImageScratch, &K64_SCRATCH)?;
    Ok(map)
}

/// Internal primary, external upgrade slot, one internal scratch sector.
pub fn mixed_align_map() -> anyhow::Result<SimMap> {
    let mut map = SimMap::new();
    map.add(AreaId::ImagePrimary(0), &K64_SLOT)?;
    map.add(AreaId::ImageSecondary(0), &EXT_UPGRADE)?;
    map.add(AreaId::ImageScratch, &K64_SCRATCH)?;
    Ok(map)
}
