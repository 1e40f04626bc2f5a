//! Simulated flash partitions.
//!
//! The NOR-type flashes used in microcontrollers differ quite a bit in the
//! constraints they impose, and the trailer layout code exists precisely to
//! absorb that diversity.  This simulator captures the properties that
//! matter to it:
//!
//! - a minimum write size, enforced on offset and length;
//! - write-once cells: a byte written since its last erase cannot be
//!   written again, which is how real parts corrupt data when a layout bug
//!   lands two fields in one write unit;
//! - erase by whole sectors, where sectors within one partition may differ
//!   in size (an STM32F4-style part mixes 16 KiB and 128 KiB sectors);
//! - a configurable erased value, since not every part erases to `0xff`.
//!
//! Reads are byte-granular and unwritten cells read back as the erased
//! value.  A [`SimMap`] holds the partitions of one simulated device and
//! hands out [`SimArea`] handles through the [`FlashMap`] trait.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result as SetupResult};
use flashmap::{AreaId, Error, FlashArea, FlashMap, Result, Sector};

pub mod pattern;
pub mod styles;

/// Backing store of one simulated partition.
struct Backing {
    data: Vec<u8>,
    /// Which bytes have been written since their last erase.
    written: Vec<bool>,
    write_size: usize,
    erased_val: u8,
    sectors: Vec<Sector>,
}

/// The geometry of one simulated partition with uniform sectors.
pub struct AreaLayout {
    pub write_size: usize,
    pub erase_size: usize,
    pub sectors: usize,
    pub erased_val: u8,
}

/// The partition table of a simulated device.
pub struct SimMap {
    areas: Vec<(AreaId, usize, Rc<RefCell<Backing>>)>,
    device_size: usize,
}

impl SimMap {
    pub fn new() -> SimMap {
        SimMap { areas: Vec::new(), device_size: 0 }
    }

    /// Add a partition with uniform sectors.
    pub fn add(&mut self, id: AreaId, layout: &AreaLayout) -> SetupResult<()> {
        let sizes = vec![layout.erase_size; layout.sectors];
        self.add_with_sectors(id, layout.write_size, layout.erased_val, &sizes)
    }

    /// Add a partition with an explicit, possibly mixed-size, sector table.
    pub fn add_with_sectors(
        &mut self,
        id: AreaId,
        write_size: usize,
        erased_val: u8,
        sector_sizes: &[usize],
    ) -> SetupResult<()> {
        if !write_size.is_power_of_two() {
            return Err(anyhow!("write size {} not a power of two", write_size));
        }
        if sector_sizes.is_empty() {
            return Err(anyhow!("partition needs at least one sector"));
        }
        if self.areas.iter().any(|(aid, _, _)| *aid == id) {
            return Err(anyhow!("partition {:?} already present", id));
        }

        let mut sectors = Vec::with_capacity(sector_sizes.len());
        let mut off = 0;
        for &size in sector_sizes {
            if size == 0 || size % write_size != 0 {
                return Err(anyhow!(
                    "sector size {} incompatible with write size {}",
                    size,
                    write_size
                ));
            }
            sectors.push(Sector { off, size });
            off += size;
        }

        let backing = Backing {
            data: vec![erased_val; off],
            written: vec![false; off],
            write_size,
            erased_val,
            sectors,
        };
        let device_off = self.device_size;
        self.device_size += off;
        self.areas.push((id, device_off, Rc::new(RefCell::new(backing))));
        Ok(())
    }
}

impl Default for SimMap {
    fn default() -> Self {
        SimMap::new()
    }
}

impl FlashMap for SimMap {
    type Area = SimArea;

    fn open(&self, id: AreaId) -> Result<SimArea> {
        for (aid, device_off, backing) in &self.areas {
            if *aid == id {
                return Ok(SimArea {
                    backing: backing.clone(),
                    id,
                    device_off: *device_off,
                });
            }
        }
        Err(Error::NoSuchArea)
    }
}

/// An open handle onto one simulated partition.
pub struct SimArea {
    backing: Rc<RefCell<Backing>>,
    id: AreaId,
    device_off: usize,
}

impl FlashArea for SimArea {
    fn id(&self) -> AreaId {
        self.id
    }

    fn device_offset(&self) -> usize {
        self.device_off
    }

    fn size(&self) -> usize {
        self.backing.borrow().data.len()
    }

    fn align(&self) -> usize {
        self.backing.borrow().write_size
    }

    fn erased_val(&self) -> u8 {
        self.backing.borrow().erased_val
    }

    fn read(&mut self, off: usize, buf: &mut [u8]) -> Result<()> {
        flashmap::check_read(self, off, buf.len())?;
        let backing = self.backing.borrow();
        buf.copy_from_slice(&backing.data[off..off + buf.len()]);
        Ok(())
    }

    fn write(&mut self, off: usize, buf: &[u8]) -> Result<()> {
        flashmap::check_write(self, off, buf.len())?;
        let mut backing = self.backing.borrow_mut();
        if backing.written[off..off + buf.len()].iter().any(|&w| w) {
            return Err(Error::NotErased);
        }
        backing.data[off..off + buf.len()].copy_from_slice(buf);
        backing.written[off..off + buf.len()].fill(true);
        Ok(())
    }

    fn erase(&mut self, off: usize, len: usize) -> Result<()> {
        flashmap::check_erase(self, off, len)?;
        let mut backing = self.backing.borrow_mut();
        let erased_val = backing.erased_val;
        backing.data[off..off + len].fill(erased_val);
        backing.written[off..off + len].fill(false);
        Ok(())
    }

    fn sector_count(&self) -> usize {
        self.backing.borrow().sectors.len()
    }

    fn sector_at(&self, idx: usize) -> Result<Sector> {
        self.backing.borrow().sectors.get(idx).copied().ok_or(Error::NoSuchSector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles;

    fn one_area() -> SimArea {
        let mut map = SimMap::new();
        map.add(AreaId::ImagePrimary(0), &styles::K64_SLOT).unwrap();
        map.open(AreaId::ImagePrimary(0)).unwrap()
    }

    #[test]
    fn reads_are_erased_until_written() {
        let mut area = one_area();
        let mut buf = [0u8; 16];
        area.read(100, &mut buf).unwrap();
        assert_eq!(buf, [0xff; 16]);

        area.write(96, &[0x11; 8]).unwrap();
        area.read(96, &mut buf[..8]).unwrap();
        assert_eq!(&buf[..8], &[0x11; 8]);
    }

    #[test]
    fn write_alignment_enforced() {
        let mut area = one_area();
        assert_eq!(area.write(3, &[0u8; 8]), Err(Error::NotAligned));
        assert_eq!(area.write(0, &[0u8; 5]), Err(Error::NotAligned));
        assert_eq!(area.write(area.size(), &[0u8; 8]), Err(Error::OutOfBounds));
    }

    #[test]
    fn cells_are_write_once() {
        let mut area = one_area();
        area.write(0, &[0xaa; 8]).unwrap();
        assert_eq!(area.write(0, &[0xaa; 8]), Err(Error::NotErased));

        // An erase makes the cells writable again.
        let sector = area.sector_containing(0).unwrap();
        area.erase(sector.off, sector.size).unwrap();
        area.write(0, &[0x55; 8]).unwrap();
    }

    #[test]
    fn erase_must_cover_whole_sectors() {
        let mut area = one_area();
        assert_eq!(area.erase(8, 4096), Err(Error::NotAligned));
        assert_eq!(area.erase(0, 100), Err(Error::NotAligned));
        area.erase(0, 4096).unwrap();
        area.erase(0, area.size()).unwrap();
    }

    #[test]
    fn mixed_sector_table() {
        let mut map = SimMap::new();
        map.add_with_sectors(
            AreaId::ImagePrimary(0),
            8,
            0xff,
            &[16 * 1024, 16 * 1024, 64 * 1024, 128 * 1024],
        )
        .unwrap();
        let area = map.open(AreaId::ImagePrimary(0)).unwrap();
        assert_eq!(area.sector_count(), 4);
        assert_eq!(area.size(), 224 * 1024);
        assert_eq!(area.sector_containing(32 * 1024 + 1).unwrap().size, 64 * 1024);
        assert_eq!(area.sector_at(3).unwrap().off, 96 * 1024);
        assert!(area.sector_containing(224 * 1024).is_err());
    }

    #[test]
    fn separate_handles_share_backing() {
        let mut map = SimMap::new();
        map.add(AreaId::ImagePrimary(0), &styles::K64_SLOT).unwrap();
        let mut writer = map.open(AreaId::ImagePrimary(0)).unwrap();
        let mut reader = map.open(AreaId::ImagePrimary(0)).unwrap();

        writer.write(0, &[0x42; 8]).unwrap();
        let mut buf = [0u8; 8];
        reader.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0x42; 8]);
    }

    #[test]
    fn trailer_fields_land_through_the_map() {
        // The real consumer of all this: trailer writes go through cleanly
        // and survive a re-open.
        let map = styles::k64_map().unwrap();
        let mut area = map.open(AreaId::ImagePrimary(0)).unwrap();
        trailer::fields::write_swap_size(&mut area, 0x1234).unwrap();
        trailer::fields::write_magic(&mut area).unwrap();
        drop(area);

        let mut area = map.open(AreaId::ImagePrimary(0)).unwrap();
        assert_eq!(trailer::fields::read_magic(&mut area).unwrap(), trailer::MagicState::Good);
        assert_eq!(trailer::fields::read_swap_size(&mut area).unwrap(), 0x1234);
    }
}
