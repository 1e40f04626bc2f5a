//! Flash partition map.
//!
//! The upgrade core never touches flash hardware directly.  It consumes two
//! small abstractions: a [`FlashMap`] that opens numbered partitions (areas),
//! and a [`FlashArea`] handle giving aligned read/write/erase over one
//! partition, plus a view of its erase-sector geometry.  The sector view
//! matters because the devices we care about are not uniform: a partition may
//! mix 16 KiB and 128 KiB sectors, and the write granularity ranges from a
//! single byte up to 32-byte words.
//!
//! The core holds no cache of flash contents; every query goes back through
//! the handle.  Closing an area is dropping it.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    NotAligned,
    OutOfBounds,
    /// Write issued to a cell that has not been erased since it was last
    /// written.
    NotErased,
    NoSuchArea,
    NoSuchSector,
    /// Failure reported by the underlying driver.
    Device,
}

pub type Result<T> = core::result::Result<T, Error>;

/// Identity of a partition within the map.
///
/// The image index distinguishes the slot pairs of multi-image layouts; the
/// scratch partition, when the layout has one, is shared between them.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AreaId {
    ImagePrimary(u8),
    ImageSecondary(u8),
    ImageScratch,
}

/// One erase sector of an area.  Offsets are relative to the area start.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Sector {
    pub off: usize,
    pub size: usize,
}

impl Sector {
    pub fn end(&self) -> usize {
        self.off + self.size
    }

    pub fn contains(&self, off: usize) -> bool {
        off >= self.off && off < self.end()
    }
}

/// An open handle onto one flash partition.
///
/// Reads are byte-granular.  Writes must be aligned to [`align`] in both
/// offset and length, and a written cell may not be written again until its
/// sector has been erased.  Erases must cover whole sectors.
///
/// [`align`]: FlashArea::align
pub trait FlashArea {
    fn id(&self) -> AreaId;

    /// Absolute offset of this area on the device.
    fn device_offset(&self) -> usize;

    /// Total size of the area in bytes.
    fn size(&self) -> usize;

    /// Write unit of the device under this area.  Always a power of two.
    fn align(&self) -> usize;

    /// The value an erased cell reads back as.  Usually `0xff`, but some
    /// parts erase to zero, and every "is this cell unwritten" test must go
    /// through this.
    fn erased_val(&self) -> u8;

    fn read(&mut self, off: usize, buf: &mut [u8]) -> Result<()>;
    fn write(&mut self, off: usize, buf: &[u8]) -> Result<()>;
    fn erase(&mut self, off: usize, len: usize) -> Result<()>;

    fn sector_count(&self) -> usize;

    fn sector_at(&self, idx: usize) -> Result<Sector>;

    /// The sector holding the given area-relative offset.
    fn sector_containing(&self, off: usize) -> Result<Sector> {
        for idx in 0..self.sector_count() {
            let sector = self.sector_at(idx)?;
            if sector.contains(off) {
                return Ok(sector);
            }
        }
        Err(Error::NoSuchSector)
    }
}

/// The partition table itself.  Opening an area that the layout does not
/// define fails with [`Error::NoSuchArea`].
pub trait FlashMap {
    type Area: FlashArea;

    fn open(&self, id: AreaId) -> Result<Self::Area>;
}

// Argument validation helpers, for use by FlashArea implementations.

pub fn check_read<A: FlashArea + ?Sized>(area: &A, offset: usize, length: usize) -> Result<()> {
    // Reads are byte granular; only the bounds matter.
    check_slice(area, 1, offset, length)
}

pub fn check_write<A: FlashArea + ?Sized>(area: &A, offset: usize, length: usize) -> Result<()> {
    check_slice(area, area.align(), offset, length)
}

pub fn check_erase<A: FlashArea + ?Sized>(area: &A, offset: usize, length: usize) -> Result<()> {
    if length > area.size() || offset > area.size() - length {
        return Err(Error::OutOfBounds);
    }
    // Both ends must fall on sector boundaries.
    let start = area.sector_containing(offset)?;
    if start.off != offset {
        return Err(Error::NotAligned);
    }
    let end = offset + length;
    if end != area.size() && area.sector_containing(end)?.off != end {
        return Err(Error::NotAligned);
    }
    Ok(())
}

pub fn check_slice<A: FlashArea + ?Sized>(
    area: &A,
    align: usize,
    offset: usize,
    length: usize,
) -> Result<()> {
    if length > area.size() || offset > area.size() - length {
        return Err(Error::OutOfBounds);
    }
    if offset % align != 0 || length % align != 0 {
        return Err(Error::NotAligned);
    }
    Ok(())
}
