//! Trailer field I/O.
//!
//! Every field is read and written through the flash area handle, one write
//! unit at a time: the significant bytes go at the field offset and the rest
//! of the unit is padded so the write is legal on devices with coarse write
//! granularity.  Nothing is cached; a read always goes back to the device.
//!
//! Write order within one durable transition is fixed: status entries, then
//! the auxiliary fields, then the magic.  A reset can interrupt the sequence
//! anywhere, so [`read_swap_state`] classifies whatever prefix made it to
//! flash and leaves the trust decision to the caller: only a good magic
//! makes the rest of the record meaningful.

use flashmap::FlashArea;

use crate::geometry::{self, MAGIC_SZ};
use crate::magic::{self, MagicState};
use crate::{current_image, Error, Result};

/// Largest padded unit any field occupies: the key TLV rounded up to the
/// largest supported write unit.
const FIELD_BUF: usize = 64;

/// On-flash byte recording a confirmed flag.
const FLAG_SET: u8 = 0x01;

/// Classification of the one-byte `image_ok` / `copy_done` flags.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FlagState {
    Set,
    /// Still the erased value.
    Unset,
    Bad,
}

impl FlagState {
    fn decode(raw: u8, erased_val: u8) -> FlagState {
        if raw == FLAG_SET {
            FlagState::Set
        } else if raw == erased_val {
            FlagState::Unset
        } else {
            FlagState::Bad
        }
    }
}

/// Intent tag recorded before a swap begins.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum SwapType {
    None = 1,
    /// Swap in the staged image, revert unless confirmed.
    Test = 2,
    /// Swap in the staged image and keep it.
    Permanent = 3,
    Revert = 4,
    Fail = 5,
}

impl SwapType {
    fn from_raw(raw: u8) -> SwapType {
        match raw {
            2 => SwapType::Test,
            3 => SwapType::Permanent,
            4 => SwapType::Revert,
            5 => SwapType::Fail,
            // Unwritten or unrecognized both read as "no swap requested".
            _ => SwapType::None,
        }
    }
}

/// Write one field: `data` at `off`, padded out to `unit` with `pad`.
pub(crate) fn write_field<A: FlashArea>(
    area: &mut A,
    off: usize,
    data: &[u8],
    pad: u8,
    unit: usize,
) -> Result<()> {
    if unit > FIELD_BUF || data.len() > unit {
        return Err(Error::Flash(flashmap::Error::NotAligned));
    }
    let mut buf = [0u8; FIELD_BUF];
    let buf = &mut buf[..unit];
    buf.fill(pad);
    buf[..data.len()].copy_from_slice(data);
    area.write(off, buf)?;
    Ok(())
}

fn read_byte<A: FlashArea>(area: &mut A, off: usize) -> Result<u8> {
    let mut raw = [0u8; 1];
    area.read(off, &mut raw)?;
    Ok(raw[0])
}

fn write_flag<A: FlashArea>(area: &mut A, off: usize) -> Result<()> {
    let unit = geometry::max_align(area.align());
    let pad = area.erased_val();
    write_field(area, off, &[FLAG_SET], pad, unit)
}

pub fn read_magic<A: FlashArea>(area: &mut A) -> Result<MagicState> {
    let off = geometry::magic_off(area);
    let mut raw = [0u8; MAGIC_SZ];
    area.read(off, &mut raw)?;
    Ok(magic::decode(&raw, area.erased_val()))
}

/// Written last in any durable transition: a good magic vouches for every
/// field written before it.
pub fn write_magic<A: FlashArea>(area: &mut A) -> Result<()> {
    log::trace!("image {}: writing magic to {:?}", current_image(), area.id());
    let off = geometry::magic_off(area);
    let unit = geometry::magic_align(area.align());
    write_field(area, off, &magic::MAGIC, 0, unit)
}

pub fn read_swap_size<A: FlashArea>(area: &mut A) -> Result<u32> {
    let off = geometry::swap_size_off(area);
    let mut raw = [0u8; 4];
    area.read(off, &mut raw)?;
    Ok(u32::from_le_bytes(raw))
}

pub fn write_swap_size<A: FlashArea>(area: &mut A, swap_size: u32) -> Result<()> {
    log::trace!("image {}: swap size {}", current_image(), swap_size);
    let off = geometry::swap_size_off(area);
    let unit = geometry::max_align(area.align());
    let pad = area.erased_val();
    write_field(area, off, &swap_size.to_le_bytes(), pad, unit)
}

pub fn read_swap_type<A: FlashArea>(area: &mut A) -> Result<SwapType> {
    let off = geometry::swap_type_off(area);
    Ok(SwapType::from_raw(read_byte(area, off)?))
}

pub fn write_swap_type<A: FlashArea>(area: &mut A, swap_type: SwapType) -> Result<()> {
    log::trace!("image {}: swap type {:?}", current_image(), swap_type);
    let off = geometry::swap_type_off(area);
    let unit = geometry::max_align(area.align());
    let pad = area.erased_val();
    write_field(area, off, &[swap_type as u8], pad, unit)
}

pub fn read_copy_done<A: FlashArea>(area: &mut A) -> Result<FlagState> {
    let off = geometry::copy_done_off(area);
    let erased_val = area.erased_val();
    Ok(FlagState::decode(read_byte(area, off)?, erased_val))
}

pub fn write_copy_done<A: FlashArea>(area: &mut A) -> Result<()> {
    log::trace!("image {}: copy done", current_image());
    let off = geometry::copy_done_off(area);
    write_flag(area, off)
}

pub fn read_image_ok<A: FlashArea>(area: &mut A) -> Result<FlagState> {
    let off = geometry::image_ok_off(area);
    let erased_val = area.erased_val();
    Ok(FlagState::decode(read_byte(area, off)?, erased_val))
}

pub fn write_image_ok<A: FlashArea>(area: &mut A) -> Result<()> {
    log::trace!("image {}: image ok", current_image());
    let off = geometry::image_ok_off(area);
    write_flag(area, off)
}

/// Snapshot of every trailer field, as read.
///
/// Valid for any interruption point of the write order; the caller decides
/// what to trust based on [`SwapState::magic`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SwapState {
    pub magic: MagicState,
    pub swap_type: SwapType,
    pub copy_done: FlagState,
    pub image_ok: FlagState,
}

pub fn read_swap_state<A: FlashArea>(area: &mut A) -> Result<SwapState> {
    Ok(SwapState {
        magic: read_magic(area)?,
        swap_type: read_swap_type(area)?,
        copy_done: read_copy_done(area)?,
        image_ok: read_image_ok(area)?,
    })
}
