// Trailer field I/O against simulated devices.

use flashmap::{AreaId, FlashArea, FlashMap};
use simflash::{pattern, styles, SimArea, SimMap};
use trailer::fields::{self, FlagState, SwapType};
use trailer::{geometry, MagicState};

fn primary(map: &SimMap) -> SimArea {
    map.open(AreaId::ImagePrimary(0)).unwrap()
}

#[test]
fn swap_size_round_trip() {
    let map = styles::k64_map().unwrap();
    let mut area = primary(&map);
    let tail = area.sector_containing(geometry::swap_size_off(&area)).unwrap();

    for value in pattern::words(11, 32) {
        fields::write_swap_size(&mut area, value).unwrap();
        assert_eq!(fields::read_swap_size(&mut area).unwrap(), value);
        // Make the cells writable for the next value.
        area.erase(tail.off, tail.size).unwrap();
    }
}

#[test]
fn swap_state_tracks_the_write_order() {
    let map = styles::k64_map().unwrap();
    let mut area = primary(&map);

    // Fresh trailer: everything unset.
    let state = fields::read_swap_state(&mut area).unwrap();
    assert_eq!(state.magic, MagicState::Unset);
    assert_eq!(state.swap_type, SwapType::None);
    assert_eq!(state.copy_done, FlagState::Unset);
    assert_eq!(state.image_ok, FlagState::Unset);

    // Aux fields written, magic still unset: a reset here leaves a record
    // that is visible but not yet trusted.
    fields::write_swap_type(&mut area, SwapType::Test).unwrap();
    fields::write_swap_size(&mut area, 0x4_0000).unwrap();
    let state = fields::read_swap_state(&mut area).unwrap();
    assert_eq!(state.magic, MagicState::Unset);
    assert_eq!(state.swap_type, SwapType::Test);

    // Magic last; the whole record now stands.
    fields::write_magic(&mut area).unwrap();
    let state = fields::read_swap_state(&mut area).unwrap();
    assert_eq!(state.magic, MagicState::Good);
    assert_eq!(state.swap_type, SwapType::Test);
    assert_eq!(fields::read_swap_size(&mut area).unwrap(), 0x4_0000);

    fields::write_copy_done(&mut area).unwrap();
    assert_eq!(fields::read_copy_done(&mut area).unwrap(), FlagState::Set);
    assert_eq!(fields::read_image_ok(&mut area).unwrap(), FlagState::Unset);

    fields::write_image_ok(&mut area).unwrap();
    assert_eq!(fields::read_image_ok(&mut area).unwrap(), FlagState::Set);
}

#[test]
fn coarse_write_units() {
    let mut map = SimMap::new();
    map.add(AreaId::ImagePrimary(0), &styles::STM32H_SLOT).unwrap();
    let mut area = primary(&map);
    assert_eq!(area.align(), 32);

    fields::write_swap_type(&mut area, SwapType::Permanent).unwrap();
    fields::write_swap_size(&mut area, 0xdead_beef).unwrap();
    fields::write_image_ok(&mut area).unwrap();
    fields::write_magic(&mut area).unwrap();

    let state = fields::read_swap_state(&mut area).unwrap();
    assert_eq!(state.magic, MagicState::Good);
    assert_eq!(state.swap_type, SwapType::Permanent);
    assert_eq!(state.image_ok, FlagState::Set);
    assert_eq!(fields::read_swap_size(&mut area).unwrap(), 0xdead_beef);
}

#[test]
fn unknown_bytes_classify_defensively() {
    let map = styles::k64_map().unwrap();
    let mut area = primary(&map);

    // Scribble raw bytes where the fields live.
    let mut junk = [0xff_u8; 8];
    junk[0] = 0x7e;
    area.write(geometry::image_ok_off(&area), &junk).unwrap();
    area.write(geometry::swap_type_off(&area), &junk).unwrap();

    assert_eq!(fields::read_image_ok(&mut area).unwrap(), FlagState::Bad);
    // An unrecognized swap-type tag reads as "no swap requested".
    assert_eq!(fields::read_swap_type(&mut area).unwrap(), SwapType::None);
}

#[test]
fn each_field_occupies_its_own_write_unit() {
    // Writing every field in sequence must never touch the same cell twice;
    // the simulator faults the write if a layout bug makes two fields share
    // a unit.
    let map = styles::mixed_align_map().unwrap();
    let mut area = map.open(AreaId::ImageSecondary(0)).unwrap();
    assert_eq!(area.align(), 16);

    fields::write_swap_type(&mut area, SwapType::Revert).unwrap();
    fields::write_copy_done(&mut area).unwrap();
    fields::write_image_ok(&mut area).unwrap();
    fields::write_swap_size(&mut area, 77).unwrap();
    fields::write_magic(&mut area).unwrap();

    let state = fields::read_swap_state(&mut area).unwrap();
    assert_eq!(state.magic, MagicState::Good);
    assert_eq!(state.swap_type, SwapType::Revert);
    assert_eq!(state.copy_done, FlagState::Set);
    assert_eq!(state.image_ok, FlagState::Set);
}
