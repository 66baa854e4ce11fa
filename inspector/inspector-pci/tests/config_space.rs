use inspector_pci::caps::{ID_MSI, MsiAddress};
use inspector_pci::{CapabilityBody, ConfigSpace, PciError};

/// A type 0 header with the capability list enabled and pointing at 0x40.
fn config(len: usize) -> Vec<u8> {
    let mut cfg = vec![0u8; len];
    cfg[0..2].copy_from_slice(&0x8086u16.to_le_bytes());
    cfg[2..4].copy_from_slice(&0x15F3u16.to_le_bytes());
    cfg[6] = 0x10;
    cfg[0x34] = 0x40;
    cfg
}

fn put_msi(cfg: &mut [u8], at: usize, next: u8, control: u16) {
    cfg[at] = ID_MSI;
    cfg[at + 1] = next;
    cfg[at + 2..at + 4].copy_from_slice(&control.to_le_bytes());
    // recognizable filler for address/data/mask/pending
    for (i, b) in cfg[at + 4..at + 24].iter_mut().enumerate() {
        *b = u8::try_from(0xA0 + i).unwrap();
    }
}

fn msi(control: u16) -> inspector_pci::caps::Msi {
    let mut cfg = config(256);
    put_msi(&mut cfg, 0x40, 0, control);
    let space = ConfigSpace::parse(&cfg).unwrap();
    match &space.capabilities[0].body {
        CapabilityBody::Msi(m) => *m,
        other => panic!("expected MSI, got {other:?}"),
    }
}

#[test]
fn msi_32bit_without_masking() {
    let m = msi(0x0001);
    assert!(m.control.enable());
    assert_eq!(m.address, MsiAddress::Bits32(0xA3A2_A1A0));
    assert_eq!(m.data, 0xA5A4);
    assert!(m.masking.is_none());
    assert_eq!(m.len(), 10);
}

#[test]
fn msi_64bit_adds_only_wide_address() {
    let m = msi(1 << 7);
    assert_eq!(m.address, MsiAddress::Bits64(0xA7A6_A5A4_A3A2_A1A0));
    assert_eq!(m.data, 0xA9A8);
    assert!(m.masking.is_none());
    assert_eq!(m.len(), 14);
}

#[test]
fn msi_masking_adds_only_mask_and_pending() {
    let m = msi(1 << 8);
    assert!(matches!(m.address, MsiAddress::Bits32(_)));
    let masking = m.masking.unwrap();
    // address (4) + data (2) + reserved (2) precede the mask
    assert_eq!(masking.mask_bits, 0xABAA_A9A8);
    assert_eq!(masking.pending_bits, 0xAFAE_ADAC);
    assert_eq!(m.len(), 20);
}

#[test]
fn msi_64bit_with_masking() {
    let m = msi((1 << 7) | (1 << 8));
    assert!(matches!(m.address, MsiAddress::Bits64(_)));
    assert_eq!(m.masking.unwrap().mask_bits, 0xAFAE_ADAC);
    assert_eq!(m.len(), 24);
}

#[test]
fn capability_cycle_terminates() {
    let mut cfg = config(256);
    // 0x40 -> 0x50 -> 0x40
    cfg[0x40] = 0x01;
    cfg[0x41] = 0x50;
    cfg[0x50] = 0x09;
    cfg[0x51] = 0x40;
    let space = ConfigSpace::parse(&cfg).unwrap();
    assert_eq!(space.capabilities.len(), 2);
    assert_eq!(space.capabilities[0].name(), "Power Management");
}

#[test]
fn msix_offsets_are_qword_scaled() {
    let mut cfg = config(256);
    cfg[0x40] = 0x11;
    cfg[0x42..0x44].copy_from_slice(&(0x8000u16 | 0x3F).to_le_bytes());
    cfg[0x44..0x48].copy_from_slice(&((0x400u32 << 3) | 2).to_le_bytes());
    cfg[0x48..0x4C].copy_from_slice(&((0x600u32 << 3) | 2).to_le_bytes());
    let space = ConfigSpace::parse(&cfg).unwrap();
    let CapabilityBody::MsiX(x) = &space.capabilities[0].body else {
        panic!("expected MSI-X");
    };
    assert!(x.control.enable());
    assert!(!x.control.function_mask());
    assert_eq!(x.table_size(), 64);
    assert_eq!((x.table.bir(), x.table.offset()), (2, 0x2000));
    assert_eq!(x.pba.offset(), 0x3000);
}

#[test]
fn extended_list_requires_express_and_length() {
    let mut cfg = config(4096);
    cfg[0x40] = 0x10;
    cfg[0x100..0x104].copy_from_slice(&(0x0001u32 | (1 << 16)).to_le_bytes());

    let space = ConfigSpace::parse(&cfg).unwrap();
    assert_eq!(space.extended_capabilities.len(), 1);

    // truncated config space claiming PCIe
    let space = ConfigSpace::parse(&cfg[..259]).unwrap();
    assert!(space.extended_capabilities.is_empty());

    // no PCI Express capability
    cfg[0x40] = 0x09;
    let space = ConfigSpace::parse(&cfg).unwrap();
    assert!(space.extended_capabilities.is_empty());
}

#[test]
fn short_blob_is_rejected() {
    assert!(matches!(
        ConfigSpace::parse(&[0u8; 16]),
        Err(PciError::TooShort { len: 16 })
    ));
}

#[test]
fn decode_is_idempotent() {
    let mut cfg = config(256);
    put_msi(&mut cfg, 0x40, 0, 0x0181);
    assert_eq!(ConfigSpace::parse(&cfg), ConfigSpace::parse(&cfg));
}
