use inspector_acpi::{AcpiError, Table, decode_table};

fn table(signature: &[u8; 4], revision: u8, body: &[u8]) -> Vec<u8> {
    let length = u32::try_from(36 + body.len()).unwrap();
    let mut out = Vec::new();
    out.extend_from_slice(signature);
    out.extend_from_slice(&length.to_le_bytes());
    out.push(revision);
    out.push(0);
    out.extend_from_slice(b"OEMID TABLEID ");
    out.extend_from_slice(&[0; 12]);
    out.extend_from_slice(body);
    let sum = out.iter().fold(0u8, |a, &b| a.wrapping_add(b));
    out[9] = 0u8.wrapping_sub(sum);
    out
}

#[test]
fn dispatches_by_signature() {
    let tpm = table(b"TPM2", 4, &[0; 16]);
    assert!(matches!(decode_table(&tpm), Ok(Table::Tpm2(_))));

    let madt = table(b"APIC", 4, &[0; 8]);
    let Ok(Table::Apic(m)) = decode_table(&madt) else {
        panic!("expected APIC");
    };
    assert!(m.entries.is_empty());

    let ssdt = table(b"SSDT", 2, &[0xA3]);
    let Ok(Table::Other(h)) = decode_table(&ssdt) else {
        panic!("expected passthrough");
    };
    assert!(h.checksum_ok(&ssdt));
}

#[test]
fn truncated_buffer_is_rejected() {
    let mut t = table(b"DMAR", 1, &[0; 12]);
    t.truncate(40);
    assert!(matches!(
        decode_table(&t),
        Err(AcpiError::LengthExceedsBuffer { declared: 48, .. })
    ));
}

#[test]
fn decode_is_idempotent() {
    let mut body = vec![0; 80];
    body[9] = 3;
    let facp = table(b"FACP", 1, &body);
    assert_eq!(decode_table(&facp).unwrap(), decode_table(&facp).unwrap());
}

proptest::proptest! {
    #[test]
    fn arbitrary_tables_decode_the_same_twice(
        signature in proptest::sample::select(vec![*b"APIC", *b"FACP", *b"DMAR", *b"TPM2", *b"RTCT", *b"SSDT"]),
        revision in 0u8..8,
        body in proptest::collection::vec(proptest::num::u8::ANY, 0..160),
    ) {
        let t = table(&signature, revision, &body);
        let first = format!("{:?}", decode_table(&t));
        let second = format!("{:?}", decode_table(&t));
        proptest::prop_assert_eq!(first, second);
    }
}
