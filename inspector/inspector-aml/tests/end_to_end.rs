use inspector_aml::{ConditionallyUnregister, Context, RoutingSource, Value, extract_devices};

fn definition_block(signature: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let length = u32::try_from(36 + body.len()).unwrap();
    let mut out = Vec::new();
    out.extend_from_slice(signature);
    out.extend_from_slice(&length.to_le_bytes());
    out.push(2);
    out.push(0);
    out.extend_from_slice(b"OEMID TABLEID ");
    out.extend_from_slice(&[0; 12]);
    out.extend_from_slice(body);
    let sum = out.iter().fold(0u8, |a, &b| a.wrapping_add(b));
    out[9] = 0u8.wrapping_sub(sum);
    out
}

fn load(body: &[u8]) -> Context {
    let dsdt = definition_block(b"DSDT", body);
    let mut ctx = Context::new();
    assert_eq!(ctx.load_tables([("DSDT", dsdt.as_slice())]).unwrap(), 0);
    ctx
}

/// `Device (<name>) { Method (_STA) { Return (<sta>) } }`
fn device_with_status(name: &[u8; 4], sta: u8) -> Vec<u8> {
    let method = [0x14, 0x09, b'_', b'S', b'T', b'A', 0x00, 0xA4, 0x0A, sta];
    let mut out = vec![0x5B, 0x82, 0x0F];
    out.extend_from_slice(name);
    out.extend_from_slice(&method);
    out
}

#[test]
fn later_definition_shadows_earlier_one() {
    // Name (FOO, 1)  Name (FOO, 2)
    let ctx = &mut load(&[
        0x08, b'F', b'O', b'O', b'_', 0x0A, 0x01, //
        0x08, b'F', b'O', b'O', b'_', 0x0A, 0x02,
    ]);
    assert_eq!(ctx.interpreter().evaluate_path("\\FOO"), Ok(Value::Integer(2)));
}

#[test]
fn method_calling_a_later_method_resolves() {
    // Method (MAIN) { Return (HELP ()) }  Method (HELP) { Return (7) }
    let ctx = &mut load(&[
        0x14, 0x0B, b'M', b'A', b'I', b'N', 0x00, 0xA4, b'H', b'E', b'L', b'P', //
        0x14, 0x09, b'H', b'E', b'L', b'P', 0x00, 0xA4, 0x0A, 0x07,
    ]);
    assert!(ctx.deferred().is_empty());
    assert_eq!(ctx.interpreter().evaluate_path("\\MAIN"), Ok(Value::Integer(7)));
}

#[test]
fn device_with_zero_status_is_unregistered() {
    let mut body = device_with_status(b"DEV0", 0x00);
    body.extend(device_with_status(b"DEV1", 0x0F));
    let mut ctx = load(&body);

    let removed = ConditionallyUnregister::run(&mut ctx);
    assert_eq!(removed, vec!["\\DEV0".to_owned()]);
    assert!(ctx.namespace().lookup_path("\\DEV0").is_none());
    assert!(ctx.namespace().lookup_path("\\DEV1").is_some());
}

#[test]
fn devices_are_extracted_with_ids_and_routing() {
    let mut body = device_with_status(b"DEV0", 0x00);
    // Device (PCI0) {
    //     Name (_HID, EisaId ("PNP0A03"))
    //     Name (_ADR, Zero)
    //     Name (_PRT, Package () { Package () { 0x0001FFFF, Zero, Zero, 16 } })
    // }
    body.extend_from_slice(&[0x5B, 0x82, 0x29, b'P', b'C', b'I', b'0']);
    body.extend_from_slice(&[0x08, b'_', b'H', b'I', b'D', 0x0C, 0x41, 0xD0, 0x0A, 0x03]);
    body.extend_from_slice(&[0x08, b'_', b'A', b'D', b'R', 0x00]);
    body.extend_from_slice(&[
        0x08, b'_', b'P', b'R', b'T', //
        0x12, 0x0E, 0x01, //
        0x12, 0x0B, 0x04, 0x0C, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x10,
    ]);
    let mut ctx = load(&body);

    let all = extract_devices(&mut ctx, false);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].path, "\\DEV0");
    assert!(!all[0].present());

    let devices = extract_devices(&mut ctx, true);
    assert_eq!(devices.len(), 1);
    let pci = &devices[0];
    assert_eq!(pci.path, "\\PCI0");
    assert_eq!(pci.hid.as_deref(), Some("PNP0A03"));
    assert_eq!(pci.adr, Some(0));
    assert_eq!(pci.status, None);
    assert_eq!(pci.routing.len(), 1);
    assert_eq!(pci.routing[0].address, 0x0001_FFFF);
    assert_eq!(pci.routing[0].source, RoutingSource::Gsi);
    assert_eq!(pci.routing[0].source_index, 16);
    assert_eq!(pci.routing[0].pin_name(), "INTA#");
}
