use busspec_ir::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn gear() -> SegmentSpec {
    SegmentSpec::new(
        SegmentDef::new("gear", WidthType::UInt8, 0, 3)
            .values(EnumSource::sequential(["P", "R", "N", "D"])),
    )
    .unwrap()
}

fn speed() -> SegmentSpec {
    SegmentSpec::new(SegmentDef::new("speed", WidthType::UInt16, 8, 16).unit("km/h")).unwrap()
}

fn drive_status() -> MessageSpec {
    MessageSpec::with_segments("drive_status", 0x120, [gear(), speed()]).unwrap()
}

#[test]
fn test_duplicate_segment_name_rejected() {
    let err = MessageSpec::with_segments("m", 1, [gear(), speed(), gear()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert_eq!(err.to_string(), "in segment gear: duplicate name 'gear'");
}

#[test]
fn test_message_interpret_decodes_all_segments() {
    let units = UnitRegistry::new();
    let frame = Frame::new(0x120, (300 << 8) | 0b001);
    let decoded = drive_status().interpret(&frame, &units).unwrap();

    let mut expected = BTreeMap::new();
    expected.insert("gear".to_string(), Value::Enum("R".into()));
    expected.insert(
        "speed".to_string(),
        Value::Quantity(Quantity {
            magnitude: 300.0,
            unit: "km/h".into(),
        }),
    );
    assert_eq!(decoded, expected);
}

#[test]
fn test_message_interpret_has_no_partial_result() {
    let units = UnitRegistry::new();
    let frame = Frame::new(0x120, (300 << 8) | 0b111);
    let err = drive_status().interpret(&frame, &units).unwrap_err();
    assert_eq!(err.to_string(), "in segment gear: raw value 7 has no enum entry");
}

#[test]
fn test_bus_dispatches_by_address() {
    let units = UnitRegistry::new();
    let idle = MessageSpec::with_segments(
        "heartbeat",
        0x700,
        [SegmentSpec::new(SegmentDef::new("alive", WidthType::Bool, 0, 1)).unwrap()],
    )
    .unwrap();
    let bus = BusSpec::from_messages("inline", [drive_status(), idle]);

    assert_eq!(bus.len(), 2);
    let decoded = bus.interpret(&Frame::new(0x700, 1), &units).unwrap();
    assert_eq!(decoded["alive"], Value::Bool(true));
    let decoded = bus.interpret(&Frame::new(0x120, 3), &units).unwrap();
    assert_eq!(decoded["gear"], Value::Enum("D".into()));
}

#[test]
fn test_unknown_address_is_lookup_failure() {
    let units = UnitRegistry::new();
    let bus = BusSpec::from_messages("inline", [drive_status()]);
    let err = bus.interpret(&Frame::new(0x555, 0), &units).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownAddress(0x555)));
    assert_eq!(err.kind(), ErrorKind::LookupFailure);
}

#[test]
fn test_decode_errors_carry_message_and_segment() {
    let units = UnitRegistry::new();
    let bus = BusSpec::from_messages("inline", [drive_status()]);
    let err = bus.interpret(&Frame::new(0x120, 6), &units).unwrap_err();
    assert_eq!(
        err.to_string(),
        "in message drive_status: in segment gear: raw value 6 has no enum entry"
    );
}

#[test]
fn test_upsert_keeps_later_message() {
    let units = UnitRegistry::new();
    let mut bus = BusSpec::new("layered");
    assert!(bus.upsert_message(drive_status()).is_none());

    let replacement = MessageSpec::with_segments(
        "drive_status_v2",
        0x120,
        [SegmentSpec::new(SegmentDef::new("raw", WidthType::UInt8, 0, 8)).unwrap()],
    )
    .unwrap();
    let replaced = bus.upsert_message(replacement).unwrap();
    assert_eq!(replaced.name(), "drive_status");

    assert_eq!(bus.len(), 1);
    let decoded = bus.interpret(&Frame::new(0x120, 0xAB), &units).unwrap();
    assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["raw"]);
    assert_eq!(decoded["raw"], Value::UInt(0xAB));
    assert!(bus.message_by_name("drive_status").is_none());
}

#[test]
fn test_merge_layers_override_bus() {
    let mut base = BusSpec::from_messages("base.yml", [drive_status()]);
    let extra = MessageSpec::new("diag", 0x7DF);
    let override_gear = MessageSpec::with_segments("gear_only", 0x120, [gear()]).unwrap();
    base.merge(BusSpec::from_messages("override.yml", [extra, override_gear]));

    assert_eq!(base.source(), "base.yml");
    let names: Vec<&str> = base.messages().map(MessageSpec::name).collect();
    assert_eq!(names, vec!["gear_only", "diag"]);
}

#[test]
fn test_bus_units() {
    let bus = BusSpec::from_messages("inline", [drive_status()]);
    assert_eq!(bus.units().into_iter().collect::<Vec<_>>(), vec!["km/h"]);
}

#[test]
fn test_built_bus_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BusSpec>();
    assert_send_sync::<SystemSpec>();
    assert_send_sync::<UnitRegistry>();

    let bus = BusSpec::from_messages("inline", [drive_status()]);
    let units = UnitRegistry::new();
    std::thread::scope(|s| {
        for gear in 0..4u64 {
            let (bus, units) = (&bus, &units);
            s.spawn(move || {
                let decoded = bus.interpret(&Frame::new(0x120, gear), units).unwrap();
                assert!(decoded.contains_key("gear"));
            });
        }
    });
}
