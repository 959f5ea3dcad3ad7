use busspec_ir::*;
use pretty_assertions::assert_eq;

fn powertrain_bus() -> BusSpec {
    let rpm = SegmentSpec::new(SegmentDef::new("rpm", WidthType::UInt16, 0, 16).unit("rpm")).unwrap();
    let temp = SegmentSpec::new(SegmentDef::new("coolant", WidthType::Int8, 16, 8).unit("degC")).unwrap();
    BusSpec::from_messages(
        "inline",
        [MessageSpec::with_segments("engine", 0x0C0, [rpm, temp]).unwrap()],
    )
}

fn system() -> SystemSpec {
    SystemSpec::new("car", ["stm32f4", "esp32"], ["rpm", "degC", "km/h"])
}

#[test]
fn test_board_with_declared_architecture() {
    let mut s = system();
    s.add_board(Board::new("ecu").with_architecture("stm32f4")).unwrap();
    assert_eq!(s.board("ecu").unwrap().architecture.as_deref(), Some("stm32f4"));
}

#[test]
fn test_board_without_architecture() {
    let mut s = system();
    s.add_board(Board::new("dash")).unwrap();
    s.add_board(Board::new("bms").with_architecture("")).unwrap();
    assert_eq!(s.boards().len(), 2);
}

#[test]
fn test_board_with_unknown_architecture_is_rule_violation() {
    let mut s = system();
    let err = s
        .add_board(Board::new("ecu").with_architecture("avr"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);
    assert_eq!(
        err.to_string(),
        "in board ecu: known-architecture: unknown architecture: avr"
    );
    assert!(s.board("ecu").is_none());
}

#[test]
fn test_duplicate_board_name() {
    let mut s = system();
    s.add_board(Board::new("ecu")).unwrap();
    let err = s.add_board(Board::new("ecu").with_architecture("esp32")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert_eq!(s.board("ecu").unwrap().architecture, None);
}

#[test]
fn test_protocol_units_must_be_declared() {
    let mut s = SystemSpec::new("car", ["esp32"], ["rpm"]);
    let err = s
        .add_protocol(Protocol::new("can", powertrain_bus()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);
    assert_eq!(err.path(), vec![("protocol", "can")]);
    assert!(err.to_string().contains("undeclared units: degC"));
}

#[test]
fn test_build_fails_fast_with_entity_path() {
    let err = SystemSpec::build(
        "car",
        ["esp32"],
        Vec::<String>::new(),
        vec![
            Board::new("a").with_architecture("esp32"),
            Board::new("b").with_architecture("pic"),
            Board::new("c"),
        ],
        vec![],
    )
    .unwrap_err();
    assert_eq!(err.path(), vec![("board", "b")]);
}

#[test]
fn test_extend_boards_keeps_earlier_boards() {
    let mut s = system();
    let result = s.extend_boards([
        Board::new("a"),
        Board::new("b").with_architecture("pic"),
        Board::new("c"),
    ]);
    assert!(result.is_err());
    let names: Vec<&str> = s.boards().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["a"]);
}

#[test]
fn test_system_interpret_through_protocol() {
    let s = SystemSpec::build(
        "car",
        ["esp32"],
        ["rpm", "degC"],
        vec![Board::new("ecu").with_architecture("esp32")],
        vec![Protocol::new("can", powertrain_bus())],
    )
    .unwrap();
    let units = UnitRegistry::new();

    let decoded = s
        .interpret("can", &Frame::new(0x0C0, 0x00_EC_0BB8), &units)
        .unwrap();
    assert_eq!(decoded["rpm"].magnitude(), Some(3000.0));
    assert_eq!(decoded["coolant"].magnitude(), Some(-20.0));

    let err = s
        .interpret("lin", &Frame::new(0x0C0, 0), &units)
        .unwrap_err();
    assert!(matches!(err, DecodeError::UnknownProtocol(_)));
}
