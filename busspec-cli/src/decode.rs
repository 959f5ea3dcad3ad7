use anyhow::{Context, Result, anyhow, bail};
use busspec_ir::{BusSpec, DecodeError, Frame, UnitRegistry, Value};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

use crate::{Document, load_document};

/// Parse one candump-style frame, `ADDR#HEXDATA`.
///
/// Leading fields such as a timestamp and interface name are ignored, so
/// lines copied straight out of a candump log are accepted.
pub fn parse_frame(line: &str) -> Result<Frame> {
    let token = line
        .split_whitespace()
        .last()
        .ok_or_else(|| anyhow!("empty frame"))?;
    let (addr, data) = token
        .split_once('#')
        .ok_or_else(|| anyhow!("frame '{token}' has no '#' separator"))?;

    if addr.is_empty() || addr.len() > 8 {
        bail!("frame '{token}': address must be 1 to 8 hex digits");
    }
    let address = u32::from_str_radix(addr, 16)
        .with_context(|| format!("frame '{token}': bad address"))?;

    if data.len() % 2 != 0 {
        bail!("frame '{token}': payload has an odd number of hex digits");
    }
    let bytes = (0..data.len())
        .step_by(2)
        .map(|i| {
            data.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| anyhow!("frame '{token}': bad payload byte at offset {}", i / 2))
        })
        .collect::<Result<Vec<u8>>>()?;

    Frame::from_bytes(address, &bytes)
        .ok_or_else(|| anyhow!("frame '{token}': payload longer than 8 bytes"))
}

/// Pick the bus frames are decoded against.
fn select_bus<'a>(doc: &'a Document, protocol: Option<&str>) -> Result<&'a BusSpec> {
    match doc {
        Document::Bus(bus) => {
            if let Some(name) = protocol {
                log::warn!("Ignoring --protocol {name}: input is a single bus");
            }
            Ok(bus)
        }
        Document::System(system) => match protocol {
            Some(name) => system
                .protocol(name)
                .map(|p| &p.bus)
                .ok_or_else(|| anyhow!("system '{}' has no protocol '{name}'", system.name())),
            None => {
                let mut protocols = system.protocols().iter();
                match (protocols.next(), protocols.next()) {
                    (Some(only), None) => Ok(&only.bus),
                    (None, _) => bail!("system '{}' declares no protocols", system.name()),
                    (Some(_), Some(_)) => bail!(
                        "system '{}' declares {} protocols; choose one with --protocol",
                        system.name(),
                        system.protocols().len()
                    ),
                }
            }
        },
    }
}

/// Decode a batch of frames in parallel, keeping input order.
pub fn decode_frames(
    bus: &BusSpec,
    units: &UnitRegistry,
    frames: &[Frame],
) -> Vec<Result<BTreeMap<String, Value>, DecodeError>> {
    frames
        .par_iter()
        .map(|frame| bus.interpret(frame, units))
        .collect()
}

fn render_text(values: &BTreeMap<String, Value>) -> String {
    values
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn run_decode(input: &Path, protocol: Option<&str>, lines: &[String], json: bool) -> Result<()> {
    let doc = load_document(input)?;
    let bus = select_bus(&doc, protocol)?;

    let frames = lines
        .iter()
        .map(|l| l.as_str().trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(parse_frame)
        .collect::<Result<Vec<_>>>()?;
    if frames.is_empty() {
        bail!("No frames given. Use --frame ADDR#DATA or --frames <file>");
    }

    let units = UnitRegistry::new();
    let results = decode_frames(bus, &units, &frames);

    let mut failed = 0;
    for (frame, result) in frames.iter().zip(&results) {
        match result {
            Ok(values) => {
                let message = bus.message(frame.address).map_or("", |m| m.name());
                if json {
                    let line = serde_json::json!({
                        "frame": frame.to_string(),
                        "address": frame.address,
                        "message": message,
                        "values": values,
                    });
                    println!("{line}");
                } else {
                    println!("{frame} {message} {}", render_text(values));
                }
            }
            Err(e) => {
                eprintln!("FAILED {frame}: {e}");
                failed += 1;
            }
        }
    }

    log::info!("Decoded {} of {} frames", frames.len() - failed, frames.len());
    if failed > 0 {
        bail!("{failed} of {} frames failed to decode", frames.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use busspec_ir::{MessageSpec, SegmentDef, SegmentSpec, WidthType};

    #[test]
    fn parse_frame_short_payload() {
        let frame = parse_frame("120#012C03").unwrap();
        assert_eq!(frame, Frame::new(0x120, 0x012C_0300_0000_0000));
        assert_eq!(frame, parse_frame("120#012C030000000000").unwrap());
    }

    #[test]
    fn parse_frame_candump_log_line() {
        let frame = parse_frame("(1700000000.123456) can0 7DF#0201").unwrap();
        assert_eq!(frame, Frame::new(0x7DF, 0x0201_0000_0000_0000));
    }

    #[test]
    fn parse_frame_empty_payload() {
        assert_eq!(parse_frame("7FF#").unwrap(), Frame::new(0x7FF, 0));
    }

    #[test]
    fn parse_frame_rejects_malformed() {
        assert!(parse_frame("120").unwrap_err().to_string().contains("separator"));
        assert!(parse_frame("120#ABC").unwrap_err().to_string().contains("odd"));
        assert!(parse_frame("#00").is_err());
        assert!(parse_frame("12G#00").is_err());
        assert!(parse_frame("120#0G").is_err());
        assert!(
            parse_frame("120#000102030405060708")
                .unwrap_err()
                .to_string()
                .contains("longer than 8 bytes")
        );
    }

    #[test]
    fn decode_frames_keeps_order() {
        let seg = SegmentSpec::new(SegmentDef::new("b", WidthType::UInt8, 0, 8)).unwrap();
        let bus = BusSpec::from_messages(
            "inline",
            [MessageSpec::with_segments("m", 0x10, [seg]).unwrap()],
        );
        let frames: Vec<Frame> = (0..64u64).map(|i| Frame::new(0x10, i)).collect();
        let results = decode_frames(&bus, &UnitRegistry::new(), &frames);
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap()["b"], Value::UInt(i as u64));
        }
    }

    #[test]
    fn select_bus_requires_protocol_when_ambiguous() {
        let mut system = busspec_ir::SystemSpec::new("car", Vec::<String>::new(), Vec::<String>::new());
        system
            .add_protocol(busspec_ir::Protocol::new("a", BusSpec::new("a")))
            .unwrap();
        system
            .add_protocol(busspec_ir::Protocol::new("b", BusSpec::new("b")))
            .unwrap();
        let doc = Document::System(system);

        let err = select_bus(&doc, None).unwrap_err();
        assert!(err.to_string().contains("choose one with --protocol"));
        assert_eq!(select_bus(&doc, Some("b")).unwrap().source(), "b");
        assert!(select_bus(&doc, Some("c")).is_err());
    }
}
