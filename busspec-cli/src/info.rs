use anyhow::Result;
use busspec_ir::BusSpec;
use std::path::Path;

use crate::{Document, load_document};

fn print_messages(bus: &BusSpec, indent: &str) {
    for message in bus.messages() {
        println!(
            "{indent}{:#05x}  {} ({} segments)",
            message.address(),
            message.name(),
            message.segments().len()
        );
    }
}

pub fn run_info(input: &Path) -> Result<()> {
    let doc = load_document(input)?;
    println!("File:          {}", input.display());

    match &doc {
        Document::Bus(bus) => {
            println!("Kind:          bus");
            println!("Messages:      {}", bus.len());
            print_messages(bus, "  ");
        }
        Document::System(system) => {
            let join = |set: &std::collections::BTreeSet<String>| {
                set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
            };
            println!("Kind:          system");
            println!("Name:          {}", system.name());
            println!("Architectures: {}", join(system.architectures()));
            println!("Units:         {}", join(system.units()));

            let boards: Vec<String> = system
                .boards()
                .iter()
                .map(|b| match &b.architecture {
                    Some(arch) => format!("{} [{arch}]", b.name),
                    None => b.name.clone(),
                })
                .collect();
            println!("Boards:        {} ({})", boards.len(), boards.join(", "));

            println!("Protocols:     {}", system.protocols().len());
            for protocol in system.protocols() {
                println!(
                    "  {}: {} messages from {}",
                    protocol.name,
                    protocol.bus.len(),
                    protocol.bus.source()
                );
                print_messages(&protocol.bus, "    ");
            }
        }
    }

    Ok(())
}
