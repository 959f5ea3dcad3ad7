pub mod parser;
pub mod yaml_model;

pub use parser::{
    bus_from_value, load_bus_file, load_system_file, parse_bus, parse_system,
    parse_system_with, YamlParseError,
};
