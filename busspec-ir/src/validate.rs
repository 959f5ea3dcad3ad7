use crate::bus::BusSpec;
use crate::message::MessageSpec;
use crate::system::SystemSpec;
use std::collections::BTreeMap;

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A lint finding on a built spec. Construction already rejected anything
/// invalid; these are layouts that are legal but likely mistakes.
#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: Severity,
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if self.path.is_empty() {
            write!(f, "{prefix}: {}", self.message)
        } else {
            write!(f, "{prefix}: {}: {}", self.path, self.message)
        }
    }
}

/// Lint every message of a bus.
pub fn lint_bus(bus: &BusSpec) -> Vec<Issue> {
    let mut issues = Vec::new();
    lint_bus_into(bus, "", &mut issues);
    issues
}

/// Lint a system and the buses of all its protocols.
pub fn lint_system(system: &SystemSpec) -> Vec<Issue> {
    let mut issues = Vec::new();

    if !system.architectures().is_empty() {
        for board in system.boards() {
            if board.architecture.as_deref().unwrap_or_default().is_empty() {
                issues.push(Issue {
                    severity: Severity::Warning,
                    path: format!("board/{}", board.name),
                    message: "no architecture declared".to_string(),
                });
            }
        }
    }

    for protocol in system.protocols() {
        let prefix = format!("protocol/{}/", protocol.name);
        if protocol.bus.is_empty() {
            issues.push(Issue {
                severity: Severity::Warning,
                path: format!("protocol/{}", protocol.name),
                message: "bus has no messages".to_string(),
            });
        }
        lint_bus_into(&protocol.bus, &prefix, &mut issues);
    }

    issues
}

fn lint_bus_into(bus: &BusSpec, prefix: &str, issues: &mut Vec<Issue>) {
    let mut names: BTreeMap<&str, u32> = BTreeMap::new();
    for message in bus.messages() {
        if let Some(prev) = names.insert(message.name(), message.address()) {
            issues.push(Issue {
                severity: Severity::Error,
                path: format!("{prefix}{}", message.name()),
                message: format!(
                    "message name used at both {prev:#x} and {:#x}",
                    message.address()
                ),
            });
        }
        lint_message(message, prefix, issues);
    }
}

fn lint_message(message: &MessageSpec, prefix: &str, issues: &mut Vec<Issue>) {
    let path = format!("{prefix}{}", message.name());
    let segments: Vec<_> = message.segments().iter().collect();

    if segments.is_empty() {
        issues.push(Issue {
            severity: Severity::Warning,
            path: path.clone(),
            message: "message has no segments".to_string(),
        });
    }

    for (i, a) in segments.iter().enumerate() {
        for b in &segments[i + 1..] {
            let start = a.position().max(b.position());
            let end = (a.position() + a.length()).min(b.position() + b.length());
            if start < end {
                issues.push(Issue {
                    severity: Severity::Warning,
                    path: path.clone(),
                    message: format!(
                        "segments '{}' and '{}' overlap at bits {start}..{end}",
                        a.name(),
                        b.name()
                    ),
                });
            }
        }
    }

    for segment in &segments {
        let max = if segment.length() >= 63 {
            i64::MAX
        } else {
            (1i64 << segment.length()) - 1
        };
        for entry in segment.values() {
            if entry.value < 0 || entry.value > max {
                issues.push(Issue {
                    severity: Severity::Warning,
                    path: format!("{path}/{}", segment.name()),
                    message: format!(
                        "value {} = {} cannot occur in {} bits",
                        entry.name,
                        entry.value,
                        segment.length()
                    ),
                });
            }
        }
    }
}
