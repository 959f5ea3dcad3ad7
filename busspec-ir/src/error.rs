use crate::unique::KeyValue;
use crate::units::UnitError;
use thiserror::Error;

/// Coarse classification of failures, independent of the context chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Construction,
    DuplicateKey,
    RuleViolation,
    LookupFailure,
    Unit,
}

/// Errors raised while building a spec tree.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("incorrect position: {0}")]
    InvalidPosition(i64),
    #[error("length too small: {0}")]
    LengthTooSmall(i64),
    #[error("length overflows: position {position} + length {length} exceeds 64 bits")]
    LengthOverflow { position: i64, length: i64 },
    #[error("type {width} cannot hold a {length}-bit field")]
    WidthTooNarrow { width: crate::WidthType, length: u32 },
    #[error("signed={signed} disagrees with type {width}")]
    SignednessMismatch { width: crate::WidthType, signed: bool },
    #[error("little-endian field of {0} bits is not byte aligned")]
    UnalignedLittleEndian(u32),
    #[error("unknown type '{0}'")]
    UnknownWidthType(String),
    #[error("malformed enum source: {0}")]
    MalformedEnum(String),
    #[error("duplicate {key} {value}")]
    DuplicateKey { key: &'static str, value: KeyValue },
    #[error("{rule}: {reason}")]
    RuleViolation { rule: String, reason: String },
    #[error("no element with {key} {value}")]
    NotFound { key: String, value: KeyValue },
    #[error("in {kind} {name}: {source}")]
    Context {
        kind: &'static str,
        name: String,
        #[source]
        source: Box<SpecError>,
    },
}

impl SpecError {
    /// Wrap this error with the identity of the enclosing entity.
    pub fn within(self, kind: &'static str, name: impl Into<String>) -> Self {
        SpecError::Context {
            kind,
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers removed.
    pub fn root(&self) -> &SpecError {
        match self {
            SpecError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// The entity path recorded by context layers, outermost first.
    pub fn path(&self) -> Vec<(&'static str, &str)> {
        let mut path = Vec::new();
        let mut current = self;
        while let SpecError::Context { kind, name, source } = current {
            path.push((*kind, name.as_str()));
            current = source;
        }
        path
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            SpecError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            SpecError::RuleViolation { .. } => ErrorKind::RuleViolation,
            SpecError::NotFound { .. } => ErrorKind::LookupFailure,
            _ => ErrorKind::Construction,
        }
    }
}

/// Attach entity context to the error side of a `Result`.
pub trait ResultExt<T> {
    fn within(self, kind: &'static str, name: &str) -> Result<T, SpecError>;
}

impl<T> ResultExt<T> for Result<T, SpecError> {
    fn within(self, kind: &'static str, name: &str) -> Result<T, SpecError> {
        self.map_err(|e| e.within(kind, name))
    }
}

/// Errors raised while decoding a frame against a built spec.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("raw value {raw} has no enum entry")]
    UnknownEnumValue { raw: u64 },
    #[error("no message at address {0:#x}")]
    UnknownAddress(u32),
    #[error("no protocol named '{0}'")]
    UnknownProtocol(String),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error("in segment {segment}: {source}")]
    InSegment {
        segment: String,
        #[source]
        source: Box<DecodeError>,
    },
    #[error("in message {message}: {source}")]
    InMessage {
        message: String,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub fn root(&self) -> &DecodeError {
        match self {
            DecodeError::InSegment { source, .. } | DecodeError::InMessage { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            DecodeError::Unit(_) => ErrorKind::Unit,
            _ => ErrorKind::LookupFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_renders_path() {
        let err = SpecError::DuplicateKey {
            key: "value",
            value: KeyValue::Int(3),
        }
        .within("value", "D")
        .within("segment", "gear")
        .within("protocol", "can");
        assert_eq!(
            err.to_string(),
            "in protocol can: in segment gear: in value D: duplicate value 3"
        );
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(
            err.path(),
            vec![("protocol", "can"), ("segment", "gear"), ("value", "D")]
        );
    }

    #[test]
    fn test_decode_error_kind_through_context() {
        let err = DecodeError::InMessage {
            message: "status".into(),
            source: Box::new(DecodeError::InSegment {
                segment: "gear".into(),
                source: Box::new(DecodeError::UnknownEnumValue { raw: 7 }),
            }),
        };
        assert_eq!(err.kind(), ErrorKind::LookupFailure);
        assert!(matches!(err.root(), DecodeError::UnknownEnumValue { raw: 7 }));
    }
}
