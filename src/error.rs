use crate::boxes::FourCC;

/// Errors raised while building a box tree.
///
/// Every variant except [`ParseError::Truncated`] names the box it happened
/// in. A bare `Truncated` coming out of a box decoder is wrapped once, at the
/// innermost box, into [`ParseError::InBox`].
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// `available` counts the bytes left in the enclosing span: the parent
    /// box for children, the whole buffer at top level.
    #[error("truncated at offset {offset}: need {needed} bytes, {available} left in the enclosing span")]
    Truncated {
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("box '{typ}' at offset {offset}: size {size} is smaller than its {header_size}-byte header")]
    InvalidSize {
        typ: FourCC,
        offset: u64,
        size: u64,
        header_size: u64,
    },

    #[error("box '{typ}' at offset {offset}: size {size} exceeds the {available} bytes left in its parent")]
    OutOfBounds {
        typ: FourCC,
        offset: u64,
        size: u64,
        available: u64,
    },

    #[error("box '{typ}' at offset {offset}: declared {declared} bytes but decoder consumed {consumed}")]
    StructuralMismatch {
        typ: FourCC,
        offset: u64,
        declared: u64,
        consumed: u64,
    },

    #[error("box '{typ}' at offset {offset}: unsupported version {version}")]
    UnsupportedVersion { typ: FourCC, offset: u64, version: u8 },

    #[error("box '{typ}' at offset {offset}: nesting depth {depth} exceeds the configured limit")]
    TooDeep { typ: FourCC, offset: u64, depth: usize },

    #[error("in box '{typ}' at offset {offset}")]
    InBox {
        typ: FourCC,
        offset: u64,
        #[source]
        source: Box<ParseError>,
    },
}

/// Coarse classification of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input ended before a read could complete.
    Truncated,
    /// Box geometry does not add up.
    Structural,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::Truncated { .. } => ErrorKind::Truncated,
            ParseError::InBox { source, .. } => source.kind(),
            _ => ErrorKind::Structural,
        }
    }

    /// Type and offset of the box the error was raised in, if known.
    pub fn location(&self) -> Option<(FourCC, u64)> {
        match self {
            ParseError::Truncated { .. } => None,
            ParseError::InvalidSize { typ, offset, .. }
            | ParseError::OutOfBounds { typ, offset, .. }
            | ParseError::StructuralMismatch { typ, offset, .. }
            | ParseError::UnsupportedVersion { typ, offset, .. }
            | ParseError::TooDeep { typ, offset, .. }
            | ParseError::InBox { typ, offset, .. } => Some((*typ, *offset)),
        }
    }

    pub(crate) fn in_box(self, typ: FourCC, offset: u64) -> Self {
        match self {
            ParseError::Truncated { .. } => ParseError::InBox {
                typ,
                offset,
                source: Box::new(self),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
