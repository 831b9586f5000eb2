//! ExchangeError: Unified error type for mesh-exchange public APIs
//!
//! Every fallible operation in the crate returns this type. Errors fall into
//! the classes reported by [`ExchangeError::class`]; the bridge and registry
//! additionally compose integer status codes through [`ExchangeError::in_phase`].

use thiserror::Error;

use crate::mesh::cell_type::MeshVariant;

/// Coarse classification of an [`ExchangeError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    /// Unrecognized topology, byte width or location tag while constructing data.
    FatalFormat,
    /// A named window, item, mesh or field could not be resolved.
    Resolution,
    /// A caller-side contract (type, stride, size, naming) was violated.
    Precondition,
    /// Reading or writing a stream or file failed.
    Io,
    /// An external module reported a failure or could not be loaded.
    Module,
    /// A configuration document could not be parsed.
    Config,
}

/// Unified error type for mesh-exchange operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExchangeError {
    /// A connectivity table name matched none of the known topology suffixes.
    #[error("unknown element topology in connectivity table `{table}`")]
    UnknownTopology { table: String },
    /// An element with an arity outside {2,3,4,5,6,8}.
    #[error("unsupported element arity {arity}")]
    UnknownArity { arity: usize },
    /// An element whose arity the requested export variant does not accept.
    #[error("element of arity {arity} cannot be written to a {variant:?} pane")]
    ElementNotAccepted { arity: usize, variant: MeshVariant },
    /// A field byte width outside {1,4,8}.
    #[error("unsupported field byte width {0}")]
    UnknownByteWidth(usize),
    /// A field location tag outside the known set.
    #[error("unsupported field location tag `{0}`")]
    UnknownLocation(char),

    /// The named window does not exist in the store.
    #[error("window `{0}` not found")]
    MissingWindow(String),
    /// The named item does not exist on the window.
    #[error("item `{window}.{item}` not found")]
    MissingItem { window: String, item: String },
    /// Node coordinates are absent for a pane.
    #[error("pane {pane} of window `{window}` has no node coordinates")]
    MissingCoordinates { window: String, pane: i32 },
    /// Multi-pane windows cannot populate a single solver agent.
    #[error("window `{window}` has {count} panes; expected exactly one")]
    MultiplePanes { window: String, count: usize },
    /// One side of a field transfer could not be resolved.
    #[error("cannot resolve transfer fields `{source_item}` -> `{target_item}`")]
    FieldResolution {
        source_item: String,
        target_item: String,
    },
    /// A field-level transfer was requested before an overlay bound the session.
    #[error("transfer session `{0}` has no overlay binding")]
    Unbound(String),
    /// A named field is not present in the registry.
    #[error("field `{0}` not registered")]
    MissingField(String),

    /// Generic assertion-class contract violation.
    #[error("precondition violated: {0}")]
    Precondition(String),
    /// A copy between buffers of different sizes.
    #[error("buffer size mismatch for `{name}`: expected {expected} bytes, found {found}")]
    BufferSizeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// Attempted to mutate or resize a buffer owned by another producer.
    #[error("field `{0}` aliases a foreign buffer and cannot be modified")]
    AliasedBuffer(String),
    /// A file name that cannot yield a window name.
    #[error("invalid window file name `{0}`: name must start with a letter")]
    InvalidWindowName(String),

    /// I/O failure while streaming.
    #[error("I/O error: {0}")]
    Io(String),
    /// A logical module name with no registered factory.
    #[error("module `{0}` is not registered")]
    ModuleNotRegistered(String),
    /// A loaded module instance does not implement the requested interface.
    #[error("module instance `{0}` does not provide the requested interface")]
    ModuleKindMismatch(String),
    /// An external module call failed.
    #[error("module `{module}` failed: {message}")]
    Module { module: String, message: String },
    /// Configuration parse failure.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An error raised inside a numbered phase of a composed operation.
    #[error("{source} (phase offset {offset})")]
    Phase {
        offset: i32,
        source: Box<ExchangeError>,
    },
}

impl ExchangeError {
    /// Classify the error per the crate's error taxonomy.
    pub fn class(&self) -> ErrorClass {
        use ExchangeError::*;
        match self {
            UnknownTopology { .. }
            | UnknownArity { .. }
            | ElementNotAccepted { .. }
            | UnknownByteWidth(_)
            | UnknownLocation(_) => ErrorClass::FatalFormat,
            MissingWindow(_)
            | MissingItem { .. }
            | MissingCoordinates { .. }
            | MultiplePanes { .. }
            | FieldResolution { .. }
            | Unbound(_)
            | MissingField(_) => ErrorClass::Resolution,
            Precondition(_)
            | BufferSizeMismatch { .. }
            | AliasedBuffer(_)
            | InvalidWindowName(_) => ErrorClass::Precondition,
            Io(_) => ErrorClass::Io,
            ModuleNotRegistered(_) | ModuleKindMismatch(_) | Module { .. } => ErrorClass::Module,
            Config(_) => ErrorClass::Config,
            Phase { source, .. } => source.class(),
        }
    }

    /// Integer status code, composed across phases.
    ///
    /// Transfer-side resolution failures report `-1`; a multi-pane window
    /// reports `2`; everything else has base code `1` plus the offsets of the
    /// phases it was raised in.
    pub fn status_code(&self) -> i32 {
        use ExchangeError::*;
        match self {
            FieldResolution { .. } | Unbound(_) => -1,
            MultiplePanes { .. } => 2,
            Phase { offset, source } => offset + source.status_code(),
            _ => 1,
        }
    }

    /// Wrap `self` as raised from a phase `offset` codes further along.
    pub fn in_phase(self, offset: i32) -> Self {
        ExchangeError::Phase {
            offset,
            source: Box::new(self),
        }
    }

    /// Innermost error, with phase wrappers removed.
    pub fn root(&self) -> &ExchangeError {
        match self {
            ExchangeError::Phase { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for ExchangeError {
    fn from(err: std::io::Error) -> Self {
        ExchangeError::Io(err.to_string())
    }
}

impl From<std::fmt::Error> for ExchangeError {
    fn from(err: std::fmt::Error) -> Self {
        ExchangeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_offsets_compose() {
        let err = ExchangeError::MissingCoordinates {
            window: "fluid".into(),
            pane: 1,
        }
        .in_phase(0)
        .in_phase(2);
        assert_eq!(err.status_code(), 3);
        assert_eq!(err.class(), ErrorClass::Resolution);
        assert!(matches!(err.root(), ExchangeError::MissingCoordinates { .. }));
    }

    #[test]
    fn transfer_resolution_is_minus_one() {
        let err = ExchangeError::FieldResolution {
            source_item: "a.x".into(),
            target_item: "b.x".into(),
        };
        assert_eq!(err.status_code(), -1);
    }
}
