//! The error type shared by every layer of the store: the KV engine
//! wrapper, the term dictionary, the quad index and the graph
//! algebra all return `CResult<T>`.

use std::fmt;

/// Convenience alias used throughout the crate, named after the teacher's
/// own `CResult`.
pub type CResult<T> = Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A term, key or triple is absent. Only `Dictionary::from_key` and
    /// `from_keys` surface this to callers; lookups convert it to an empty
    /// result instead.
    NotFound(String),

    /// Duplicate insert under a no-overwrite flag. Swallowed by `QuadIndex::add`
    /// and its sub-index writes; propagated by `Namespaces::bind`.
    KeyExists,

    /// The term dictionary has allocated every key of width `W`.
    KeySpaceExhausted,

    /// The KV engine has exhausted its reserved `map_size`.
    MapFull,

    /// The reader slot table is saturated.
    ReadersFull,

    /// Operation attempted on an aborted or committed transaction.
    BadTxn,

    /// A key referenced by an index is missing from `term_by_key`.
    Corrupted(String),

    /// A malformed term, e.g. a literal with both datatype and language.
    InvalidArgument(String),

    /// The environment header's key width disagrees with the caller's.
    KeyWidthMismatch { stored: u8, requested: u8 },

    Io(std::io::Error),

    Encoding(String),

    /// Catch-all for engine failures that don't map onto one of the kinds
    /// above (propagated as-is from `heed`).
    Engine(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(what) => write!(f, "not found: {what}"),
            Error::KeyExists => write!(f, "key already exists"),
            Error::KeySpaceExhausted => write!(f, "key space exhausted for the configured key width"),
            Error::MapFull => write!(f, "map_size exceeded"),
            Error::ReadersFull => write!(f, "reader slot table is full"),
            Error::BadTxn => write!(f, "transaction already committed or aborted"),
            Error::Corrupted(what) => write!(f, "corrupted: {what}"),
            Error::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
            Error::KeyWidthMismatch { stored, requested } => write!(
                f,
                "store was bootstrapped with key width {stored} bytes, but {requested} was requested"
            ),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Encoding(what) => write!(f, "encoding error: {what}"),
            Error::Engine(what) => write!(f, "engine error: {what}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<heed::Error> for Error {
    fn from(err: heed::Error) -> Self {
        use heed::Error as HeedError;
        match &err {
            HeedError::Mdb(heed::MdbError::MapFull) => Error::MapFull,
            HeedError::Mdb(heed::MdbError::ReadersFull) => Error::ReadersFull,
            HeedError::Mdb(heed::MdbError::KeyExist) => Error::KeyExists,
            HeedError::Mdb(heed::MdbError::NotFound) => Error::NotFound(err.to_string()),
            HeedError::Mdb(heed::MdbError::BadTxn) => Error::BadTxn,
            _ => Error::Engine(err.to_string()),
        }
    }
}
