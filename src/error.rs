use core::fmt;

#[cfg(debug_assertions)]
mod error_impl {
    use super::{Error, ErrorExt, ErrorKind};
    use alloc::vec::Vec;

    /// Context messages, innermost first.
    pub type ErrorInner = Vec<&'static str>;

    impl ErrorExt for Error {
        #[inline]
        fn contexts(&self) -> &[&'static str] {
            &self.inner
        }
        #[inline]
        fn chain_ctx(mut self, ctx: &'static str) -> Error {
            self.inner.push(ctx);
            self
        }
    }
    impl From<ErrorKind> for Error {
        #[inline]
        fn from(kind: ErrorKind) -> Error {
            Error {
                kind,
                inner: Vec::new(),
            }
        }
    }
}

#[cfg(not(debug_assertions))]
mod error_impl {
    use super::{Error, ErrorExt, ErrorKind};

    /// In release mode errors are just their kind.
    pub type ErrorInner = ();
    impl ErrorExt for Error {
        #[inline]
        fn contexts(&self) -> &[&'static str] {
            &[]
        }
        #[inline]
        fn chain_ctx(self, _ctx: &'static str) -> Error {
            self
        }
    }
    impl From<ErrorKind> for Error {
        #[inline]
        fn from(kind: ErrorKind) -> Error {
            Error { kind, inner: () }
        }
    }
}

/// Represents an error while decoding a Standard Midi File.
///
/// This type wraps an `ErrorKind` and includes a chain of context messages in debug mode,
/// describing what the decoder was doing when the error occurred.
/// In release mode it is a thin wrapper around `ErrorKind`, so the `Error::contexts` method
/// always returns an empty slice.
///
/// If the `std` feature is enabled, this type implements `std::error::Error`.
///
/// All errors are fatal: no part of a file is considered valid once decoding fails.
#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    inner: self::error_impl::ErrorInner,
}
impl Error {
    /// Create a new error with the given `ErrorKind`.
    #[inline]
    pub fn new(kind: ErrorKind) -> Error {
        Error::from(kind)
    }

    /// What went wrong.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// What the decoder was doing when the error happened, innermost activity first.
    ///
    /// Always empty in release mode.
    #[inline]
    pub fn contexts(&self) -> &[&'static str] {
        ErrorExt::contexts(self)
    }
}
impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for ctx in self.contexts() {
            writeln!(f)?;
            write!(f, "  while {}", ctx)?;
        }
        Ok(())
    }
}
#[cfg(feature = "std")]
impl std::error::Error for Error {}

trait ErrorExt {
    fn contexts(&self) -> &[&'static str];
    fn chain_ctx(self, ctx: &'static str) -> Error;
}

/// The type of error that occurred while decoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A read requested more bytes than remain in the buffer.
    EndOfStream,
    /// A chunk carried a different tag than the one expected at that position.
    UnexpectedChunkType {
        /// The tag that should have been there, for example `*b"MTrk"`.
        expected: [u8; 4],
        /// The tag actually found in the file.
        found: [u8; 4],
    },
    /// A data byte appeared in a track before any status byte established a running status.
    MissingStatusByte,
    /// A data byte that must be below 128 was not. Carries the offending byte.
    DataByteOutOfRange(u8),
    /// The file cannot be decoded at all, for example because it uses SMPTE timing.
    Invalid(&'static str),
    /// The file could be read, but it is clearly corrupted.
    ///
    /// This kind of error is only emitted if the `strict` crate feature is enabled.
    Malformed(&'static str),
}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::EndOfStream => write!(f, "unexpected end of stream"),
            ErrorKind::UnexpectedChunkType { expected, found } => write!(
                f,
                "expected chunk {:?}, found {:?}",
                TagDisplay(expected),
                TagDisplay(found)
            ),
            ErrorKind::MissingStatusByte => write!(f, "missing status byte"),
            ErrorKind::DataByteOutOfRange(byte) => {
                write!(f, "data byte out of range: {:#04x}", byte)
            }
            ErrorKind::Invalid(msg) => write!(f, "invalid midi: {}", msg),
            ErrorKind::Malformed(msg) => write!(f, "malformed midi: {}", msg),
        }
    }
}

/// Shows a chunk tag as text, escaping non-printable bytes.
struct TagDisplay<'a>(&'a [u8; 4]);
impl fmt::Debug for TagDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("\"")?;
        for &b in self.0.iter() {
            for c in core::ascii::escape_default(b) {
                fmt::Write::write_char(f, c as char)?;
            }
        }
        f.write_str("\"")
    }
}

macro_rules! err_invalid {
    ($msg:expr) => {{
        ErrorKind::Invalid($msg)
    }};
}
macro_rules! err_malformed {
    ($msg:expr) => {{
        ErrorKind::Malformed($msg)
    }};
}

pub(crate) trait ResultExt<T> {
    fn context(self, ctx: &'static str) -> StdResult<T, Error>;
}
impl<T> ResultExt<T> for StdResult<T, Error> {
    #[inline]
    fn context(self, ctx: &'static str) -> StdResult<T, Error> {
        self.map_err(|err| err.chain_ctx(ctx))
    }
}
impl<T> ResultExt<T> for StdResult<T, ErrorKind> {
    #[inline]
    fn context(self, ctx: &'static str) -> StdResult<T, Error> {
        self.map_err(|kind| Error::from(kind).chain_ctx(ctx))
    }
}

/// The result type used by the MIDI decoder.
pub type Result<T> = StdResult<T, Error>;
pub(crate) use core::result::Result as StdResult;
