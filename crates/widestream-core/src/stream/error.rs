//! Stream error type.

use std::io;

use thiserror::Error;

use super::mode::OpenMode;

/// Failures reported by [`BufferedFileStream`](super::BufferedFileStream).
///
/// End of file is not an error: reads report it as `None` or a short count.
#[derive(Debug, Error)]
pub enum StreamError {
    /// `open`/`attach` on a stream that already has a handle. Nothing changed.
    #[error("stream is already open")]
    AlreadyOpen,
    /// Operation on a closed stream.
    #[error("stream is not open")]
    NotOpen,
    /// Path encoding or the native open call failed; the stream stays closed.
    #[error("cannot open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: io::Error,
    },
    /// Flag combination with no classic equivalent.
    #[error("invalid open mode {0:?}")]
    InvalidMode(OpenMode),
    #[error("stream was not opened for reading")]
    NotReadable,
    #[error("stream was not opened for writing")]
    NotWritable,
    /// Target position cannot be represented by the handle. Nothing changed.
    #[error("seek target {target} is out of range")]
    SeekOutOfRange { target: i128 },
    /// Buffer reconfiguration refused because pending data could not be synced.
    #[error("cannot change buffer while data is pending: {source}")]
    InvalidTransition {
        #[source]
        source: Box<StreamError>,
    },
    /// Native read, write, seek or close failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io(e) => e,
            StreamError::SeekOutOfRange { .. } | StreamError::InvalidMode(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            StreamError::NotReadable | StreamError::NotWritable => {
                io::Error::new(io::ErrorKind::Unsupported, err)
            }
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_pass_through() {
        let err = StreamError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        let back: io::Error = err.into();
        assert_eq!(back.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn seek_range_maps_to_invalid_input() {
        let back: io::Error = StreamError::SeekOutOfRange { target: -1 }.into();
        assert_eq!(back.kind(), io::ErrorKind::InvalidInput);
        assert!(back.to_string().contains("-1"));
    }

    #[test]
    fn transition_keeps_cause() {
        let err = StreamError::InvalidTransition {
            source: Box::new(StreamError::NotOpen),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("stream is not open"));
    }
}
