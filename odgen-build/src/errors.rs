//! Fatal errors
//!
//! Problems with the content of a device description never end up here: they are reported as
//! [`Diagnostic`](crate::diagnostics::Diagnostic)s while generation carries on. A
//! [`CompileError`] means no artifacts could be produced or saved at all.
use std::path::PathBuf;

use odgen_common::LoadError;
use snafu::Snafu;

/// Error returned when compiling a device description fails
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
    /// The device description file could not be loaded
    #[snafu(display("Error loading device description: {source}"))]
    Load {
        /// The underlying load error
        source: LoadError,
    },
    /// An artifact could not be written to disk
    #[snafu(display("Error writing {}: {source}", path.display()))]
    Io {
        /// Path of the file being written
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },
    /// The XDD document could not be serialized
    #[snafu(display("Error serializing XDD: {source}"))]
    XmlSerialize {
        /// The serializer error
        source: quick_xml::errors::serialize::SeError,
    },
    /// The HTML document could not be written
    #[snafu(display("Error writing HTML markup: {source}"))]
    Markup {
        /// The underlying writer error
        source: std::io::Error,
    },
}

impl From<LoadError> for CompileError {
    fn from(source: LoadError) -> Self {
        CompileError::Load { source }
    }
}
