//! Object dictionary compiler for CANopen devices
//!
//! ## Device Description
//!
//! A device description lists the communication features of a device and all the objects in its
//! object dictionary. It is usually read from a TOML file using
//! [`DeviceDescription::load`](odgen_common::DeviceDescription::load), but can just as well be
//! built in code.
//!
//! ## Artifacts
//!
//! Compiling a description produces five text artifacts, each identified by a three letter tag:
//!
//! | Tag   | Artifact                                                           |
//! | ----- | ------------------------------------------------------------------ |
//! | `ODH` | `CO_OD.h`: storage structures, feature macros and aliases          |
//! | `ODC` | `CO_OD.c`: initialized storage and the object dictionary table     |
//! | `EDS` | Electronic data sheet                                              |
//! | `XDD` | XML device description                                             |
//! | `HTM` | HTML documentation                                                 |
//!
//! Problems in the description itself don't stop the compilation. They are collected as
//! [`Diagnostic`]s and returned next to the artifacts, which are always generated in full.
//!
//! ### Example
//!
//! ```ignore
//! let compilation = odgen_build::compile_device_description("device.toml")?;
//! for diagnostic in &compilation.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! odgen_build::write_artifacts(&compilation, "out", "device")?;
//! ```
#![warn(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations
)]

use std::path::{Path, PathBuf};

use odgen_common::DeviceDescription;
use snafu::ResultExt;

pub mod analyzer;
pub mod buckets;
mod codegen;
pub mod diagnostics;
pub mod emit;
pub mod errors;
pub mod features;
pub mod groups;
mod markup;
pub mod tables;
pub mod values;

use crate::errors::*;
pub use analyzer::{analyze, Analysis};
pub use diagnostics::{Diagnostic, GroupField};
pub use errors::CompileError;

/// The kinds of artifact produced by a compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// `CO_OD.h`
    Header,
    /// `CO_OD.c`
    Source,
    /// Electronic data sheet
    Eds,
    /// XML device description
    Xdd,
    /// HTML documentation
    Doc,
}

impl ArtifactKind {
    /// All artifact kinds, in generation order
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Header,
        ArtifactKind::Source,
        ArtifactKind::Eds,
        ArtifactKind::Xdd,
        ArtifactKind::Doc,
    ];

    /// The three letter tag identifying the artifact
    pub fn tag(&self) -> &'static str {
        match self {
            ArtifactKind::Header => "ODH",
            ArtifactKind::Source => "ODC",
            ArtifactKind::Eds => "EDS",
            ArtifactKind::Xdd => "XDD",
            ArtifactKind::Doc => "HTM",
        }
    }

    /// Name of the file the artifact is saved to
    ///
    /// The C sources have fixed names, the others are named after the description file.
    pub fn file_name(&self, stem: &str) -> String {
        match self {
            ArtifactKind::Header => "CO_OD.h".into(),
            ArtifactKind::Source => "CO_OD.c".into(),
            ArtifactKind::Eds => format!("{stem}.eds"),
            ArtifactKind::Xdd => format!("{stem}.xdd"),
            ArtifactKind::Doc => format!("{stem}.html"),
        }
    }
}

/// A generated artifact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Artifact<'a> {
    /// What was generated
    pub kind: ArtifactKind,
    /// The generated text, without tag
    pub text: &'a str,
}

impl Artifact<'_> {
    /// The text prefixed by the artifact tag
    pub fn tagged(&self) -> String {
        format!("{}{}", self.kind.tag(), self.text)
    }
}

/// The result of compiling a device description
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    /// `CO_OD.h`
    pub header: String,
    /// `CO_OD.c`
    pub source: String,
    /// Electronic data sheet
    pub eds: String,
    /// XML device description
    pub xdd: String,
    /// HTML documentation
    pub doc: String,
    /// Everything found wrong with the description, in the order it was found
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// Get one artifact
    pub fn artifact(&self, kind: ArtifactKind) -> Artifact<'_> {
        let text = match kind {
            ArtifactKind::Header => &self.header,
            ArtifactKind::Source => &self.source,
            ArtifactKind::Eds => &self.eds,
            ArtifactKind::Xdd => &self.xdd,
            ArtifactKind::Doc => &self.doc,
        };
        Artifact { kind, text }
    }

    /// All five artifacts, in generation order
    pub fn artifacts(&self) -> impl Iterator<Item = Artifact<'_>> {
        ArtifactKind::ALL.into_iter().map(|kind| self.artifact(kind))
    }
}

/// Compile a device description into all artifacts
///
/// Only serializer failures are fatal; problems with the description are returned as
/// diagnostics in the [`Compilation`].
pub fn compile(description: &DeviceDescription) -> Result<Compilation, CompileError> {
    let analysis = analyze(description);

    let compilation = Compilation {
        header: emit::header::render(description, &analysis),
        source: emit::source::render(&analysis),
        eds: emit::eds::render(description, &analysis),
        xdd: emit::xdd::render(description, &analysis)?,
        doc: emit::doc::render(description, &analysis)?,
        diagnostics: analysis.diagnostics,
    };

    log::debug!(
        "Generated {} artifacts with {} diagnostics",
        ArtifactKind::ALL.len(),
        compilation.diagnostics.len()
    );
    Ok(compilation)
}

/// Load a device description TOML file and compile it
pub fn compile_device_description(
    description_path: impl AsRef<Path>,
) -> Result<Compilation, CompileError> {
    let description = DeviceDescription::load(description_path.as_ref())?;
    compile(&description)
}

/// Save all artifacts of a compilation into a directory
///
/// Returns the paths of the written files, in generation order.
pub fn write_artifacts(
    compilation: &Compilation,
    out_dir: impl AsRef<Path>,
    stem: &str,
) -> Result<Vec<PathBuf>, CompileError> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir).context(IoSnafu { path: out_dir })?;

    let mut written = Vec::new();
    for artifact in compilation.artifacts() {
        let path = out_dir.join(artifact.kind.file_name(stem));
        std::fs::write(&path, artifact.text.as_bytes()).context(IoSnafu { path: &path })?;
        log::debug!("Wrote {} to {}", artifact.kind.tag(), path.display());
        written.push(path);
    }
    Ok(written)
}
