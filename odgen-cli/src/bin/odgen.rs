//! Compile a CANopen device description into CO_OD.h, CO_OD.c, EDS, XDD and HTML documentation

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use odgen_build::{compile, write_artifacts, ArtifactKind};
use odgen_common::DeviceDescription;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Artifact {
    Header,
    Source,
    Eds,
    Xdd,
    Doc,
}

impl From<Artifact> for ArtifactKind {
    fn from(value: Artifact) -> Self {
        match value {
            Artifact::Header => ArtifactKind::Header,
            Artifact::Source => ArtifactKind::Source,
            Artifact::Eds => ArtifactKind::Eds,
            Artifact::Xdd => ArtifactKind::Xdd,
            Artifact::Doc => ArtifactKind::Doc,
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Device description TOML file
    description: PathBuf,
    /// Directory to write the generated files to
    #[clap(short, long, default_value = ".")]
    out_dir: PathBuf,
    /// Write a single artifact to stdout, prefixed by its tag, instead of writing files
    #[clap(long, value_enum)]
    print: Option<Artifact>,
    /// Exit with an error when any diagnostics were reported
    #[clap(long)]
    strict: bool,
    #[clap(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let description = match DeviceDescription::load(&args.description) {
        Ok(description) => description,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", args.description.display());
            std::process::exit(1);
        }
    };

    let compiled = match compile(&description) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("Failed to compile {}: {e}", args.description.display());
            std::process::exit(1);
        }
    };

    if let Some(artifact) = args.print {
        println!("{}", compiled.artifact(artifact.into()).tagged());
    } else {
        let stem = args
            .description
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "device".to_string());
        match write_artifacts(&compiled, &args.out_dir, &stem) {
            Ok(written) => {
                for path in written {
                    log::info!("Wrote {}", path.display());
                }
            }
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }

    for diagnostic in &compiled.diagnostics {
        eprintln!("{diagnostic}");
    }
    if !compiled.diagnostics.is_empty() {
        eprintln!("{} problems found", compiled.diagnostics.len());
        if args.strict {
            std::process::exit(2);
        }
    }
}
