//! Command-line inspection of OCI layout archives.
//!
//! `ocilayout` reads an image archive in OCI layout form and prints its
//! labels and layers, or extracts the uncompressed content of a single layer.

use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ocilayout::{is_oci_layout_blob, FileBlob, OciLayoutPackage};

/// ocilayout
#[derive(Debug, Parser)]
#[clap(name = "ocilayout", version)]
pub struct App {
    /// Path to the OCI layout archive (a tar file)
    archive: PathBuf,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checks whether the archive is in OCI layout format.
    /// Exits with status 1 if it isn't.
    Detect,
    /// Prints the value of a label, or an empty line if it isn't set
    Label {
        /// the label name
        name: String,
    },
    /// Prints all labels as name=value lines
    Labels,
    /// Lists the layers: diffID, media type and blob digest
    Layers,
    /// Prints the image configuration as JSON
    Config,
    /// Writes the uncompressed content of a layer
    Extract {
        /// the diffID of the layer
        diff_id: String,
        /// where to write the layer; stdout if not given
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
}

fn open_package(blob: &FileBlob) -> Result<OciLayoutPackage<&FileBlob>> {
    OciLayoutPackage::new(blob)
        .with_context(|| format!("Reading OCI layout {}", blob.path().display()))
}

fn run(args: App) -> Result<ExitCode> {
    let blob = FileBlob::new(&args.archive);
    let mut out = io::stdout().lock();

    match args.cmd {
        Command::Detect => {
            let is_layout = is_oci_layout_blob(&blob)
                .with_context(|| format!("Inspecting {}", args.archive.display()))?;
            if !is_layout {
                writeln!(out, "not an OCI layout")?;
                return Ok(ExitCode::FAILURE);
            }
            writeln!(out, "OCI layout")?;
        }
        Command::Label { name } => {
            let package = open_package(&blob)?;
            writeln!(out, "{}", package.label(&name))?;
        }
        Command::Labels => {
            let package = open_package(&blob)?;
            let mut labels: Vec<_> = package.labels().into_iter().flatten().collect();
            labels.sort();
            for (name, value) in labels {
                writeln!(out, "{name}={value}")?;
            }
        }
        Command::Layers => {
            let package = open_package(&blob)?;
            for diff_id in package.diff_ids() {
                let descriptor = package.layer_descriptor(diff_id)?;
                writeln!(
                    out,
                    "{diff_id} {} {}",
                    descriptor.media_type(),
                    descriptor.digest()
                )?;
            }
        }
        Command::Config => {
            let package = open_package(&blob)?;
            let json = package
                .config()
                .to_string_pretty()
                .context("Serializing image configuration")?;
            writeln!(out, "{json}")?;
        }
        Command::Extract { diff_id, output } => {
            let package = open_package(&blob)?;
            let mut layer = package.get_layer(&diff_id)?;

            let copied = match &output {
                Some(path) => {
                    let mut file = File::create(path)
                        .with_context(|| format!("Creating {}", path.display()))?;
                    io::copy(&mut layer, &mut file)?
                }
                None => io::copy(&mut layer, &mut out)?,
            };
            layer.close().context("Closing layer stream")?;
            log::debug!("Extracted {copied} bytes of layer {diff_id}");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    run(App::parse())
}
