//
// cli.rs
// Dicom-Sco-To-Bto-rs
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::blob::ImagingResolution;
use crate::convert::{ConversionOptions, ScoConverter};
use crate::decoder::JpegLsDecoder;
use crate::{batch, inspect, transcode};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "sco-to-bto")]
#[command(about = "Converts Hologic SCO tomosynthesis files into DICOM BTO files", long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert one Hologic SCO file into a multi-frame BTO file
    Convert {
        /// Input Hologic SCO file
        #[arg(short, long)]
        input: PathBuf,
        /// Output DICOM BTO file
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        conversion: ConversionArgs,
    },
    /// Print the imaging blob header and frame table
    Inspect {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Resolution::Full)]
        resolution: Resolution,
        #[arg(long)]
        json: bool,
    },
    /// Convert every .dcm file found under a directory
    Batch {
        #[arg(short, long)]
        directory: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        conversion: ConversionArgs,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConversionArgs {
    /// Private sequence to read the frames from
    #[arg(long, value_enum, default_value_t = Resolution::Full)]
    pub resolution: Resolution,
    #[arg(
        long,
        value_enum,
        default_value_t = TransferSyntax::ExplicitVrLittleEndian,
        help = "Target transfer syntax (uncompressed only)"
    )]
    pub transfer_syntax: TransferSyntax,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Resolution {
    Full,
    Lower,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum TransferSyntax {
    ExplicitVrLittleEndian,
    ImplicitVrLittleEndian,
}

impl From<Resolution> for ImagingResolution {
    fn from(value: Resolution) -> Self {
        match value {
            Resolution::Full => ImagingResolution::Full,
            Resolution::Lower => ImagingResolution::Lower,
        }
    }
}

impl From<TransferSyntax> for transcode::UncompressedTransferSyntax {
    fn from(value: TransferSyntax) -> Self {
        match value {
            TransferSyntax::ExplicitVrLittleEndian => {
                transcode::UncompressedTransferSyntax::ExplicitVRLittleEndian
            }
            TransferSyntax::ImplicitVrLittleEndian => {
                transcode::UncompressedTransferSyntax::ImplicitVRLittleEndian
            }
        }
    }
}

impl From<&ConversionArgs> for ConversionOptions {
    fn from(args: &ConversionArgs) -> Self {
        ConversionOptions {
            resolution: args.resolution.into(),
            transfer_syntax: args.transfer_syntax.into(),
        }
    }
}

/// Dispatch an already parsed command line.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Convert {
            input,
            output,
            conversion,
        } => {
            let converter = ScoConverter::new(JpegLsDecoder, (&conversion).into());
            let summary = converter.convert_file(&input, &output)?;
            info!(
                "Converted {} frame(s) ({:?}) to {:?}",
                summary.frames, summary.encoding, output
            );
        }
        Commands::Inspect {
            file,
            resolution,
            json,
        } => {
            let summary = inspect::inspect_file(&file, resolution.into())?;
            inspect::print_summary(&file, &summary, json)?;
        }
        Commands::Batch {
            directory,
            output,
            conversion,
        } => {
            let converter = ScoConverter::new(JpegLsDecoder, (&conversion).into());
            let report = batch::process_directory(&directory, &output, &converter)?;
            info!(
                "Batch finished: {} converted, {} failed",
                report.converted,
                report.failed.len()
            );
        }
    }

    Ok(())
}
