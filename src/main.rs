//
// main.rs
// Dicom-Sco-To-Bto-rs
//
// Entry point: sets up logging, hands off to the CLI layer and reports any failure.
//
// Thales Matheus Mendonça Santos - October 2026

use clap::Parser;
use dicom_sco_to_bto::{cli, logging};
use tracing::error;

fn main() {
    let cli = cli::Cli::parse();
    logging::init(cli.verbose);

    // Failures are logged, not turned into exit codes.
    if let Err(e) = cli::run(cli) {
        error!("{:#}", e);
    }
}
