mod pack_profile;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use folio::workspace::{PackOptions, PackReport, UnpackReport, Workspace};
use folio::RandomKeyGenerator;
use log::LevelFilter;
use pack_profile::{parse_pack_profile, PackProfile};
use simple_logger::SimpleLogger;
use structopt::StructOpt;

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
const LIBRARY_NAME: &str = "folio";
const DEFAULT_ARCHIVE_NAME: &str = "output.fol";

#[derive(Debug, StructOpt)]
#[structopt(name = PKG_NAME, about = PKG_DESCRIPTION, author = PKG_AUTHORS)]
struct Opt {
    #[structopt(short, long, help = "Enable verbose logging")]
    verbose: bool,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Extracts an archive into a workspace
    Unpack {
        #[structopt(parse(from_os_str), help = "Path to the archive to extract")]
        archive: PathBuf,
        #[structopt(
            parse(from_os_str),
            help = "Path to the workspace directory (default: <archive_name>_project)"
        )]
        workspace: Option<PathBuf>,
    },
    /// Builds an archive out of a workspace
    Pack {
        #[structopt(parse(from_os_str), help = "Path to the workspace directory")]
        workspace: PathBuf,
        #[structopt(
            parse(from_os_str),
            help = "Path to the output archive (default: output.fol)"
        )]
        archive: Option<PathBuf>,
        #[structopt(
            parse(from_os_str),
            short,
            long,
            help = "Path to the manifest or key file to use (default: <workspace>/manifest.txt)"
        )]
        manifest: Option<PathBuf>,
        #[structopt(parse(from_os_str), short, long, help = "Path to a pack profile")]
        profile: Option<PathBuf>,
        #[structopt(short, long, help = "Seed used to generate keys of new files")]
        seed: Option<u64>,
    },
}

fn run(cli_args: Opt) -> Result<()> {
    match cli_args.command {
        Command::Unpack { archive, workspace } => {
            let workspace = workspace
                .map(Workspace::new)
                .unwrap_or_else(|| Workspace::for_archive(&archive));
            let report = folio::unpack(&archive, &workspace).with_context(|| {
                format!("Failed to unpack '{}'", archive.to_string_lossy())
            })?;
            log_unpack_summary(&report);
            log::info!(
                "Workspace written at '{}'",
                workspace.root().to_string_lossy()
            );
        }
        Command::Pack {
            workspace,
            archive,
            manifest,
            profile,
            seed,
        } => {
            let pack_profile = match profile {
                Some(profile_path) => {
                    log::info!("Using profile '{}'", profile_path.to_string_lossy());
                    parse_pack_profile(&profile_path)
                        .context("Failed to parse the pack profile")?
                }
                None => PackProfile::default(),
            };
            let archive = archive.unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_NAME));
            let options = PackOptions {
                manifest_path: manifest,
                scan_filter: pack_profile.scan_filter(),
            };
            let mut key_generator = match seed.or(pack_profile.key_seed) {
                Some(seed) => {
                    log::info!("Key seed: {}", seed);
                    RandomKeyGenerator::seeded(seed)
                }
                None => RandomKeyGenerator::from_entropy(),
            };

            let workspace = Workspace::new(workspace);
            let report = folio::pack(&workspace, &archive, &options, &mut key_generator)
                .with_context(|| {
                    format!(
                        "Failed to pack '{}'",
                        workspace.root().to_string_lossy()
                    )
                })?;
            log_pack_summary(&report);
            log::info!("Archive generated at '{}'", archive.to_string_lossy());
        }
    }
    Ok(())
}

fn log_unpack_summary(report: &UnpackReport) {
    if report.is_complete() {
        return;
    }
    log::warn!(
        "{} of {} entries could not be extracted:",
        report.failures.len(),
        report.entries
    );
    for failure in &report.failures {
        log::warn!("  #{} '{}': {}", failure.index, failure.archive_path, failure.error);
    }
}

fn log_pack_summary(report: &PackReport) {
    if !report.unreadable.is_empty() {
        log::warn!(
            "{} entries of the assets directory could not be read and have been ignored",
            report.unreadable.len()
        );
    }
    if !report.missing.is_empty() {
        log::warn!(
            "{} manifest entries were not found on disk and have been dropped",
            report.missing.len()
        );
    }
    if !report.skipped.is_empty() {
        log::warn!(
            "{} files could not be read and have been packed empty:",
            report.skipped.len()
        );
        for skipped_file in &report.skipped {
            log::warn!("  '{}': {}", skipped_file.archive_path, skipped_file.error);
        }
    }
}

fn main() {
    const SUCCESS_EXIT_CODE: i32 = 0;
    const FAILURE_EXIT_CODE: i32 = 1;

    // Parse CLI arguments
    let cli_args = Opt::from_args();
    // Initialize the logger
    init_logger(cli_args.verbose).expect("Failed to initalize the logger");

    // Run the actual program
    let result = run(cli_args);
    match result {
        Ok(()) => {
            process::exit(SUCCESS_EXIT_CODE);
        }
        Err(err) => {
            log::error!("{:#}", err);
            process::exit(FAILURE_EXIT_CODE);
        }
    }
}

fn init_logger(verbose: bool) -> Result<()> {
    let level_filter = if verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };

    SimpleLogger::new()
        .with_level(LevelFilter::Off)
        .with_module_level(PKG_NAME, level_filter)
        .with_module_level(LIBRARY_NAME, level_filter)
        .init()?;
    Ok(())
}
