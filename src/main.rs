use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::info;

use imgcat::error::BatchSummary;
use imgcat::metadata::MetadataExtractor;
use imgcat::record::{BatchUpdate, UpdateField};
use imgcat::scanner::{listing, Listing, Scanner};
use imgcat::sync::SyncEngine;
use imgcat::{logging, Config};

enum Command {
    Init,
    Scan(Vec<PathBuf>),
    Extract(Vec<PathBuf>),
    Thumbs(Vec<PathBuf>),
    Set {
        field: UpdateField,
        value: String,
        folder: PathBuf,
        imagesets: Vec<String>,
    },
    Import(Vec<PathBuf>),
    Export(Vec<PathBuf>),
    ImportOne(PathBuf, String),
    ExportOne(PathBuf, String),
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("imgcat {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let Some((command, rest)) = positional.split_first() else {
        print_help();
        std::process::exit(1);
    };
    let folders = || rest.iter().map(PathBuf::from).collect::<Vec<_>>();
    let single = |make: fn(PathBuf, String) -> Command| match rest {
        [folder, imageset] => make(PathBuf::from(folder), imageset.clone()),
        _ => {
            eprintln!("Error: {} requires FOLDER and IMAGESET", command);
            std::process::exit(1);
        }
    };

    let command = match command.as_str() {
        "init" => Command::Init,
        "scan" => Command::Scan(folders()),
        "extract" => Command::Extract(folders()),
        "thumbs" => Command::Thumbs(folders()),
        "set" => match rest {
            [field, value, folder, imagesets @ ..] if !imagesets.is_empty() => {
                let field = field.parse().unwrap_or_else(|e: String| {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                });
                Command::Set {
                    field,
                    value: value.clone(),
                    folder: PathBuf::from(folder),
                    imagesets: imagesets.to_vec(),
                }
            }
            _ => {
                eprintln!("Error: set requires FIELD VALUE FOLDER IMAGESET...");
                std::process::exit(1);
            }
        },
        "import" => Command::Import(folders()),
        "export" => Command::Export(folders()),
        "import-one" => single(Command::ImportOne),
        "export-one" => single(Command::ExportOne),
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    };

    Args {
        config_path,
        command,
    }
}

fn print_help() {
    println!(
        r#"imgcat - Catalog folders of generated imagesets

USAGE:
    imgcat [OPTIONS] <COMMAND> [FOLDER...]

COMMANDS:
    init                        Create the catalog database schema
    scan [FOLDER...]            Group loose files, remove abandoned folders, tag originals
    extract [FOLDER...]         Read source metadata from original images into records
    thumbs [FOLDER...]          Create missing thumbnails from original images
    set FIELD VALUE FOLDER IMAGESET...
                                Set status, edits, needs, good_for or posted_to
                                on several imagesets' records
    import [FOLDER...]          Copy records and file listings into the catalog
    export [FOLDER...]          Write records from the catalog
    import-one FOLDER IMAGESET  Import a single imageset
    export-one FOLDER IMAGESET  Export a single imageset

    FOLDER defaults to every entry in the [folders] table of the config.

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    IMGCAT_CONFIG       Path to config file (overrides default location)
    IMGCAT_LOG          Log level (trace, debug, info, warn, error)
"#
    );
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn resolve_folders(config: &Config, given: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    if !given.is_empty() {
        return Ok(given);
    }
    let folders = config.folder_paths();
    if folders.is_empty() {
        bail!("No folders given and none registered under [folders] in the config");
    }
    Ok(folders)
}

fn report(summary: &BatchSummary) -> bool {
    println!("{}", summary);
    summary.failed.is_empty()
}

fn main() -> Result<()> {
    let args = parse_args();
    logging::init(None)?;

    let config = load_config(args.config_path.as_ref()).context("Failed to load config")?;
    info!("imgcat {} starting", env!("CARGO_PKG_VERSION"));

    let ok = match args.command {
        Command::Init => {
            SyncEngine::new(config.clone()).initialize_schema()?;
            println!("Catalog ready at {}", config.db_path.display());
            true
        }
        Command::Scan(folders) => {
            let scanner = Scanner::new(config.catalog.clone());
            let mut clean = true;
            for folder in resolve_folders(&config, folders)? {
                let report = scanner
                    .scan(&folder)
                    .with_context(|| format!("Scan of {} failed", folder.display()))?;
                println!(
                    "{}: {} imagesets, {} files moved, {} deleted, {} originals tagged, {} flagged",
                    folder.display(),
                    report.imagesets.len(),
                    report.files_moved,
                    report.deleted.len(),
                    report.originals_tagged.len(),
                    report.flagged.len()
                );
                for name in &report.deleted {
                    println!("  deleted {}", name);
                }
                for flag in &report.flagged {
                    println!("  flagged {}", flag);
                }
                clean &= report.flagged.is_empty();
            }
            clean
        }
        Command::Extract(folders) => {
            let folders = resolve_folders(&config, folders)?;
            let reserved = config.catalog.reserved_prefix.clone();
            let extractor = MetadataExtractor::new(config);
            let mut summary = BatchSummary::default();
            for folder in folders {
                let names: Vec<String> = Listing::new(&folder, reserved.clone())
                    .dirs()
                    .map(|entry| listing::entry_name(&entry))
                    .collect();
                summary.absorb(extractor.extract_folder(&folder, &names)?);
            }
            report(&summary)
        }
        Command::Thumbs(folders) => {
            let scanner = Scanner::new(config.catalog.clone());
            let mut summary = BatchSummary::default();
            for folder in resolve_folders(&config, folders)? {
                summary.absorb(scanner.create_thumbnails(&folder)?);
            }
            report(&summary)
        }
        Command::Set {
            field,
            value,
            folder,
            imagesets,
        } => {
            let update = BatchUpdate::new(&config.catalog, &config.vocabulary, field, &value)?;
            report(&update.apply(&folder, &imagesets)?)
        }
        Command::Import(folders) => {
            let folders = resolve_folders(&config, folders)?;
            report(&SyncEngine::new(config).import_all(&folders)?)
        }
        Command::Export(folders) => {
            let folders = resolve_folders(&config, folders)?;
            report(&SyncEngine::new(config).export_all(&folders)?)
        }
        Command::ImportOne(folder, imageset) => {
            SyncEngine::new(config).import_imageset(&folder, &imageset)?;
            println!("Imported {}", imageset);
            true
        }
        Command::ExportOne(folder, imageset) => {
            let path = SyncEngine::new(config).export_imageset(&folder, &imageset)?;
            println!("Exported {} to {}", imageset, path.display());
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
