//! Extract a visa application directory to JSON.
//!
//! Usage:
//!   cargo run --release --bin extract_forms -- upload/
//!   cargo run --release --bin extract_forms -- upload/ --output forms.json --merged
//!   cargo run --release --bin extract_forms -- upload/ --csv-dir out/ --with-label -v

use canada_xfa::{process, write_record_csv, ExtractionConfig};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "extract_forms")]
#[command(about = "Extract IMM 5257E / IMM 5645E XFA forms into flat records", version)]
struct Cli {
    /// Directory holding the 5257 and 5645 PDFs
    src_dir: PathBuf,

    /// Root of the per-request working directories
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Country code CSV (code,name) replacing the bundled table
    #[arg(long)]
    country_codes: Option<PathBuf>,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write one CSV per form into this directory
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Emit a single record with the keys of every form
    #[arg(long)]
    merged: bool,

    /// Keep the decrypted copies
    #[arg(long)]
    keep_intermediate: bool,

    /// Read the visa decision label file too
    #[arg(long)]
    with_label: bool,

    /// Only process files matching this glob
    #[arg(long, default_value = "*")]
    pattern: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = ExtractionConfig::new()
        .with_keep_intermediate(cli.keep_intermediate)
        .with_label(cli.with_label)
        .with_file_pattern(cli.pattern);
    if let Some(dir) = cli.work_dir {
        config = config.with_work_root(dir);
    }
    if let Some(path) = cli.country_codes {
        config = config.with_country_codes(path);
    }

    let bundle = process(&cli.src_dir, &config)?;

    if let Some(dir) = &cli.csv_dir {
        fs::create_dir_all(dir)?;
        write_record_csv(&bundle.applicant, dir.join("CANADA_5257E.csv"))?;
        write_record_csv(&bundle.family, dir.join("CANADA_5645E.csv"))?;
        if let Some(label) = &bundle.label {
            write_record_csv(label, dir.join("CANADA_LABEL.csv"))?;
        }
        log::info!("CSV files written to {}", dir.display());
    }

    let json = if cli.merged {
        serde_json::to_string_pretty(&bundle.merged())?
    } else {
        bundle.to_json_pretty()?
    };

    match cli.output {
        Some(path) => {
            fs::write(&path, json)?;
            log::info!("Wrote {}", path.display());
        },
        None => println!("{}", json),
    }
    Ok(())
}
