//! Dumps one slotted page from a raw page file.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use slotpage::{Lexicographic, Page, PageDump, PageOptions, DEFAULT_PAGE_SIZE};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "page-inspect",
    version,
    about = "Print and validate a slotted B+Tree page"
)]
struct Cli {
    #[arg(value_name = "FILE", help = "File holding one or more raw pages")]
    path: PathBuf,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, help = "Page size in bytes")]
    page_size: usize,

    #[arg(long, default_value_t = 0, help = "Zero-based page index within the file")]
    index: u64,

    #[arg(
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format"
    )]
    format: OutputFormat,

    #[arg(long, help = "Include hex-encoded keys in text output")]
    hex: bool,

    #[arg(long, help = "Skip the key order and child reference checks")]
    no_validate: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the page was printed but failed validation.
fn run() -> Result<bool, Box<dyn Error>> {
    let cli = Cli::parse();
    let options = PageOptions::new().page_size(cli.page_size);
    options.verify()?;

    let buf = read_page(&cli.path, cli.page_size, cli.index)?;
    let page = Page::open_with(&buf[..], &options)?;
    let dump = page.dump()?;
    emit(cli.format, &dump, cli.hex)?;

    if cli.no_validate || page.is_overflow() {
        return Ok(true);
    }
    match page.validate(&Lexicographic) {
        Ok(()) => Ok(true),
        Err(err) => {
            eprintln!("invalid page: {err}");
            Ok(false)
        }
    }
}

fn read_page(path: &PathBuf, page_size: usize, index: u64) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(index * page_size as u64))?;
    let mut buf = vec![0u8; page_size];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

fn emit(format: OutputFormat, dump: &PageDump, hex: bool) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(dump)?;
            println!("{json}");
        }
        OutputFormat::Text => print!("{}", dump.render(hex)),
    }
    Ok(())
}
