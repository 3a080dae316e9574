use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use psz::NarcOptions;
use psz_unpacker::assets;
use simple_logger::SimpleLogger;


#[derive(Debug, Parser)]
#[command(name = "psz-unpacker", version, about = "Unpacks Phantasy Star Zero ZPR/NARC/ZARC archives")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Bytes to search past the NARC name table for the data section.
    #[arg(long, global = true, default_value_t = psz::DEFAULT_SCAN_WINDOW)]
    scan_window: usize,

    /// Log every file and header field.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}


#[derive(Debug, Subcommand)]
enum Command {
    /// Extract every file in an archive to `<output>/<archive name>/`.
    Extract { input: PathBuf, output: PathBuf },

    /// Count the files in an archive by type.
    Analyze { input: PathBuf },
}


fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Trace } else { LevelFilter::Info };
    SimpleLogger::new().with_level(level).env().init()?;

    let options = NarcOptions { scan_window: cli.scan_window };

    match cli.cmd {
        Command::Extract { input, output } => {
            assets::extract_to_dir(&input, &output, &options)?;
        },
        Command::Analyze { input } => {
            let files = assets::unpack_file(&input, &options)?;
            println!("Analysis of {}:", input.display());
            println!("Total files: {}", files.len());
            println!("File types:");
            for (ext, count) in assets::analyze(&files) {
                println!("  {ext}: {count} file(s)");
            }
        },
    }

    Ok(())
}
