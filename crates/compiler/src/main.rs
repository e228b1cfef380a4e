//! BFM compiler CLI
//!
//! `bfm <INPUT> -o <OUTPUT> [-v]`

use clap::Parser;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "bfm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "BFM compiler - compile BFM programs to Brainfuck", long_about = None)]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Where to write the generated Brainfuck
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Print every diagnostic instead of folding one report per line
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = bfm::compile_file(&cli.input, &cli.output, cli.verbose) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
