use clap::Parser;
use msa_app::{init_tracing, run, Cli};

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(&cli) {
        tracing::error!(code = %e.code, "command failed");
        eprintln!("{e}");
        std::process::exit(1);
    }
}
