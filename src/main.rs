use clap::Parser;
use quantscreen::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
