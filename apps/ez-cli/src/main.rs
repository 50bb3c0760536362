//! `ez` — standalone binary entry point.
//!
//! A thin wrapper around [`ez_cli::run_cli`]; all command logic lives in
//! the library crate so it can be tested without spawning a process.

fn main() {
    std::process::exit(ez_cli::run_cli());
}
