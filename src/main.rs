//! sphm - Command-line tool for projecting panoramas onto spherical LED layouts

use std::process::ExitCode;

use spheremap::cli;

fn main() -> ExitCode {
    cli::run()
}
