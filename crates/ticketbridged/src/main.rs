//! Host-bridge daemon entry point.

use std::process::ExitCode;

#[expect(
    clippy::print_stderr,
    reason = "launch errors may precede telemetry initialisation"
)]
fn main() -> ExitCode {
    match ticketbridged::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ticketbridged: {error}");
            ExitCode::FAILURE
        }
    }
}
