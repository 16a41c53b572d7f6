//! Binary entrypoint that starts the webhook receiver.

use std::process::ExitCode;

use voice_webhook::start_webhook;

fn main() -> ExitCode {
    start_webhook::run()
}
