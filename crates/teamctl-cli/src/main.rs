//! Binary entrypoint for `teamctl`.

use std::process;

#[tokio::main]
async fn main() {
    let code = teamctl_cli::run().await;
    process::exit(code);
}
