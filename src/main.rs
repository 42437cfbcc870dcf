// netmon - live transport network monitor
// Main CLI entry point

use clap::Parser;
use std::process;
use netmon::cli::{Cli, CliDispatcher};
use netmon::utils::error::UserError;

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = CliDispatcher::execute(cli.command).await;

    if let Err(err) = result {
        let user_error = UserError::from_netmon_error(&err);
        user_error.print();
        process::exit(user_error.exit_code);
    }
}
