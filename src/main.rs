// chain-verify launcher

use chain_verify::{Cli, CliHandler};
use clap::Parser;

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let handler = match CliHandler::new(&cli) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error initializing: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = handler.handle(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
