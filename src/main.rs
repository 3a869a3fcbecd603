use clap::Parser;

use classpoll::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    if let Err(e) = cli::run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
