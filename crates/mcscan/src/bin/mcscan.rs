//! Binary entrypoint: parses CLI args and hands off to `mcscan::cli::run`.

use clap::Parser;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    let cli = mcscan::cli::Cli::parse();
    let exit_code = mcscan::cli::run(cli).await;
    std::process::exit(exit_code);
}
