use clap::Parser;
use asap_notes::{run_until_complete, serve, Args, BLOCKING_SHUTDOWN_TIMEOUT};

fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    run_until_complete(serve(args), BLOCKING_SHUTDOWN_TIMEOUT)??;

    Ok(())
}
