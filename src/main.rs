// SeqCom - Scripted command sequencer for serial and TCP device links
use anyhow::Context;
use clap::Parser;
use seqcom::cli::args::Args;
use seqcom::cli::commands::execute_command;
use seqcom::infrastructure::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "seqcom=debug,info"
    } else {
        "seqcom=info,warn,error"
    };
    logging::init_logging_with(filter)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("failed to initialize logging")?;

    if let Err(e) = execute_command(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
