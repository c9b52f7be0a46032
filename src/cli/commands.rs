use crate::cli::args::{Args, Command, LinkArgs};
use crate::cli::output::ConsoleWriter;
use crate::core::engine::Engine;
use crate::core::sequencer::generate;
use crate::domain::config::{ConnectionMode, SeqComConfig};
use crate::domain::error::SeqComResult;
use crate::infrastructure::config::ConfigManager;
use std::time::Duration;

/// Execute a parsed CLI command.
pub async fn execute_command(args: Args) -> SeqComResult<()> {
    let writer = ConsoleWriter::new(args.output);
    let config = load_config(&args)?;

    match args.command {
        Command::Ports => {
            let engine = Engine::new(&config);
            let ports = engine.session().refresh_ports().await?;
            writer.write_ports(&ports)?;
            engine.shutdown().await;
            Ok(())
        }
        Command::Send {
            command,
            link,
            wait,
        } => {
            let config = apply_link_args(config, &link);
            let engine = connect(&config, &link).await?;

            let result = engine.session().send(&command).await;
            if result.is_ok() && wait > 0 {
                tokio::time::sleep(Duration::from_secs(wait)).await;
            }

            print!("{}", engine.log().text().await);
            engine.shutdown().await;
            result
        }
        Command::Run {
            script,
            link,
            delay,
        } => {
            let config = apply_link_args(config, &link);
            let engine = connect(&config, &link).await?;
            let sequencer = engine.sequencer();

            sequencer.load(&script).await?;
            if let Some(delay_ms) = delay {
                sequencer.set_delay(delay_ms).await;
            }

            let result = sequencer.run_batch().await;
            writer.write_lines(&sequencer.command_status().await)?;
            engine.shutdown().await;
            result
        }
        Command::Generate { script } => {
            let buffer = std::fs::read_to_string(&script)?;
            let generated = generate(&buffer);
            if generated.is_empty() {
                writer.write_message("No lines to generate from");
            } else {
                writer.write_generated(&generated)?;
            }
            Ok(())
        }
    }
}

fn load_config(args: &Args) -> SeqComResult<SeqComConfig> {
    match &args.config {
        Some(path) => ConfigManager::load_from_path(path),
        None => ConfigManager::new()?.load_config(),
    }
}

/// Fold the command-line link overrides into the configuration.
fn apply_link_args(mut config: SeqComConfig, link: &LinkArgs) -> SeqComConfig {
    if let Some(mode) = link.mode {
        config.link.mode = mode.into();
    }
    if let Some(port) = &link.port {
        config.link.serial.port = port.clone();
    }
    if let Some(baud) = link.baud {
        config.link.serial.baud_rate = baud;
    }
    if let Some(host) = &link.host {
        config.link.tcp.host = host.clone();
    }
    if let Some(tcp_port) = link.tcp_port {
        config.link.tcp.port = tcp_port;
    }
    config
}

/// Bring an engine up and connect it, auto-selecting a serial port when
/// none was given.
async fn connect(config: &SeqComConfig, link: &LinkArgs) -> SeqComResult<Engine> {
    let engine = Engine::new(config);

    if config.link.mode == ConnectionMode::Serial && link.port.is_none() {
        engine.session().refresh_ports().await?;
    }

    match engine.session().connect().await {
        Ok(()) => Ok(engine),
        Err(e) => {
            engine.shutdown().await;
            Err(e)
        }
    }
}
