use crate::cli::args::OutputFormat;
use crate::core::sequencer::GeneratedCommand;
use crate::core::transport::PortDescriptor;
use tabled::{Table, Tabled};

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<OutputError> for crate::domain::error::SeqComError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Port")]
    port_name: String,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn write_ports(&self, ports: &[PortDescriptor]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    println!("No serial ports found");
                } else {
                    let rows: Vec<PortRow> = ports
                        .iter()
                        .map(|p| PortRow {
                            port_name: p.port_name.clone(),
                        })
                        .collect();
                    println!("{}", Table::new(rows));
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(ports)?);
            }
        }
        Ok(())
    }

    pub fn write_generated(&self, generated: &[GeneratedCommand]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for entry in generated {
                    println!("Generated: {}", entry.command);
                }
            }
            OutputFormat::Json => {
                let commands: Vec<&str> =
                    generated.iter().map(|g| g.command.as_str()).collect();
                println!("{}", serde_json::to_string_pretty(&commands)?);
            }
        }
        Ok(())
    }

    pub fn write_lines(&self, lines: &[String]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for line in lines {
                    println!("{}", line);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(lines)?);
            }
        }
        Ok(())
    }

    pub fn write_message(&self, message: &str) {
        if self.format == OutputFormat::Text {
            println!("{}", message);
        }
    }
}
