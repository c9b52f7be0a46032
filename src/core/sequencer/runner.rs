use crate::core::log::timestamp;
use crate::core::sequencer::builder::{
    generate, script_lines, CommandTemplate, GeneratedCommand, ScriptBuilder, COMMENT_PREFIX,
    SCRIPT_RUN,
};
use crate::core::session::SessionManager;
use crate::domain::error::{SeqComError, SeqComResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Sequencer execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// Replays script buffer lines against the session.
///
/// Runs are strictly sequential: the target device assumes one in-flight
/// command at a time, so every line is awaited (and optionally delayed)
/// before the next is issued. New run requests while one is active are
/// rejected, not queued.
pub struct Sequencer {
    builder: RwLock<ScriptBuilder>,
    generated: RwLock<Vec<GeneratedCommand>>,
    command_status: RwLock<Vec<String>>,
    generate_status: RwLock<Vec<String>>,
    run_state: RwLock<RunState>,
    delay: RwLock<Duration>,
    manager: Arc<SessionManager>,
}

impl Sequencer {
    pub fn new(manager: Arc<SessionManager>, delay_ms: u64) -> Self {
        Self {
            builder: RwLock::new(ScriptBuilder::new()),
            generated: RwLock::new(Vec::new()),
            command_status: RwLock::new(Vec::new()),
            generate_status: RwLock::new(Vec::new()),
            run_state: RwLock::new(RunState::Idle),
            delay: RwLock::new(Duration::from_millis(delay_ms)),
            manager,
        }
    }

    // Builder surface

    pub async fn add_command(&self, template: &CommandTemplate) -> String {
        self.builder.write().await.add_command(template)
    }

    pub async fn set_index(&self, value: &str) -> SeqComResult<u32> {
        self.builder.write().await.set_index(value)
    }

    pub async fn set_buffer(&self, text: &str) {
        self.builder.write().await.set_buffer(text);
    }

    pub async fn buffer(&self) -> String {
        self.builder.read().await.buffer().to_string()
    }

    pub async fn commands(&self) -> Vec<String> {
        self.builder.read().await.commands().to_vec()
    }

    pub async fn index(&self) -> u32 {
        self.builder.read().await.index()
    }

    pub async fn set_delay(&self, delay_ms: u64) {
        *self.delay.write().await = Duration::from_millis(delay_ms);
    }

    /// Full reset: buffer, command list, counter, generation result and both
    /// status logs.
    pub async fn clear(&self) {
        self.builder.write().await.clear();
        self.generated.write().await.clear();
        self.command_status.write().await.clear();
        self.generate_status.write().await.clear();
    }

    // Status surfaces

    pub async fn command_status(&self) -> Vec<String> {
        self.command_status.read().await.clone()
    }

    pub async fn generate_status(&self) -> Vec<String> {
        self.generate_status.read().await.clone()
    }

    pub async fn generated(&self) -> Vec<GeneratedCommand> {
        self.generated.read().await.clone()
    }

    pub async fn run_state(&self) -> RunState {
        *self.run_state.read().await
    }

    // Script persistence

    pub async fn save(&self, path: &Path) -> SeqComResult<()> {
        self.builder.read().await.save(path)
    }

    pub async fn load(&self, path: &Path) -> SeqComResult<()> {
        self.builder.write().await.load(path)
    }

    // Dispatch

    /// Send every non-blank, non-comment buffer line in order.
    ///
    /// Each line gets a timestamped echo in the command status log before
    /// its send; a failed send is logged there too and the run continues
    /// with the remaining lines (documented best-effort policy). The
    /// configured delay is awaited between lines.
    pub async fn run_batch(&self) -> SeqComResult<()> {
        self.ensure_connected().await?;

        let lines: Vec<String> = {
            let builder = self.builder.read().await;
            script_lines(builder.buffer())
                .filter(|line| !line.starts_with(COMMENT_PREFIX))
                .map(str::to_string)
                .collect()
        };

        self.begin_run().await?;
        debug!("batch run started: {} lines", lines.len());
        self.dispatch_all(&lines).await;
        self.finish_run().await;

        Ok(())
    }

    /// Run the pure generation pass over the current buffer.
    ///
    /// Stores the renumbered result for operator review; nothing is sent and
    /// the command list is untouched.
    pub async fn generate(&self) -> SeqComResult<Vec<GeneratedCommand>> {
        let result = {
            let builder = self.builder.read().await;
            generate(builder.buffer())
        };

        if result.is_empty() {
            return Err(SeqComError::Precondition(
                "no lines to generate from".to_string(),
            ));
        }

        {
            let mut status = self.generate_status.write().await;
            status.clear();
            status.extend(result.iter().map(|g| format!("Generated: {}", g.command)));
        }
        *self.generated.write().await = result.clone();

        Ok(result)
    }

    /// Send every entry of the stored generation result, same policy as
    /// `run_batch`. Rejected before any I/O when nothing has been generated.
    pub async fn run_generated(&self) -> SeqComResult<()> {
        self.ensure_connected().await?;

        let lines: Vec<String> = {
            let generated = self.generated.read().await;
            generated.iter().map(|g| g.command.clone()).collect()
        };
        if lines.is_empty() {
            return Err(SeqComError::Precondition(
                "nothing generated to send".to_string(),
            ));
        }

        self.begin_run().await?;
        debug!("generated run started: {} commands", lines.len());
        self.dispatch_all(&lines).await;
        self.finish_run().await;

        Ok(())
    }

    /// One-off dispatch outside a batch, with the same status echo.
    pub async fn send_direct(&self, command: &str) -> SeqComResult<()> {
        self.ensure_connected().await?;
        self.dispatch(command).await;
        Ok(())
    }

    /// Start on-device script execution.
    pub async fn start_script(&self) -> SeqComResult<()> {
        self.send_direct(&format!("{} 1", SCRIPT_RUN)).await
    }

    /// Stop on-device script execution.
    pub async fn stop_script(&self) -> SeqComResult<()> {
        self.send_direct(&format!("{} 0", SCRIPT_RUN)).await
    }

    // Private methods

    async fn ensure_connected(&self) -> SeqComResult<()> {
        if !self.manager.is_connected().await {
            return Err(SeqComError::Precondition(
                "connect before sending commands".to_string(),
            ));
        }
        Ok(())
    }

    async fn begin_run(&self) -> SeqComResult<()> {
        let mut state = self.run_state.write().await;
        if *state == RunState::Running {
            return Err(SeqComError::Precondition(
                "a run is already in progress".to_string(),
            ));
        }
        *state = RunState::Running;
        Ok(())
    }

    async fn finish_run(&self) {
        *self.run_state.write().await = RunState::Idle;
    }

    async fn dispatch_all(&self, lines: &[String]) {
        let delay = *self.delay.read().await;

        for line in lines {
            self.dispatch(line).await;
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn dispatch(&self, command: &str) {
        self.command_status
            .write()
            .await
            .push(format!("{} > {}", timestamp(), command));

        if let Err(e) = self.manager.send(command).await {
            warn!("send failed for '{}': {}", command, e);
            self.command_status
                .write()
                .await
                .push(format!("{} error: {}", timestamp(), e));
        }
    }
}
