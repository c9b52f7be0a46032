use chrono::{DateTime, Local};
use tokio::sync::RwLock;

/// Direction of a logged line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// One line of device traffic
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub direction: Direction,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

/// Current wall-clock timestamp in the `[HH:MM:SS.mmm]` status format.
pub(crate) fn timestamp() -> String {
    Local::now().format("[%H:%M:%S%.3f]").to_string()
}

/// Append-only log of inbound data and sent-command echoes.
///
/// Order is strictly arrival order. Unbounded: the operator clears it
/// explicitly between runs.
pub struct MessageLog {
    entries: RwLock<Vec<LogEntry>>,
    echo_timestamps: bool,
}

impl MessageLog {
    pub fn new(echo_timestamps: bool) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            echo_timestamps,
        }
    }

    /// Append an inbound line. Callers normalize the trailing newline.
    pub async fn append(&self, text: &str) {
        let mut entries = self.entries.write().await;
        entries.push(LogEntry {
            direction: Direction::In,
            text: text.to_string(),
            timestamp: Local::now(),
        });
    }

    /// Append a sent-command echo with the `> ` marker.
    pub async fn append_echo(&self, command: &str) {
        let text = if self.echo_timestamps {
            format!("{} > {}\n", timestamp(), command)
        } else {
            format!("> {}\n", command)
        };

        let mut entries = self.entries.write().await;
        entries.push(LogEntry {
            direction: Direction::Out,
            text,
            timestamp: Local::now(),
        });
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Full concatenated text, for display and for the save path.
    pub async fn text(&self) -> String {
        let entries = self.entries.read().await;
        entries.iter().map(|e| e.text.as_str()).collect()
    }

    pub async fn entries(&self) -> Vec<LogEntry> {
        let entries = self.entries.read().await;
        entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
