//! Tracing setup, plus a small in-memory tail of recent log lines that the
//! HTTP server exposes at `/logs`.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Most recent formatted log lines, oldest first
pub struct LogTail {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// The last `count` lines
    pub fn recent(&self, count: usize) -> Vec<String> {
        let lines = self.lines.lock();
        let start = lines.len().saturating_sub(count);
        lines.iter().skip(start).cloned().collect()
    }
}

pub type SharedLogTail = Arc<LogTail>;

pub fn create_log_tail(capacity: usize) -> SharedLogTail {
    Arc::new(LogTail::new(capacity.max(1)))
}

/// Layer that copies every event into a [`LogTail`]
pub(crate) struct TailLayer {
    tail: SharedLogTail,
}

impl TailLayer {
    pub(crate) fn new(tail: SharedLogTail) -> Self {
        Self { tail }
    }
}

impl<S: Subscriber> Layer<S> for TailLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        self.tail.push(format!(
            "{} {} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            meta.level(),
            meta.target(),
            visitor.message
        ));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else if self.message.is_empty() {
            self.message = format!("{}={}", field.name(), value);
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
pub fn init(level: &str, tail: SharedLogTail) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(TailLayer::new(tail));

    if registry.try_init().is_err() {
        eprintln!("tracing subscriber already installed");
    }
}
