// ===============================
// src/testing.rs (test doubles, cfg(test) only)
// ===============================
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::builder::OutboundMessage;
use crate::domain::{Instrument, SessionHandle};
use crate::policy::{QuoteDecision, QuotePolicy, SizeThresholdPolicy};
use crate::session::{SendError, SessionSender};

/// Events captured while a closure ran: level plus "message k=v ..." text.
#[derive(Debug, Default, Clone)]
pub struct CapturedLogs(Arc<Mutex<Vec<(Level, String)>>>);

impl CapturedLogs {
    pub fn count(&self, level: Level) -> usize {
        self.0.lock().unwrap().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn total(&self) -> usize { self.0.lock().unwrap().len() }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.0.lock().unwrap().iter().any(|(l, line)| *l == level && line.contains(needle))
    }
}

struct LineVisitor(String);

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{value:?} ");
        } else {
            let _ = write!(self.0, "{}={:?} ", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let _ = write!(self.0, "{}={} ", field.name(), value);
    }
}

struct CaptureLayer(CapturedLogs);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut v = LineVisitor(String::new());
        event.record(&mut v);
        (self.0).0.lock().unwrap().push((*event.metadata().level(), v.0));
    }
}

/// Run `f` with a scoped subscriber that records every event.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(logs.clone()));
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, logs)
}

/// Accepts everything and keeps it for inspection.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(OutboundMessage, SessionHandle)>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<(OutboundMessage, SessionHandle)> { self.sent.lock().unwrap().clone() }
}

impl SessionSender for RecordingSender {
    fn send(&self, msg: OutboundMessage, session: &SessionHandle) -> Result<(), SendError> {
        self.sent.lock().unwrap().push((msg, session.clone()));
        Ok(())
    }
}

/// Every send fails as if the session had gone away.
pub struct FailingSender;

impl SessionSender for FailingSender {
    fn send(&self, _msg: OutboundMessage, session: &SessionHandle) -> Result<(), SendError> {
        Err(SendError::Closed(session.clone()))
    }
}

/// Default threshold policy that counts how often it was asked.
#[derive(Default)]
pub struct CountingPolicy {
    inner: SizeThresholdPolicy,
    calls: AtomicUsize,
}

impl CountingPolicy {
    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl QuotePolicy for CountingPolicy {
    fn evaluate(&self, instrument: &Instrument, requested_size: Decimal) -> QuoteDecision {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate(instrument, requested_size)
    }
}
