// ===============================
// src/session.rs
// ===============================
//
// Boundary with the session engine:
// - SessionEvent      : what the engine delivers (connect / disconnect / app message)
// - SessionSender     : the one outbound operation the core needs
// - SessionRegistry   : routes outbound messages to each session's send queue
// - SessionObserver   : lifecycle logging (no decisions)
//
use ahash::AHashMap as HashMap;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, Span};

use crate::builder::OutboundMessage;
use crate::domain::{InboundMessage, SessionHandle};
use crate::metrics::{OUTBOUND, SESSIONS_CONNECTED};
use crate::recorder::{self, Event};

#[derive(Debug)]
pub enum SessionEvent {
    Connected { session: SessionHandle, outbound: mpsc::Sender<OutboundMessage> },
    Disconnected(SessionHandle),
    Inbound(InboundMessage, SessionHandle),
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("session {0} is not connected")]
    NotConnected(SessionHandle),
    #[error("session {0} send buffer full")]
    BufferFull(SessionHandle),
    #[error("session {0} closed")]
    Closed(SessionHandle),
}

pub trait SessionSender {
    fn send(&self, msg: OutboundMessage, session: &SessionHandle) -> Result<(), SendError>;
}

#[derive(Debug, Clone)]
pub struct SessionObserver {
    span: Span,
}

impl SessionObserver {
    pub fn new(span: Span) -> Self { Self { span } }

    pub fn on_connect(&self, session: &SessionHandle) {
        self.span.in_scope(|| info!(%session, "logon - session connected"));
    }

    pub fn on_disconnect(&self, session: &SessionHandle) {
        self.span.in_scope(|| info!(%session, "logout - session disconnected"));
    }

    pub fn on_inbound(&self, msg: &InboundMessage, session: &SessionHandle) {
        self.span.in_scope(|| debug!(%session, %msg, "from app"));
    }

    /// Only for messages the session queue accepted.
    pub fn on_outbound(&self, msg: &OutboundMessage, session: &SessionHandle) {
        self.span.in_scope(|| debug!(%session, %msg, "to app"));
    }
}

/// Send queues per connected session. Owned by the dispatch loop; connect and
/// disconnect events mutate it between messages, never during handling.
pub struct SessionRegistry {
    routes: HashMap<SessionHandle, mpsc::Sender<OutboundMessage>>,
    observer: SessionObserver,
    rec_tx: Option<mpsc::Sender<Event>>,
}

impl SessionRegistry {
    pub fn new(observer: SessionObserver, rec_tx: Option<mpsc::Sender<Event>>) -> Self {
        Self { routes: HashMap::new(), observer, rec_tx }
    }

    pub fn register(&mut self, session: SessionHandle, outbound: mpsc::Sender<OutboundMessage>) {
        self.observer.on_connect(&session);
        self.routes.insert(session, outbound);
        SESSIONS_CONNECTED.set(self.routes.len() as i64);
    }

    pub fn unregister(&mut self, session: &SessionHandle) {
        self.observer.on_disconnect(session);
        self.routes.remove(session);
        SESSIONS_CONNECTED.set(self.routes.len() as i64);
    }

    pub fn is_connected(&self, session: &SessionHandle) -> bool { self.routes.contains_key(session) }
}

impl SessionSender for SessionRegistry {
    fn send(&self, msg: OutboundMessage, session: &SessionHandle) -> Result<(), SendError> {
        let tx = self
            .routes
            .get(session)
            .ok_or_else(|| SendError::NotConnected(session.clone()))?;

        let label = msg.msg_type();
        let sent = msg.clone();
        tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::BufferFull(session.clone()),
            TrySendError::Closed(_) => SendError::Closed(session.clone()),
        })?;
        self.observer.on_outbound(&sent, session);
        OUTBOUND.with_label_values(&[label]).inc();
        if self.rec_tx.is_some() {
            recorder::offer(
                self.rec_tx.as_ref(),
                Event::Outbound { ts: Utc::now(), session: session.clone(), msg: sent },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_quote_response;
    use crate::domain::{msg_type, tag, Instrument};
    use crate::testing::capture_logs;
    use rust_decimal_macros::dec;
    use tracing::Level;

    fn quote() -> OutboundMessage {
        OutboundMessage::Quote(build_quote_response(
            "QR1", dec!(100.25), dec!(0), &Instrument::new("IBM", "US4592001014"), dec!(5000),
        ))
    }

    fn registry() -> SessionRegistry { SessionRegistry::new(SessionObserver::new(Span::none()), None) }

    #[test]
    fn routes_to_registered_session() {
        let mut reg = registry();
        let a = SessionHandle::new("FIX.4.4", "QUOTER", "A");
        let b = SessionHandle::new("FIX.4.4", "QUOTER", "B");
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        reg.register(a.clone(), tx_a);
        reg.register(b, tx_b);

        reg.send(quote(), &a).unwrap();
        assert_eq!(rx_a.try_recv().unwrap(), quote());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn unknown_or_disconnected_session_is_rejected() {
        let mut reg = registry();
        let a = SessionHandle::new("FIX.4.4", "QUOTER", "A");
        assert!(matches!(reg.send(quote(), &a), Err(SendError::NotConnected(_))));

        let (tx, _rx) = mpsc::channel(4);
        reg.register(a.clone(), tx);
        assert!(reg.is_connected(&a));
        reg.unregister(&a);
        assert!(!reg.is_connected(&a));
        assert!(matches!(reg.send(quote(), &a), Err(SendError::NotConnected(_))));
    }

    #[test]
    fn full_and_closed_queues_surface_as_errors() {
        let mut reg = registry();
        let a = SessionHandle::new("FIX.4.4", "QUOTER", "A");
        let (tx, rx) = mpsc::channel(1);
        reg.register(a.clone(), tx);

        reg.send(quote(), &a).unwrap();
        assert!(matches!(reg.send(quote(), &a), Err(SendError::BufferFull(_))));

        drop(rx);
        assert!(matches!(reg.send(quote(), &a), Err(SendError::Closed(_))));
    }

    #[test]
    fn observer_logs_lifecycle_at_info_and_traffic_at_debug() {
        let observer = SessionObserver::new(Span::none());
        let a = SessionHandle::new("FIX.4.4", "QUOTER", "A");
        let inbound = InboundMessage::of_type(msg_type::QUOTE_REQUEST).with_field(tag::SYMBOL, "IBM");

        let ((), logs) = capture_logs(|| {
            observer.on_connect(&a);
            observer.on_inbound(&inbound, &a);
            observer.on_outbound(&quote(), &a);
            observer.on_disconnect(&a);
        });

        assert_eq!(logs.total(), 4);
        assert_eq!(logs.count(Level::INFO), 2);
        assert_eq!(logs.count(Level::DEBUG), 2);
        assert!(logs.contains(Level::INFO, "logon"));
        assert!(logs.contains(Level::INFO, "logout"));
        assert!(logs.contains(Level::DEBUG, "35=R|55=IBM"));
        assert!(logs.contains(Level::DEBUG, "35=S|117=QR1"));
        for level in [Level::INFO, Level::DEBUG] {
            assert!(logs.contains(level, "FIX.4.4:QUOTER->A"));
        }
    }

    #[test]
    fn failed_send_is_not_logged_as_outbound() {
        let mut reg = registry();
        let a = SessionHandle::new("FIX.4.4", "QUOTER", "A");
        let (tx, rx) = mpsc::channel(1);
        reg.register(a.clone(), tx);

        let (res, logs) = capture_logs(|| reg.send(quote(), &a));
        assert!(res.is_ok());
        assert_eq!(logs.count(Level::DEBUG), 1);

        let (res, logs) = capture_logs(|| reg.send(quote(), &a));
        assert!(matches!(res, Err(SendError::BufferFull(_))));
        assert_eq!(logs.count(Level::DEBUG), 0);

        drop(rx);
        let (res, logs) = capture_logs(|| reg.send(quote(), &a));
        assert!(matches!(res, Err(SendError::Closed(_))));
        assert_eq!(logs.total(), 0);
    }
}
