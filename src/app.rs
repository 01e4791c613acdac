// ===============================
// src/app.rs (serve loop)
// ===============================
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::handler::MessageDispatcher;
use crate::recorder::{self, Event};
use crate::session::{SessionEvent, SessionObserver, SessionRegistry};

pub struct Application {
    dispatcher: MessageDispatcher,
    observer: SessionObserver,
    registry: SessionRegistry,
    rec_tx: Option<mpsc::Sender<Event>>,
}

impl Application {
    pub fn new(
        dispatcher: MessageDispatcher,
        observer: SessionObserver,
        rec_tx: Option<mpsc::Sender<Event>>,
    ) -> Self {
        let registry = SessionRegistry::new(observer.clone(), rec_tx.clone());
        Self { dispatcher, observer, registry, rec_tx }
    }

    fn record(&self, ev: Event) { recorder::offer(self.rec_tx.as_ref(), ev); }

    /// Handle one engine event to completion.
    pub fn on_event(&mut self, ev: SessionEvent) {
        match ev {
            SessionEvent::Connected { session, outbound } => {
                self.record(Event::Connected { ts: Utc::now(), session: session.clone() });
                self.registry.register(session, outbound);
            }
            SessionEvent::Disconnected(session) => {
                self.record(Event::Disconnected { ts: Utc::now(), session: session.clone() });
                self.registry.unregister(&session);
            }
            SessionEvent::Inbound(msg, session) => {
                self.observer.on_inbound(&msg, &session);
                if self.rec_tx.is_some() {
                    self.record(Event::Inbound { ts: Utc::now(), session: session.clone(), msg: msg.clone() });
                }
                self.dispatcher.dispatch(&msg, &session, &self.registry);
            }
        }
    }

    /// Serve until shutdown is signalled or every session engine handle is gone.
    /// A message already taken off the queue is always finished first.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("shutdown requested, leaving serve loop");
                    break;
                }
                maybe_ev = events.recv() => match maybe_ev {
                    Some(ev) => self.on_event(ev),
                    None => {
                        info!("session engine closed, leaving serve loop");
                        break;
                    }
                },
            }
        }
    }
}
