// ===============================
// src/counterparty.rs
// ===============================
//
// Mock counterparty session, berdiri di posisi session engine:
// - logon, lalu kirim QuoteRequest berkala (size acak 100..=10_000)
// - sesekali NewOrderSingle (tipe yang belum didukung)
// - sesekali QuoteRequest tanpa SecurityID (field hilang)
// - log setiap Quote yang diterima
// - logout saat shutdown
//
use rand::Rng;
use rust_decimal::Decimal;
use tokio::{
    sync::{mpsc, watch},
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{info, warn};

use crate::builder::OutboundMessage;
use crate::domain::{msg_type, tag, InboundMessage, SessionHandle};
use crate::session::SessionEvent;

const INSTRUMENTS: [(&str, &str); 4] = [
    ("IBM", "US4592001014"),
    ("AAPL", "US0378331005"),
    ("MSFT", "US5949181045"),
    ("NVDA", "US67066G1040"),
];

/// One request from the counterparty; `seq` makes the ids unique per session.
pub fn next_message(seq: u64, target: &str, rng: &mut impl Rng) -> InboundMessage {
    let (symbol, security_id) = INSTRUMENTS[rng.gen_range(0..INSTRUMENTS.len())];
    let size = Decimal::from(rng.gen_range(100..=10_000u32));

    match rng.gen_range(0..20) {
        0 | 1 => InboundMessage::of_type(msg_type::NEW_ORDER_SINGLE)
            .with_field(tag::CL_ORD_ID, format!("{target}-CL{seq}"))
            .with_field(tag::SYMBOL, symbol)
            .with_field(tag::ORDER_QTY, size),
        2 => InboundMessage::of_type(msg_type::QUOTE_REQUEST)
            .with_field(tag::QUOTE_REQ_ID, format!("{target}-QR{seq}"))
            .with_field(tag::SYMBOL, symbol)
            .with_field(tag::ORDER_QTY, size),
        _ => InboundMessage::of_type(msg_type::QUOTE_REQUEST)
            .with_field(tag::QUOTE_REQ_ID, format!("{target}-QR{seq}"))
            .with_field(tag::SYMBOL, symbol)
            .with_field(tag::SECURITY_ID, security_id)
            .with_field(tag::ORDER_QTY, size),
    }
}

pub async fn run_mock(
    session: SessionHandle,
    events: mpsc::Sender<SessionEvent>,
    every_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundMessage>(1024);
    if events
        .send(SessionEvent::Connected { session: session.clone(), outbound: out_tx })
        .await
        .is_err()
    {
        warn!(%session, "mock: engine gone before logon");
        return;
    }

    let mut tick = interval(Duration::from_millis(every_ms.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                seq += 1;
                // jangan simpan ThreadRng melewati .await
                let msg = next_message(seq, &session.target_comp_id, &mut rand::thread_rng());
                if events.send(SessionEvent::Inbound(msg, session.clone())).await.is_err() {
                    return;
                }
            }
            Some(out) = out_rx.recv() => match &out {
                OutboundMessage::Quote(q) => info!(
                    %session,
                    quote_id = %q.quote_id,
                    bid_px = %q.bid_px,
                    qty = %q.quantity,
                    "mock: quote received"
                ),
                other => info!(%session, msg_type = other.msg_type(), "mock: message received"),
            },
        }
    }

    let _ = events.send(SessionEvent::Disconnected(session)).await;
}
