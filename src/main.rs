// ===============================
// src/main.rs
// ===============================
/*
 # jalankan dengan 2 mock counterparty, quote jika size > 1000
 TARGET_COMP_IDS=CLIENT1,CLIENT2 RECORD_FILE=logs/messages.jsonl cargo run -- --log-filter info

 # hasil keputusan per outcome
 curl -s localhost:9898/metrics | grep '^quote_outcomes_total'
*/
/*
=============================================================================
Project : fix_quote_bot — FIX quote-request responder in Rust
Module  : main.rs
Version : 0.1.0
Author  : fix_quote_bot contributors
License : MIT

Summary : Receives application messages from FIX sessions, classifies them,
          prices QuoteRequests through a pluggable policy, answers with
          Quote messages, exposes Prometheus metrics, and records JSONL
          message logs.

=============================================================================
*/
use std::sync::Arc;

use clap::Parser;
use rust_decimal::prelude::ToPrimitive;
use tokio::{
    sync::{mpsc, watch},
    time::{timeout, Duration},
};
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use fix_quote_bot::{
    app::Application,
    config,
    counterparty,
    domain::SessionHandle,
    handler::{MessageDispatcher, QuoteRequestHandler},
    metrics,
    policy::SizeThresholdPolicy,
    recorder::{self, Event},
    session::{SessionEvent, SessionObserver},
};

#[tokio::main]
async fn main() {
    let cli = config::Cli::parse();

    // ---- Logging ----
    let filter = match &cli.log_filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ---- Load config & pricing ----
    let (args, pricing) = match config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "configuration error");
            std::process::exit(2);
        }
    };

    info!(
        begin_string = %args.begin_string,
        sender = %args.sender_comp_id,
        targets = ?args.target_comp_ids,
        min_size = %pricing.min_size,
        bid_px = %pricing.bid_px,
        offer_px = %pricing.offer_px,
        record_file = ?args.record_file,
        "startup config"
    );

    // ---- Metrics ----
    let (stop_tx, stop_rx) = watch::channel(false);
    metrics::init();
    let metrics_task = match std::net::TcpListener::bind(("0.0.0.0", args.metrics_port)) {
        Ok(listener) => Some(tokio::spawn(metrics::serve_metrics(listener, stop_rx.clone()))),
        Err(e) => {
            error!(?e, port = args.metrics_port, "metrics bind failed, metrics disabled");
            None
        }
    };
    metrics::CONFIG_QUOTE_MIN_SIZE.set(pricing.min_size.to_f64().unwrap_or(0.0));
    metrics::CONFIG_QUOTE_BID_PX.set(pricing.bid_px.to_f64().unwrap_or(0.0));

    // ---- Recorder (optional) ----
    let mut recorder_task = None;
    let rec_tx = args.record_file.clone().map(|path| {
        let (tx, rx) = mpsc::channel::<Event>(8192);
        recorder_task = Some(tokio::spawn(recorder::run(rx, path)));
        tx
    });

    // ---- Core: policy -> handler -> dispatcher ----
    let policy = Arc::new(SizeThresholdPolicy::new(pricing.min_size, pricing.bid_px));
    let quotes = QuoteRequestHandler::new(policy, pricing.offer_px, info_span!("quote_request"));
    let dispatcher = MessageDispatcher::new(quotes, info_span!("dispatch"));
    let app = Application::new(dispatcher, SessionObserver::new(info_span!("session")), rec_tx);

    // ---- Session engine stand-in: one mock counterparty per target ----
    let (ev_tx, ev_rx) = mpsc::channel::<SessionEvent>(4096);
    let mut sessions = Vec::new();
    for target in &args.target_comp_ids {
        let handle = SessionHandle::new(&args.begin_string, &args.sender_comp_id, target);
        sessions.push(tokio::spawn(counterparty::run_mock(
            handle,
            ev_tx.clone(),
            args.mock_interval_ms,
            stop_rx.clone(),
        )));
    }
    drop(ev_tx);

    // ---- Serve until Ctrl-C ----
    // serve loop selesai sendiri setelah semua session logout (channel tertutup);
    // hard_stop hanya dipakai kalau logout macet
    let (hard_stop_tx, hard_stop_rx) = watch::channel(false);
    let serve = tokio::spawn(app.run(ev_rx, hard_stop_rx));
    info!("quote service started, Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(?e, "ctrl_c listener failed, shutting down");
    }

    let _ = stop_tx.send(true);
    let logout = async {
        for s in sessions {
            let _ = s.await;
        }
    };
    if timeout(Duration::from_secs(5), logout).await.is_err() {
        warn!("sessions did not log out in time, forcing serve loop down");
        let _ = hard_stop_tx.send(true);
    }
    if let Err(e) = serve.await {
        error!(?e, "serve loop panicked");
    }
    // serve loop sudah drop rec_tx -> recorder flush lalu berhenti
    if let Some(task) = recorder_task {
        let _ = task.await;
    }
    if let Some(task) = metrics_task {
        match task.await {
            Ok(Err(e)) => error!(?e, "metrics server error"),
            Err(e) => error!(?e, "metrics server panicked"),
            Ok(Ok(())) => {}
        }
    }
    info!("quote service stopped");
}
