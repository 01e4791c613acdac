// ===============================
// src/recorder.rs
// ===============================
//
// JSONL message log, ringan & tahan banting:
// - Tulis setiap Event (session, inbound, outbound) ke file .jsonl (append).
// - Bufer dengan BufWriter agar hemat syscall.
// - Flush periodik tiap 1s dan/atau tiap 1000 event.
// - Otomatis membuat parent directory jika belum ada.
// - Jika tulis gagal, coba reopen file sekali lalu lanjut.
//
// ENV: set `RECORD_FILE=/path/to/messages.jsonl` agar aktif (lihat main.rs).
//
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info, warn};

use crate::builder::OutboundMessage;
use crate::domain::{InboundMessage, SessionHandle};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Connected { ts: DateTime<Utc>, session: SessionHandle },
    Disconnected { ts: DateTime<Utc>, session: SessionHandle },
    Inbound { ts: DateTime<Utc>, session: SessionHandle, msg: InboundMessage },
    Outbound { ts: DateTime<Utc>, session: SessionHandle, msg: OutboundMessage },
}

/// Non-blocking hand-off; a slow recorder never holds up dispatch.
pub fn offer(tx: Option<&mpsc::Sender<Event>>, ev: Event) {
    if let Some(tx) = tx {
        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(ev) {
            warn!("recorder queue full, event dropped");
        }
    }
}

async fn open_writer(path: &str) -> std::io::Result<BufWriter<tokio::fs::File>> {
    // Pastikan parent directory ada (kalau ada)
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    Ok(BufWriter::new(file))
}

async fn write_line(writer: &mut BufWriter<tokio::fs::File>, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}

pub async fn run(mut rx: mpsc::Receiver<Event>, path: String) {
    info!(%path, "recorder: started");
    let mut writer = match open_writer(&path).await {
        Ok(w) => w,
        Err(e) => {
            error!(?e, %path, "recorder: open failed, recording disabled");
            return;
        }
    };

    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut since_last_flush: u32 = 0;
    const FLUSH_EVERY_N_EVENTS: u32 = 1000;

    loop {
        tokio::select! {
            maybe_ev = rx.recv() => {
                let Some(ev) = maybe_ev else {
                    // Channel closed: flush dan keluar
                    let _ = writer.flush().await;
                    info!("recorder: channel closed, stopped");
                    break;
                };

                let line = match serde_json::to_string(&ev) {
                    Ok(s) => s,
                    Err(e) => {
                        error!(?e, "recorder: serialize error, skip event");
                        continue;
                    }
                };

                if let Err(e) = write_line(&mut writer, &line).await {
                    error!(?e, "recorder: write failed, attempting reopen");
                    writer = match open_writer(&path).await {
                        Ok(w) => w,
                        Err(e) => {
                            error!(?e, %path, "recorder: reopen failed, recording stopped");
                            return;
                        }
                    };
                    if let Err(e2) = write_line(&mut writer, &line).await {
                        error!(?e2, "recorder: write failed again after reopen, drop event");
                        continue;
                    }
                }

                since_last_flush += 1;
                if since_last_flush >= FLUSH_EVERY_N_EVENTS {
                    let _ = writer.flush().await;
                    since_last_flush = 0;
                }
            }

            _ = tick.tick() => {
                let _ = writer.flush().await;
                since_last_flush = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_quote_response;
    use crate::domain::{msg_type, tag, Instrument};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn writes_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/messages.jsonl");
        let path_str = path.to_string_lossy().to_string();

        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(run(rx, path_str));

        let session = SessionHandle::new("FIX.4.4", "QUOTER", "CLIENT1");
        let inbound = InboundMessage::of_type(msg_type::QUOTE_REQUEST).with_field(tag::QUOTE_REQ_ID, "QR1");
        let outbound = OutboundMessage::Quote(build_quote_response(
            "QR1", dec!(100.25), dec!(0), &Instrument::new("IBM", "US4592001014"), dec!(5000),
        ));
        tx.send(Event::Connected { ts: Utc::now(), session: session.clone() }).await.unwrap();
        tx.send(Event::Inbound { ts: Utc::now(), session: session.clone(), msg: inbound }).await.unwrap();
        tx.send(Event::Outbound { ts: Utc::now(), session, msg: outbound }).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["kind"], "connected");
        assert_eq!(lines[1]["kind"], "inbound");
        assert_eq!(lines[2]["kind"], "outbound");
        assert_eq!(lines[2]["msg"]["Quote"]["bid_px"], "100.25");
        assert_eq!(lines[2]["session"]["target_comp_id"], "CLIENT1");
    }
}
