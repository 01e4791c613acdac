// ===============================
// src/classifier.rs
// ===============================
use thiserror::Error;

use crate::domain::{msg_type, tag, FieldValue, InboundMessage};

/// Handler yang dipilih untuk sebuah pesan masuk.
/// Tambah varian baru di sini saat mendukung tipe pesan lain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerAction {
    QuoteRequest,
    Unhandled(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("MsgType(35) missing from header")]
    MissingMsgType,
    #[error("MsgType(35) is untyped ({0} value)")]
    UntypedMsgType(&'static str),
}

/// Read MsgType(35) from the header and pick a handler.
pub fn classify(msg: &InboundMessage) -> Result<HandlerAction, ClassifyError> {
    let raw = match msg.header(tag::MSG_TYPE) {
        Some(FieldValue::Str(s)) if !s.is_empty() => s.clone(),
        Some(FieldValue::Code(c)) => c.to_string(),
        // numeric, or an empty string
        Some(other) => return Err(ClassifyError::UntypedMsgType(other.kind())),
        None => return Err(ClassifyError::MissingMsgType),
    };

    Ok(match raw.as_str() {
        msg_type::QUOTE_REQUEST => HandlerAction::QuoteRequest,
        _ => HandlerAction::Unhandled(raw),
    })
}
