// ===============================
// src/domain.rs
// ===============================
use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// FIX tag numbers used by the quote desk.
pub mod tag {
    pub const CL_ORD_ID: u32 = 11;
    pub const CUM_QTY: u32 = 14;
    pub const EXEC_ID: u32 = 17;
    pub const HANDL_INST: u32 = 21;
    pub const LAST_PX: u32 = 31;
    pub const LAST_QTY: u32 = 32;
    pub const MSG_TYPE: u32 = 35;
    pub const ORDER_QTY: u32 = 38;
    pub const ORD_STATUS: u32 = 39;
    pub const ORD_TYPE: u32 = 40;
    pub const PRICE: u32 = 44;
    pub const SECURITY_ID: u32 = 48;
    pub const SIDE: u32 = 54;
    pub const SYMBOL: u32 = 55;
    pub const TRANSACT_TIME: u32 = 60;
    pub const QUOTE_ID: u32 = 117;
    pub const QUOTE_REQ_ID: u32 = 131;
    pub const BID_PX: u32 = 132;
    pub const OFFER_PX: u32 = 133;
    pub const EXEC_TYPE: u32 = 150;
    pub const LEAVES_QTY: u32 = 151;
}

/// MsgType(35) values.
pub mod msg_type {
    pub const EXECUTION_REPORT: &str = "8";
    pub const NEW_ORDER_SINGLE: &str = "D";
    pub const QUOTE_REQUEST: &str = "R";
    pub const QUOTE: &str = "S";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Str(String),
    Num(Decimal),
    Code(char),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Str(_) => "string",
            FieldValue::Num(_) => "numeric",
            FieldValue::Code(_) => "code",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Num(n) => write!(f, "{n}"),
            FieldValue::Code(c) => write!(f, "{c}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self { FieldValue::Str(s.to_string()) }
}
impl From<String> for FieldValue {
    fn from(s: String) -> Self { FieldValue::Str(s) }
}
impl From<Decimal> for FieldValue {
    fn from(n: Decimal) -> Self { FieldValue::Num(n) }
}
impl From<char> for FieldValue {
    fn from(c: char) -> Self { FieldValue::Code(c) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("required tag {tag} not found")]
    NotFound { tag: u32 },
    #[error("tag {tag} has {found} value, expected {expected}")]
    IncorrectDataFormat { tag: u32, expected: &'static str, found: &'static str },
    #[error("tag {tag} has invalid value: {reason}")]
    InvalidValue { tag: u32, reason: &'static str },
}

/// Application message as delivered by the session engine.
///
/// Header and body are fixed at construction; handlers only read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    header: BTreeMap<u32, FieldValue>,
    body: BTreeMap<u32, FieldValue>,
}

impl InboundMessage {
    /// Message with MsgType(35) already stamped in the header.
    pub fn of_type(msg_type: &str) -> Self {
        Self::default().with_header(tag::MSG_TYPE, msg_type)
    }

    pub fn with_header(mut self, tag: u32, value: impl Into<FieldValue>) -> Self {
        self.header.insert(tag, value.into());
        self
    }

    pub fn with_field(mut self, tag: u32, value: impl Into<FieldValue>) -> Self {
        self.body.insert(tag, value.into());
        self
    }

    pub fn header(&self, tag: u32) -> Option<&FieldValue> { self.header.get(&tag) }
    pub fn field(&self, tag: u32) -> Option<&FieldValue> { self.body.get(&tag) }

    pub fn get_str(&self, tag: u32) -> Result<&str, FieldError> {
        match self.field(tag) {
            Some(FieldValue::Str(s)) => Ok(s),
            Some(other) => Err(FieldError::IncorrectDataFormat { tag, expected: "string", found: other.kind() }),
            None => Err(FieldError::NotFound { tag }),
        }
    }

    /// Numeric field; text that parses as a decimal is accepted too, since tag=value
    /// engines hand numbers over as strings.
    pub fn get_decimal(&self, tag: u32) -> Result<Decimal, FieldError> {
        match self.field(tag) {
            Some(FieldValue::Num(n)) => Ok(*n),
            Some(FieldValue::Str(s)) => s.trim().parse::<Decimal>().map_err(|_| {
                FieldError::IncorrectDataFormat { tag, expected: "numeric", found: "string" }
            }),
            Some(other) => Err(FieldError::IncorrectDataFormat { tag, expected: "numeric", found: other.kind() }),
            None => Err(FieldError::NotFound { tag }),
        }
    }
}

impl fmt::Display for InboundMessage {
    // 35=R|131=QR1|55=IBM ... (pipe in place of SOH, for logs only)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (t, v) in self.header.iter().chain(self.body.iter()) {
            if !first { f.write_str("|")?; }
            write!(f, "{t}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// Identity of a counterparty session, as the session engine names it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle {
    pub begin_string: String,
    pub sender_comp_id: String,
    pub target_comp_id: String,
}

impl SessionHandle {
    pub fn new(begin_string: &str, sender_comp_id: &str, target_comp_id: &str) -> Self {
        Self {
            begin_string: begin_string.to_string(),
            sender_comp_id: sender_comp_id.to_string(),
            target_comp_id: target_comp_id.to_string(),
        }
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}->{}", self.begin_string, self.sender_comp_id, self.target_comp_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument { pub symbol: String, pub security_id: String }

impl Instrument {
    pub fn new(symbol: &str, security_id: &str) -> Self {
        Self { symbol: symbol.to_string(), security_id: security_id.to_string() }
    }
}

/// Typed view of a QuoteRequest(R).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub quote_req_id: String,
    pub instrument: Instrument,
    pub requested_size: Decimal,
}

impl TryFrom<&InboundMessage> for QuoteRequest {
    type Error = FieldError;

    fn try_from(msg: &InboundMessage) -> Result<Self, Self::Error> {
        let quote_req_id = msg.get_str(tag::QUOTE_REQ_ID)?;
        let symbol = msg.get_str(tag::SYMBOL)?;
        let security_id = msg.get_str(tag::SECURITY_ID)?;
        let requested_size = msg.get_decimal(tag::ORDER_QTY)?;

        if quote_req_id.is_empty() {
            return Err(FieldError::InvalidValue { tag: tag::QUOTE_REQ_ID, reason: "empty" });
        }
        if symbol.is_empty() {
            return Err(FieldError::InvalidValue { tag: tag::SYMBOL, reason: "empty" });
        }
        if requested_size.is_sign_negative() {
            return Err(FieldError::InvalidValue { tag: tag::ORDER_QTY, reason: "negative size" });
        }

        Ok(QuoteRequest {
            quote_req_id: quote_req_id.to_string(),
            instrument: Instrument::new(symbol, security_id),
            requested_size,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side { Buy, Sell }
impl Side { pub fn code(&self) -> char { match self { Side::Buy => '1', Side::Sell => '2' } } }

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrdType { Market, #[default] Limit }
impl OrdType { pub fn code(&self) -> char { match self { OrdType::Market => '1', OrdType::Limit => '2' } } }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlInst { AutomatedPrivate, AutomatedPublic, ManualBestExecution }
impl HandlInst {
    pub fn code(&self) -> char {
        match self {
            HandlInst::AutomatedPrivate => '1',
            HandlInst::AutomatedPublic => '2',
            HandlInst::ManualBestExecution => '3',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecType { New, Canceled, Replaced, Rejected, Trade }
impl ExecType {
    pub fn code(&self) -> char {
        match self {
            ExecType::New => '0',
            ExecType::Canceled => '4',
            ExecType::Replaced => '5',
            ExecType::Rejected => '8',
            ExecType::Trade => 'F',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrdStatus { New, PartiallyFilled, Filled, Canceled, Rejected }
impl OrdStatus {
    pub fn code(&self) -> char {
        match self {
            OrdStatus::New => '0',
            OrdStatus::PartiallyFilled => '1',
            OrdStatus::Filled => '2',
            OrdStatus::Canceled => '4',
            OrdStatus::Rejected => '8',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote_request() -> InboundMessage {
        InboundMessage::of_type(msg_type::QUOTE_REQUEST)
            .with_field(tag::QUOTE_REQ_ID, "QR1")
            .with_field(tag::SYMBOL, "IBM")
            .with_field(tag::SECURITY_ID, "US4592001014")
            .with_field(tag::ORDER_QTY, dec!(5000))
    }

    #[test]
    fn extracts_quote_request() {
        let qr = QuoteRequest::try_from(&quote_request()).unwrap();
        assert_eq!(qr.quote_req_id, "QR1");
        assert_eq!(qr.instrument, Instrument::new("IBM", "US4592001014"));
        assert_eq!(qr.requested_size, dec!(5000));
    }

    #[test]
    fn size_sent_as_text_is_accepted() {
        let msg = quote_request().with_field(tag::ORDER_QTY, "1500.5");
        let qr = QuoteRequest::try_from(&msg).unwrap();
        assert_eq!(qr.requested_size, dec!(1500.5));
    }

    #[test]
    fn missing_field_is_not_found() {
        let msg = InboundMessage::of_type(msg_type::QUOTE_REQUEST)
            .with_field(tag::QUOTE_REQ_ID, "QR1")
            .with_field(tag::SYMBOL, "IBM")
            .with_field(tag::ORDER_QTY, dec!(10));
        assert_eq!(
            QuoteRequest::try_from(&msg).unwrap_err(),
            FieldError::NotFound { tag: tag::SECURITY_ID }
        );
    }

    #[test]
    fn wrong_type_and_bad_values_are_rejected() {
        let numeric_symbol = quote_request().with_field(tag::SYMBOL, dec!(1));
        assert!(matches!(
            QuoteRequest::try_from(&numeric_symbol),
            Err(FieldError::IncorrectDataFormat { tag: tag::SYMBOL, .. })
        ));

        let garbage_size = quote_request().with_field(tag::ORDER_QTY, "lots");
        assert!(matches!(
            QuoteRequest::try_from(&garbage_size),
            Err(FieldError::IncorrectDataFormat { tag: tag::ORDER_QTY, .. })
        ));

        let negative = quote_request().with_field(tag::ORDER_QTY, dec!(-1));
        assert!(matches!(
            QuoteRequest::try_from(&negative),
            Err(FieldError::InvalidValue { tag: tag::ORDER_QTY, .. })
        ));

        let empty_id = quote_request().with_field(tag::QUOTE_REQ_ID, "");
        assert!(matches!(
            QuoteRequest::try_from(&empty_id),
            Err(FieldError::InvalidValue { tag: tag::QUOTE_REQ_ID, .. })
        ));
    }

    #[test]
    fn display_lists_header_then_body() {
        let msg = InboundMessage::of_type(msg_type::QUOTE_REQUEST).with_field(tag::SYMBOL, "IBM");
        assert_eq!(msg.to_string(), "35=R|55=IBM");
        let h = SessionHandle::new("FIX.4.4", "QUOTER", "CLIENT1");
        assert_eq!(h.to_string(), "FIX.4.4:QUOTER->CLIENT1");
    }
}
