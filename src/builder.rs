// ===============================
// src/builder.rs (outbound message factory)
// ===============================
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{
    msg_type, tag, ExecType, FieldValue, HandlInst, Instrument, OrdStatus, OrdType, Side,
};

/// Quote(S) sent back for a QuoteRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteResponse {
    pub quote_id: String,
    pub bid_px: Decimal,
    pub offer_px: Decimal,
    pub instrument: Instrument,
    pub quantity: Decimal,
}

/// NewOrderSingle(D).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub cl_ord_id: String,
    pub side: Side,
    pub instrument: Instrument,
    pub quantity: Decimal,
    pub price: Decimal,
    pub ord_type: OrdType,
    pub transact_time: DateTime<Utc>,
    pub handl_inst: HandlInst,
}

/// ExecutionReport(8). LeavesQty/CumQty are derived from OrdStatus, so the
/// fields stay private and `build_execution_report` is the only constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    cl_ord_id: String,
    exec_id: String,
    exec_type: ExecType,
    ord_status: OrdStatus,
    instrument: Instrument,
    last_qty: Decimal,
    last_px: Decimal,
    leaves_qty: Decimal,
    cum_qty: Decimal,
}

impl ExecutionReport {
    pub fn cl_ord_id(&self) -> &str { &self.cl_ord_id }
    pub fn exec_id(&self) -> &str { &self.exec_id }
    pub fn exec_type(&self) -> ExecType { self.exec_type }
    pub fn ord_status(&self) -> OrdStatus { self.ord_status }
    pub fn instrument(&self) -> &Instrument { &self.instrument }
    pub fn last_qty(&self) -> Decimal { self.last_qty }
    pub fn last_px(&self) -> Decimal { self.last_px }
    pub fn leaves_qty(&self) -> Decimal { self.leaves_qty }
    pub fn cum_qty(&self) -> Decimal { self.cum_qty }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OutboundMessage {
    Quote(QuoteResponse),
    Order(OrderRequest),
    ExecutionReport(ExecutionReport),
}

impl OutboundMessage {
    pub fn msg_type(&self) -> &'static str {
        match self {
            OutboundMessage::Quote(_) => msg_type::QUOTE,
            OutboundMessage::Order(_) => msg_type::NEW_ORDER_SINGLE,
            OutboundMessage::ExecutionReport(_) => msg_type::EXECUTION_REPORT,
        }
    }

    /// Body fields in the order they are set on the message.
    pub fn fields(&self) -> Vec<(u32, FieldValue)> {
        match self {
            OutboundMessage::Quote(q) => vec![
                (tag::QUOTE_ID, q.quote_id.clone().into()),
                (tag::BID_PX, q.bid_px.into()),
                (tag::OFFER_PX, q.offer_px.into()),
                (tag::SYMBOL, q.instrument.symbol.clone().into()),
                (tag::SECURITY_ID, q.instrument.security_id.clone().into()),
                (tag::ORDER_QTY, q.quantity.into()),
            ],
            OutboundMessage::Order(o) => vec![
                (tag::CL_ORD_ID, o.cl_ord_id.clone().into()),
                (tag::SIDE, o.side.code().into()),
                (tag::SYMBOL, o.instrument.symbol.clone().into()),
                (tag::SECURITY_ID, o.instrument.security_id.clone().into()),
                (tag::ORDER_QTY, o.quantity.into()),
                (tag::PRICE, o.price.into()),
                (tag::ORD_TYPE, o.ord_type.code().into()),
                (tag::TRANSACT_TIME, o.transact_time.format("%Y%m%d-%H:%M:%S%.3f").to_string().into()),
                (tag::HANDL_INST, o.handl_inst.code().into()),
            ],
            OutboundMessage::ExecutionReport(er) => vec![
                (tag::CL_ORD_ID, er.cl_ord_id.clone().into()),
                (tag::EXEC_ID, er.exec_id.clone().into()),
                (tag::EXEC_TYPE, er.exec_type.code().into()),
                (tag::ORD_STATUS, er.ord_status.code().into()),
                (tag::SYMBOL, er.instrument.symbol.clone().into()),
                (tag::SECURITY_ID, er.instrument.security_id.clone().into()),
                (tag::LAST_QTY, er.last_qty.into()),
                (tag::LAST_PX, er.last_px.into()),
                (tag::LEAVES_QTY, er.leaves_qty.into()),
                (tag::CUM_QTY, er.cum_qty.into()),
            ],
        }
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", tag::MSG_TYPE, self.msg_type())?;
        for (t, v) in self.fields() {
            write!(f, "|{t}={v}")?;
        }
        Ok(())
    }
}

pub fn build_quote_response(
    quote_id: &str,
    bid_px: Decimal,
    offer_px: Decimal,
    instrument: &Instrument,
    quantity: Decimal,
) -> QuoteResponse {
    QuoteResponse {
        quote_id: quote_id.to_string(),
        bid_px,
        offer_px,
        instrument: instrument.clone(),
        quantity,
    }
}

/// TransactTime is stamped here; HandlInst is always manual/best execution.
pub fn build_order(
    cl_ord_id: &str,
    side: Side,
    instrument: &Instrument,
    quantity: Decimal,
    price: Decimal,
    ord_type: OrdType,
) -> OrderRequest {
    OrderRequest {
        cl_ord_id: cl_ord_id.to_string(),
        side,
        instrument: instrument.clone(),
        quantity,
        price,
        ord_type,
        transact_time: Utc::now(),
        handl_inst: HandlInst::ManualBestExecution,
    }
}

pub fn build_execution_report(
    cl_ord_id: &str,
    exec_id: &str,
    exec_type: ExecType,
    ord_status: OrdStatus,
    instrument: &Instrument,
    quantity: Decimal,
    last_px: Decimal,
) -> ExecutionReport {
    let (leaves_qty, cum_qty) = match ord_status {
        OrdStatus::Filled => (Decimal::ZERO, quantity),
        _ => (quantity, Decimal::ZERO),
    };
    ExecutionReport {
        cl_ord_id: cl_ord_id.to_string(),
        exec_id: exec_id.to_string(),
        exec_type,
        ord_status,
        instrument: instrument.clone(),
        last_qty: quantity,
        last_px,
        leaves_qty,
        cum_qty,
    }
}
