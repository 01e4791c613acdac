// ===============================
// src/handler.rs
// ===============================
//
// Per-message pipeline:
//   MessageDispatcher::dispatch  -> classify (MsgType 35)
//   QuoteRequestHandler::handle  -> extract -> evaluate -> build -> send
//
// Every error is scoped to the message being handled: it is logged once
// here and never returned to the serve loop.
//
use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn, Span};

use crate::builder::{build_quote_response, OutboundMessage};
use crate::classifier::{classify, ClassifyError, HandlerAction};
use crate::domain::{msg_type, tag, FieldError, InboundMessage, QuoteRequest, SessionHandle};
use crate::metrics::{msg_type_label, HANDLE_LATENCY_US, INBOUND, MESSAGE_ERRORS, QUOTE_OUTCOMES, QUOTE_REQUESTS, UNHANDLED};
use crate::policy::{QuoteDecision, QuotePolicy};
use crate::session::{SendError, SessionSender};

/// Terminal state of one QuoteRequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Responded,
    Declined,
    Errored,
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Responded => "responded",
            Outcome::Declined => "declined",
            Outcome::Errored => "errored",
        }
    }
}

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("field not found: {0}")]
    FieldNotFound(FieldError),
    #[error("invalid field: {0}")]
    InvalidField(FieldError),
    #[error("transmission failure: {0}")]
    Transmission(#[from] SendError),
}

impl From<FieldError> for HandleError {
    fn from(e: FieldError) -> Self {
        match e {
            FieldError::NotFound { .. } => HandleError::FieldNotFound(e),
            _ => HandleError::InvalidField(e),
        }
    }
}

impl HandleError {
    fn kind(&self) -> &'static str {
        match self {
            HandleError::FieldNotFound(_) => "field_not_found",
            HandleError::InvalidField(_) => "invalid_field",
            HandleError::Transmission(_) => "transmission_failure",
        }
    }
}

pub struct QuoteRequestHandler {
    policy: Arc<dyn QuotePolicy>,
    offer_px: Decimal,
    span: Span,
}

impl QuoteRequestHandler {
    /// `offer_px` goes out on every quote; the desk only bids.
    pub fn new(policy: Arc<dyn QuotePolicy>, offer_px: Decimal, span: Span) -> Self {
        Self { policy, offer_px, span }
    }

    pub fn handle(
        &self,
        msg: &InboundMessage,
        session: &SessionHandle,
        sender: &dyn SessionSender,
    ) -> Outcome {
        let _enter = self.span.enter();
        let started = Instant::now();
        QUOTE_REQUESTS.inc();

        let outcome = match self.process(msg, session, sender) {
            Ok(outcome) => outcome,
            Err(e) => {
                // request id may still be readable even when another field is missing
                let quote_req_id = msg.get_str(tag::QUOTE_REQ_ID).ok();
                error!(
                    %session,
                    msg_type = msg_type::QUOTE_REQUEST,
                    quote_req_id = quote_req_id.unwrap_or("?"),
                    kind = e.kind(),
                    error = %e,
                    "error handling QuoteRequest"
                );
                MESSAGE_ERRORS.with_label_values(&[e.kind()]).inc();
                Outcome::Errored
            }
        };

        QUOTE_OUTCOMES.with_label_values(&[outcome.label()]).inc();
        HANDLE_LATENCY_US.observe(started.elapsed().as_secs_f64() * 1_000_000.0);
        outcome
    }

    fn process(
        &self,
        msg: &InboundMessage,
        session: &SessionHandle,
        sender: &dyn SessionSender,
    ) -> Result<Outcome, HandleError> {
        let req = QuoteRequest::try_from(msg)?;

        match self.policy.evaluate(&req.instrument, req.requested_size) {
            QuoteDecision::Quote { bid_px } => {
                let response = build_quote_response(
                    &req.quote_req_id,
                    bid_px,
                    self.offer_px,
                    &req.instrument,
                    req.requested_size,
                );
                sender.send(OutboundMessage::Quote(response), session)?;
                info!(
                    %session,
                    quote_req_id = %req.quote_req_id,
                    symbol = %req.instrument.symbol,
                    %bid_px,
                    qty = %req.requested_size,
                    "QuoteResponse sent"
                );
                Ok(Outcome::Responded)
            }
            QuoteDecision::Decline => {
                info!(
                    %session,
                    quote_req_id = %req.quote_req_id,
                    symbol = %req.instrument.symbol,
                    qty = %req.requested_size,
                    "QuoteRequest was not pursued"
                );
                Ok(Outcome::Declined)
            }
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Quote(Outcome),
    Unhandled(String),
    Malformed,
}

pub struct MessageDispatcher {
    quotes: QuoteRequestHandler,
    span: Span,
}

impl MessageDispatcher {
    pub fn new(quotes: QuoteRequestHandler, span: Span) -> Self { Self { quotes, span } }

    pub fn dispatch(
        &self,
        msg: &InboundMessage,
        session: &SessionHandle,
        sender: &dyn SessionSender,
    ) -> Dispatched {
        let action = match classify(msg) {
            Ok(action) => action,
            Err(e) => {
                self.log_malformed(&e, session);
                INBOUND.with_label_values(&["?"]).inc();
                MESSAGE_ERRORS.with_label_values(&["malformed_message"]).inc();
                return Dispatched::Malformed;
            }
        };

        match action {
            HandlerAction::QuoteRequest => {
                INBOUND.with_label_values(&[msg_type::QUOTE_REQUEST]).inc();
                Dispatched::Quote(self.quotes.handle(msg, session, sender))
            }
            HandlerAction::Unhandled(raw) => {
                self.span.in_scope(|| warn!(%session, msg_type = %raw, "unhandled message type"));
                let label = msg_type_label(&raw);
                INBOUND.with_label_values(&[label]).inc();
                UNHANDLED.with_label_values(&[label]).inc();
                Dispatched::Unhandled(raw)
            }
        }
    }

    fn log_malformed(&self, e: &ClassifyError, session: &SessionHandle) {
        self.span.in_scope(|| error!(%session, error = %e, "malformed message dropped"));
    }
}
