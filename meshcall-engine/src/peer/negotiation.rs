use std::fmt;

/// Per-peer offer/answer progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Connection object exists, nothing exchanged yet.
    New,
    /// We sent an offer and wait for the answer.
    OfferSent,
    /// Their answer is applied; ICE is still working.
    AnswerReceived,
    /// We answered their offer.
    AnswerSent,
    Connected,
    Failed,
    Closed,
}

impl NegotiationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NegotiationState::Failed | NegotiationState::Closed)
    }

    pub fn awaiting_answer(&self) -> bool {
        *self == NegotiationState::OfferSent
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationState::New => "new",
            NegotiationState::OfferSent => "offer-sent",
            NegotiationState::AnswerReceived => "answer-received",
            NegotiationState::AnswerSent => "answer-sent",
            NegotiationState::Connected => "connected",
            NegotiationState::Failed => "failed",
            NegotiationState::Closed => "closed",
        };
        f.write_str(name)
    }
}
