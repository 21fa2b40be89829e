use common::domain::RawMessage;

/// Request type for handling a single claimed log message through Tower.
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    pub message: RawMessage,
}

impl ConsumeRequest {
    pub fn new(message: RawMessage) -> Self {
        Self { message }
    }
}

/// Whether a handled message should be acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeResponse {
    /// Done with the message; acknowledge it.
    Ack,
    /// Leave the message pending so it is delivered again.
    Nak(Option<String>),
}

impl ConsumeResponse {
    pub fn ack() -> Self {
        Self::Ack
    }

    pub fn nak(reason: impl Into<String>) -> Self {
        Self::Nak(Some(reason.into()))
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }

    pub fn is_nak(&self) -> bool {
        matches!(self, Self::Nak(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_response_ack() {
        let resp = ConsumeResponse::ack();
        assert!(resp.is_ack());
        assert!(!resp.is_nak());
    }

    #[test]
    fn test_consume_response_nak_keeps_reason() {
        let resp = ConsumeResponse::nak("store down");
        assert!(resp.is_nak());
        assert_eq!(resp, ConsumeResponse::Nak(Some("store down".to_string())));
    }
}
