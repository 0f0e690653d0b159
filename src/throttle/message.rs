//! The narrow view of an outbound message the throttler needs.

use serde::{Deserialize, Serialize};

/// Classification of an outbound message by its stable type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A new order request
    NewOrder,
    /// An amend (cancel/replace) request
    CancelReplace,
    /// A cancel request
    CancelRequest,
    /// Any other message type, by raw identifier
    Other(u16),
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::NewOrder => write!(f, "new_order"),
            MessageKind::CancelReplace => write!(f, "cancel_replace"),
            MessageKind::CancelRequest => write!(f, "cancel_request"),
            MessageKind::Other(id) => write!(f, "other({})", id),
        }
    }
}

/// What the throttler asks of a message.
pub trait Message {
    /// True if the message is a possible-duplicate replay.
    fn is_poss_dup(&self) -> bool;

    /// The message's type classification.
    fn kind(&self) -> MessageKind;

    /// True if the message is a cancel request.
    fn is_cancel_request(&self) -> bool {
        self.kind() == MessageKind::CancelRequest
    }
}

impl<T: Message + ?Sized> Message for &T {
    fn is_poss_dup(&self) -> bool {
        (**self).is_poss_dup()
    }

    fn kind(&self) -> MessageKind {
        (**self).kind()
    }
}

/// A minimal concrete message, used by the replay tool and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    #[serde(default)]
    pub poss_dup: bool,
}

impl OutboundMessage {
    /// A fresh (non-replayed) message of the given kind.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            poss_dup: false,
        }
    }

    /// The same message flagged as a possible-duplicate replay.
    pub fn replayed(mut self) -> Self {
        self.poss_dup = true;
        self
    }
}

impl Message for OutboundMessage {
    fn is_poss_dup(&self) -> bool {
        self.poss_dup
    }

    fn kind(&self) -> MessageKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_classification() {
        assert!(OutboundMessage::new(MessageKind::CancelRequest).is_cancel_request());
        assert!(!OutboundMessage::new(MessageKind::CancelReplace).is_cancel_request());
        assert!(!OutboundMessage::new(MessageKind::Other(42)).is_cancel_request());
    }

    #[test]
    fn test_replayed_sets_flag() {
        let msg = OutboundMessage::new(MessageKind::NewOrder);
        assert!(!msg.is_poss_dup());
        assert!(msg.replayed().is_poss_dup());
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let msg: OutboundMessage = serde_yaml::from_str("kind: cancel_request\n").unwrap();
        assert_eq!(msg, OutboundMessage::new(MessageKind::CancelRequest));

        let msg: OutboundMessage =
            serde_yaml::from_str("kind: new_order\nposs_dup: true\n").unwrap();
        assert!(msg.poss_dup);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MessageKind::CancelRequest.to_string(), "cancel_request");
        assert_eq!(MessageKind::Other(7).to_string(), "other(7)");
    }
}
