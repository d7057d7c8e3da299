//! Typed ID wrappers for streams, scheduled actions, agents, and ledger objects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up stream names, action keys, etc.
/// These are just strings underneath. Ledger object ids and addresses
/// are passed through verbatim, no format is enforced.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(StreamId, "Name of a logical event stream (one cursor per stream).");
typed_id!(ActionKey, "Unique key of a pending scheduled action.");
typed_id!(AgentId, "Unique identifier for an autonomous agent session.");
typed_id!(ObjectId, "Identifier of an object on the remote ledger.");

/// Identity of a single emitted event: the transaction that emitted it
/// plus its sequence number within that transaction.
///
/// Two fetches of the same event produce equal ids, which is what makes
/// deduplication possible under at-least-once delivery.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventId {
    /// Digest of the emitting transaction.
    pub tx_digest: String,
    /// Position of the event within the transaction.
    #[serde(with = "seq_string")]
    pub event_seq: u64,
}

impl EventId {
    /// Create a new event id.
    pub fn new(tx_digest: impl Into<String>, event_seq: u64) -> Self {
        Self {
            tx_digest: tx_digest.into(),
            event_seq,
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_digest, self.event_seq)
    }
}

/// Ledger RPCs encode the sequence as a decimal string; accept both.
mod seq_string {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(seq: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&seq.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Seq {
            Num(u64),
            Str(String),
        }
        match Seq::deserialize(d)? {
            Seq::Num(n) => Ok(n),
            Seq::Str(s) => s.parse().map_err(D::Error::custom),
        }
    }
}
