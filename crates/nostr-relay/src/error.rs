//! The error table of §7, mapped to `NOTICE` text or connection-state
//! transitions. No error variant other than `TransportFault` tears down a
//! connection; `TransportFault` tears down exactly the affected one.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("unable to decode command string")]
    MalformedFrame,

    #[error("unsupported command {0}")]
    UnknownVerb(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid event, pubkey doesn't match sig")]
    InvalidEvent,

    #[error("{0}")]
    Rejected(String),

    #[error("event already exists: {0}")]
    Duplicate(String),

    #[error("REQ new sub_id {0} not allowed, already at max subs={1}")]
    LimitExceeded(String, usize),

    #[error("sub_id {0} already open")]
    DuplicateSub(String),

    #[error("not subscribed")]
    UnknownSub,

    #[error("storage error")]
    StorageFault,

    #[error("transport error: {0}")]
    TransportFault(String),
}
