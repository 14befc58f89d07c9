//! Error kinds for the schema manager, and the `CResult` alias used
//! throughout the crate (mirrors the naming used by the KV gateway and
//! codec call sites).

use std::fmt;

pub type CResult<T> = Result<T, Error>;

/// Error kinds raised by the schema manager.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A serialized schema overflowed the codec's buffer cap. Fatal for the
    /// DDL that triggered it; the generation is never bumped.
    CatalogTooLarge { cap: usize },

    /// The KV store failed non-transiently (as opposed to a conflict,
    /// which `commit_or_retry` absorbs invisibly).
    StoreUnavailable(String),

    /// The KV store or surrounding I/O was interrupted mid-operation.
    /// Always re-surfaced to callers as `QueryCanceled`.
    Interrupted,

    /// Mapped from `Interrupted` at the session boundary.
    QueryCanceled,

    /// `LIVE_AIS_VALIDATIONS` rejected a candidate catalog. The DDL aborts
    /// before any KV write happens.
    ValidationFailure(String),

    /// The manager was constructed against an incompatible transaction
    /// service. Fatal at startup.
    WrongTransactionService,

    /// An invariant the manager relies on did not hold. Should never
    /// happen in practice; surfaced rather than silently worked around.
    InternalInvariant(String),

    /// The catalog codec failed to encode or decode a blob.
    Codec(String),

    /// The KV gateway reported a problem that isn't covered above.
    Kv(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CatalogTooLarge { cap } => {
                write!(f, "AIS too large: exceeds the {cap}-byte cap")
            }
            Error::StoreUnavailable(msg) => write!(f, "KV store unavailable: {msg}"),
            Error::Interrupted => write!(f, "interrupted"),
            Error::QueryCanceled => write!(f, "query canceled"),
            Error::ValidationFailure(msg) => write!(f, "catalog validation failed: {msg}"),
            Error::WrongTransactionService => {
                write!(f, "schema manager constructed with an incompatible transaction service")
            }
            Error::InternalInvariant(msg) => write!(f, "internal invariant violated: {msg}"),
            Error::Codec(msg) => write!(f, "catalog codec error: {msg}"),
            Error::Kv(msg) => write!(f, "kv gateway error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Maps any interruption observed while talking to the KV store onto
    /// the session-facing `QueryCanceled` kind.
    pub fn as_query_canceled(&self) -> Option<Error> {
        matches!(self, Error::Interrupted).then_some(Error::QueryCanceled)
    }
}
