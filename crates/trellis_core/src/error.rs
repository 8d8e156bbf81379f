use std::path::PathBuf;

use thiserror::Error;

/// Any failure raised while reading, elaborating or compacting a topology.
///
/// Nothing is caught internally; every fallible function propagates to the
/// caller and the driver decides how to report.
#[derive(Debug, Error)]
pub enum Error {
    /// An input file could not be read.
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The input is not valid JSON, or violates the description schema.
    #[error("invalid topology description: {0}")]
    Json(#[from] serde_json::Error),
    /// More than one `network` entry appeared across the merged inputs.
    #[error("more than one network entry given")]
    DuplicateNetwork,
    /// An embedded arithmetic expression failed to compile or evaluate.
    #[error("could not evaluate \"{expr}\": {reason}")]
    Eval { expr: String, reason: String },
    /// A connection endpoint could not be resolved, or an edge was attempted
    /// between a node and itself.
    #[error("could not connect {from} {to}")]
    Conn { from: String, to: String },
    /// A referenced module name is not defined.
    #[error("could not find module {0}")]
    NoModule(String),
    /// The definition has no `network` entry.
    #[error("no network given")]
    NoNetwork,
    /// A gate is connected more than twice.
    #[error("gate {0} is connected more than twice")]
    BadGate(String),
    /// A loop's lower bound exceeds its upper bound.
    #[error("bad loop boundaries: {start} > {end}")]
    Loop { start: i64, end: i64 },
    /// An `all-match` or `replace` pattern failed to compile.
    #[error("bad regex: {0}")]
    Regex(#[from] regex::Error),
    /// A root product named a root vertex that does not exist in its operand.
    #[error("no root vertex named {0}")]
    Root(String),
}

impl Error {
    /// Shorthand for an [`Error::Eval`] wrapping an evaluator failure.
    pub(crate) fn eval(expr: &str, reason: impl ToString) -> Self {
        Error::Eval {
            expr: expr.to_string(),
            reason: reason.to_string(),
        }
    }
}
