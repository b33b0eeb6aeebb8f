use graft_dex::SignatureError;
use graft_ir::GraphError;
use thiserror::Error;
use tracing::error;

/// Instrumentation errors.
///
/// Every variant is fatal for the compilation unit it occurs in.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not find type {0}")]
    TypeNotFound(String),
    #[error("Could not find method idx for {0}")]
    MethodNotFound(String),
    #[error("CodelibSymbols: Failed obtaining method idx for signature {0}")]
    UnregisteredSignature(String),
    #[error("Malformed injection {signature}: {reason}")]
    MalformedInjection { signature: String, reason: String },
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),
    #[error("Invalid blacklist pattern: {0}")]
    Blacklist(#[from] regex::Error),
    #[error("Compilation of {method} aborted: {source}")]
    CompilationAborted {
        method: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn malformed(signature: impl ToString, reason: impl Into<String>) -> Self {
        Self::MalformedInjection {
            signature: signature.to_string(),
            reason: reason.into(),
        }
    }

    /// Underlying cause, looking through [`Error::CompilationAborted`].
    pub fn root(&self) -> &Self {
        match self {
            Self::CompilationAborted { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Abort compilation of `method`.
///
/// The single funnel for fatal instrumentation failures: the failure is
/// logged here and the returned error must be propagated to the host without
/// touching the graph any further.
pub fn abort_compilation(method: &str, cause: Error) -> Error {
    if let Error::CompilationAborted { .. } = cause {
        return cause;
    }
    error!(method = %method, error = %cause, "aborting compilation");
    Error::CompilationAborted {
        method: method.to_string(),
        source: Box::new(cause),
    }
}
