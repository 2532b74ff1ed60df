#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("rejected by API server ({code} {reason}): {message}")]
    Rejected {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("invalid object: {0}")]
    Invalid(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) => match ae.code {
                404 => Self::NotFound(ae.message),
                409 => Self::Conflict(ae.message),
                401 | 403 => Self::Forbidden(ae.message),
                code => Self::Rejected {
                    code,
                    reason: ae.reason,
                    message: ae.message,
                },
            },
            kube::Error::SerdeError(e) => Self::Invalid(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}
