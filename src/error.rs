use std::fmt;
use std::io;

#[derive(Debug)]
pub enum PacServeError {
    Io(io::Error),
    /// The remote PAC file could not be fetched: DNS, connection refused,
    /// timeout, or a non-2xx HTTP status.
    Unreachable(String),
    /// A proxy server string did not parse into `http(s)://host:port`.
    InvalidProxyFormat(String),
    /// The listening socket could not be acquired.
    Bind(String),
    /// The on-disk PAC cache could not be written.
    Persist(String),
    Logging(String),
}

impl fmt::Display for PacServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacServeError::Io(e) => write!(f, "IO error: {}", e),
            PacServeError::Unreachable(e) => write!(f, "PAC source unreachable: {}", e),
            PacServeError::InvalidProxyFormat(e) => write!(f, "Invalid proxy format: {}", e),
            PacServeError::Bind(e) => write!(f, "Bind error: {}", e),
            PacServeError::Persist(e) => write!(f, "Persist error: {}", e),
            PacServeError::Logging(e) => write!(f, "Logging error: {}", e),
        }
    }
}

impl std::error::Error for PacServeError {}

impl From<io::Error> for PacServeError {
    fn from(err: io::Error) -> Self {
        PacServeError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, PacServeError>;
