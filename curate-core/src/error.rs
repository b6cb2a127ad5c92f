use std::{error, fmt, io, sync::Arc};

use crate::item::ItemType;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Transport(String),
    EmptyResponse,
    UnexpectedResponse,
    NoPlaylistSelected,
    UnknownItem { id: Arc<str>, item_type: ItemType },
    Unsupported(&'static str),
    InvalidValue(String),
    Io(String),
    Config(String),
    WorkerGone,
}

impl Error {
    /// Failures that collapse into a view's error flag.  Everything else is
    /// rejected before a request is issued.
    pub fn is_ledger_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::EmptyResponse | Self::UnexpectedResponse | Self::WorkerGone
        )
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "Ledger request failed: {err}"),
            Self::EmptyResponse => write!(f, "Ledger returned an empty response"),
            Self::UnexpectedResponse => write!(f, "Unknown ledger response"),
            Self::NoPlaylistSelected => write!(f, "No playlist selected"),
            Self::UnknownItem { id, item_type } => {
                write!(f, "Unknown {item_type} item: {id}")
            }
            Self::Unsupported(what) => write!(f, "Unsupported operation: {what}"),
            Self::InvalidValue(err) => write!(f, "Invalid value: {err}"),
            Self::Io(err) | Self::Config(err) => f.write_str(err),
            Self::WorkerGone => write!(f, "Ledger worker disconnected"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(err.to_string())
    }
}
