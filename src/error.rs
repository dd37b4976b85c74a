use thiserror::Error;

pub type Result<T> = std::result::Result<T, LightError>;

#[derive(Debug, Error)]
pub enum LightError {
    #[error("invalid tempo {0:?}, expected a whole number between 40 and 240 BPM")]
    InvalidTempo(String),

    #[error("invalid color {0:?}, use a color name or a hex code like #ff0000")]
    InvalidColor(String),

    #[error("no valid colors in {0:?}")]
    NoValidColors(Vec<String>),

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("device rejected {endpoint}: {reply:?}")]
    Rejected { endpoint: String, reply: String },

    #[error("cannot load config: {0}")]
    Config(#[from] config_file::ConfigFileError),

    #[error("cannot install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl LightError {
    /// Classifies a transport error, keeping timeouts apart from other failures.
    pub fn from_transport(endpoint: &str, err: reqwest::Error) -> LightError {
        if err.is_timeout() {
            LightError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            LightError::Http {
                endpoint: endpoint.to_string(),
                source: err,
            }
        }
    }
}
