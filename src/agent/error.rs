use thiserror::Error;

/// Failures talking to the automation driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Node.js driver process failed to spawn
    #[error("failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the driver process failed
    #[error("driver session I/O failed: {0}")]
    SessionIo(String),

    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The driver ran the command and reported failure (element missing,
    /// not interactable, timeout)
    #[error("{command} failed: {error}")]
    Command { command: String, error: String },

    /// The driver reply lacked a required field
    #[error("{command} reply is missing {field}")]
    MissingData { command: String, field: String },
}

impl DriverError {
    pub fn command(command: &str, error: impl Into<String>) -> Self {
        DriverError::Command {
            command: command.to_string(),
            error: error.into(),
        }
    }

    /// First line of the message, for feeding back to the oracle.
    pub fn headline(&self) -> String {
        self.to_string().lines().next().unwrap_or_default().to_string()
    }
}

/// Failures turning a step into an action through the oracle.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The oracle could not be reached or returned an error status
    #[error("oracle request failed: {0}")]
    Transport(String),

    #[error("oracle returned an empty reply")]
    EmptyReply,

    #[error("oracle reply is not a JSON action object: {reply}")]
    Unparsable { reply: String },

    #[error("oracle reply is missing '{field}'")]
    IncompleteReply { field: &'static str },

    #[error("oracle proposed unsupported action '{0}'")]
    UnsupportedAction(String),

    /// No content snapshot was available to describe the surface
    #[error("surface could not be captured: {0}")]
    NoSnapshot(String),
}
