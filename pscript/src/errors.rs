use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid argument for '{command}': {message}")]
    InvalidArgument { command: String, message: String },

    #[error("Unknown application '{0}'")]
    UnknownApplication(String),

    #[error("No running instance of {0} found")]
    NotRunning(String),

    #[error("'{command}' failed: {message}")]
    HandlerFailure { command: String, message: String },

    #[error("Platform-specific error: {0}")]
    Platform(String),

    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    pub fn invalid_argument(command: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            command: command.to_string(),
            message: message.into(),
        }
    }

    pub fn handler_failure(command: &str, message: impl Into<String>) -> Self {
        Self::HandlerFailure {
            command: command.to_string(),
            message: message.into(),
        }
    }

    /// Short name of the error kind, used as a tag in script log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownCommand(_) => "UnknownCommand",
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::UnknownApplication(_) => "UnknownApplication",
            Self::NotRunning(_) => "NotRunning",
            Self::HandlerFailure { .. } => "HandlerFailure",
            Self::Platform(_) => "PlatformError",
            Self::Io(_) => "IoError",
        }
    }
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Failed to read plugin: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed plugin manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Invalid plugin manifest: {0}")]
    InvalidManifest(String),

    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("Plugin panicked during registration: {0}")]
    Panicked(String),
}
