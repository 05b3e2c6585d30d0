use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatomoErrorCode {
    Configuration,
    AlreadyInitialized,
    AlreadyInjected,
    Environment,
}

impl MatomoErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatomoErrorCode::Configuration => "matomo/configuration",
            MatomoErrorCode::AlreadyInitialized => "matomo/already-initialized",
            MatomoErrorCode::AlreadyInjected => "matomo/already-injected",
            MatomoErrorCode::Environment => "matomo/environment",
        }
    }
}

#[derive(Clone, Debug)]
pub struct MatomoError {
    pub code: MatomoErrorCode,
    message: String,
}

impl MatomoError {
    pub fn new(code: MatomoErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for MatomoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for MatomoError {}

pub type MatomoResult<T> = Result<T, MatomoError>;

pub fn configuration_error(message: impl Into<String>) -> MatomoError {
    MatomoError::new(MatomoErrorCode::Configuration, message)
}

pub fn already_initialized() -> MatomoError {
    MatomoError::new(
        MatomoErrorCode::AlreadyInitialized,
        "Matomo has already been initialized",
    )
}

pub fn already_injected() -> MatomoError {
    MatomoError::new(
        MatomoErrorCode::AlreadyInjected,
        "Matomo trackers have already been initialized",
    )
}

pub fn environment_error(message: impl Into<String>) -> MatomoError {
    MatomoError::new(MatomoErrorCode::Environment, message)
}
