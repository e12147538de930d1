use super::types::{TransportErrorKind, VerifyError};

/// Which stage of a check an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    /// The check could not be set up (definition, schema, template, config).
    Setup,
    /// The exchange with the target failed.
    Transport,
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub stage: ErrorStage,
    pub retryable: bool,
}

impl VerifyError {
    /// Classify this error to determine its stage and whether an outer caller may retry it.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            VerifyError::Transport(e) => ErrorClassification {
                error_type: "TransportError",
                stage: ErrorStage::Transport,
                // Malformed requests will fail the same way again
                retryable: e.kind != TransportErrorKind::Request,
            },
            VerifyError::Io(_) => ErrorClassification {
                error_type: "IoError",
                stage: ErrorStage::Setup,
                retryable: true,
            },

            // Non-retryable errors
            VerifyError::Config(_) => setup("ConfigError"),
            VerifyError::Definition(_) => setup("DefinitionError"),
            VerifyError::Environment(_) => setup("EnvironmentError"),
            VerifyError::RequestTemplate(_) => setup("RequestTemplateError"),
            VerifyError::Extraction(_) => setup("ExtractionError"),
            VerifyError::Unbound => setup("UnboundSessionError"),
            VerifyError::Yaml(_) => setup("YamlError"),
        }
    }

    pub fn is_transport(&self) -> bool {
        self.classify().stage == ErrorStage::Transport
    }
}

fn setup(error_type: &'static str) -> ErrorClassification {
    ErrorClassification { error_type, stage: ErrorStage::Setup, retryable: false }
}
