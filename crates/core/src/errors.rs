use thiserror::Error;

/// Reasons the live spot price could not be sourced.
///
/// These never reach the storefront while a fallback price is configured; the provider
/// reports them through [`crate::spot::SpotPriceOutcome::Fallback`] instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SpotPriceError {
    #[error("spot price api key is not configured")]
    MissingCredential,
    #[error("spot price upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("malformed spot price response: {0}")]
    MalformedUpstreamResponse(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid value `{value}` for query parameter `{parameter}`")]
    InvalidFilterInput { parameter: &'static str, value: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    SpotPrice(#[from] SpotPriceError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("price unavailable: {message}")]
    PriceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Message safe to hand back to storefront clients.
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } => message,
            Self::PriceUnavailable { .. } => "Could not retrieve gold price.",
            Self::Internal { .. } => "Internal server error.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::PriceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::PriceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Filter(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::SpotPrice(error) => Self::PriceUnavailable {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Unexpected(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
