//! Typed failures returned by the upstream gateway

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Connection failure or request timeout
    Transport(String),
    /// Non-success HTTP status
    UpstreamStatus(u16),
    /// Success envelope carrying an embedded API error
    UpstreamRejected { code: String, info: String },
    /// Response body did not match the expected shape
    Decode(String),
}

impl GatewayError {
    pub fn rejected(code: impl Into<String>, info: impl Into<String>) -> Self {
        GatewayError::UpstreamRejected {
            code: code.into(),
            info: info.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            GatewayError::UpstreamStatus(status.as_u16())
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Transport(e) => write!(f, "Transport error: {}", e),
            GatewayError::UpstreamStatus(code) => write!(f, "Upstream returned HTTP {}", code),
            GatewayError::UpstreamRejected { code, info } => {
                write!(f, "Upstream rejected request ({}): {}", code, info)
            }
            GatewayError::Decode(e) => write!(f, "Decode error: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {}
