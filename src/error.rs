use anyhow::anyhow;

pub type Result<T> = std::result::Result<T, LibError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    Forbidden,
    Gateway,
    InvalidInput,
    MissingContext,
    NotFound,
    Unknown,
}

#[derive(Debug)]
pub struct LibError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub public: &'static str,
    /// Message supplied at runtime by a backend, shown instead of `public` when present.
    pub detail: Option<String>,
    pub source: anyhow::Error,
}

impl LibError {
    pub fn gateway(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Gateway,
            code: "gateway_error",
            public,
            detail: None,
            source,
        }
    }

    /// A backend refused the request with its own message.
    pub fn rejected(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::Gateway,
            code: "gateway_rejected",
            public: "The server rejected the request",
            source: anyhow!("gateway rejected request: {}", message),
            detail: Some(message),
        }
    }

    pub fn invalid(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            code: "invalid_input",
            public,
            detail: None,
            source,
        }
    }

    pub fn invalid_with_code(
        code: &'static str,
        public: &'static str,
        source: anyhow::Error,
    ) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            code,
            public,
            detail: None,
            source,
        }
    }

    pub fn forbidden(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Forbidden,
            code: "forbidden",
            public,
            detail: None,
            source,
        }
    }

    pub fn forbidden_with_code(
        code: &'static str,
        public: &'static str,
        source: anyhow::Error,
    ) -> Self {
        Self {
            kind: ErrorKind::Forbidden,
            code,
            public,
            detail: None,
            source,
        }
    }

    pub fn conflict(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Conflict,
            code: "mutation_in_flight",
            public,
            detail: None,
            source,
        }
    }

    pub fn missing_context(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::MissingContext,
            code: "missing_family_tree",
            public,
            detail: None,
            source,
        }
    }

    pub fn not_found(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            code: "not_found",
            public,
            detail: None,
            source,
        }
    }

    pub fn unknown(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Unknown,
            code: "unknown_error",
            public,
            detail: None,
            source,
        }
    }

    pub fn message(public: &'static str) -> Self {
        Self::unknown(public, anyhow!(public))
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Text to show the user.
    pub fn user_message(&self) -> &str {
        self.detail.as_deref().unwrap_or(self.public)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl std::fmt::Display for LibError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.user_message(), self.code)
    }
}

impl std::error::Error for LibError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}
