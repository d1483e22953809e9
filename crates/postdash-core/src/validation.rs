//! Form validation for server connections and sign-in.
//!
//! Validation runs before anything is sent; a form with errors never reaches
//! the gateway.

use postdash_api::{ServerConnection, ServerDraft, ServerPatch, ServerStatus};

/// Port pre-filled on a new server form.
pub const DEFAULT_PORT: u16 = 3306;

/// Validation error for a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Server name is empty.
    EmptyName,
    /// Database host is empty.
    EmptyHost,
    /// Port is empty.
    MissingPort,
    /// Port is not a number.
    InvalidPort,
    /// Port is zero.
    PortTooLow,
    /// Port is above 65535.
    PortTooHigh,
    /// Database name is empty.
    EmptyDatabase,
    /// Database username is empty.
    EmptyUsername,
    /// Email address is empty.
    EmptyEmail,
    /// Email address format is invalid.
    InvalidEmail,
    /// Password is empty.
    EmptyPassword,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyName => "Server name is required",
            Self::EmptyHost => "Host is required",
            Self::MissingPort => "Port is required",
            Self::InvalidPort => "Port must be a number",
            Self::PortTooLow => "Port must be at least 1",
            Self::PortTooHigh => "Port must be at most 65535",
            Self::EmptyDatabase => "Database name is required",
            Self::EmptyUsername => "Username is required",
            Self::EmptyEmail => "Email is required",
            Self::InvalidEmail => "Invalid email address",
            Self::EmptyPassword => "Password is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyName => "name",
            Self::EmptyHost => "host",
            Self::MissingPort | Self::InvalidPort | Self::PortTooLow | Self::PortTooHigh => "port",
            Self::EmptyDatabase => "database",
            Self::EmptyUsername => "username",
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::EmptyPassword => "password",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a form.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Raw input of the add/edit server form.
///
/// The port is kept as typed text so that non-numeric input can be reported
/// instead of silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerForm {
    /// Display name.
    pub name: String,
    /// Database host.
    pub host: String,
    /// Database port as entered.
    pub port: String,
    /// Database name.
    pub database: String,
    /// Database username.
    pub username: String,
    /// Database password. Empty on edit keeps the stored one.
    pub password: String,
    /// Whether the connection is active.
    pub is_active: bool,
}

impl Default for ServerForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerForm {
    /// An empty form with the default port and the active flag set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            host: String::new(),
            port: DEFAULT_PORT.to_string(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            is_active: true,
        }
    }

    /// A form pre-filled for editing `server`. The password starts empty.
    #[must_use]
    pub fn from_server(server: &ServerConnection) -> Self {
        Self {
            name: server.name.clone(),
            host: server.host.clone(),
            port: server.port.to_string(),
            database: server.database.clone(),
            username: server.username.clone(),
            password: String::new(),
            is_active: server.status == ServerStatus::Active,
        }
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns every [`ValidationError`] found.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName);
        }
        if self.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost);
        }
        if let Err(e) = parse_port(&self.port) {
            errors.push(e);
        }
        if self.database.trim().is_empty() {
            errors.push(ValidationError::EmptyDatabase);
        }
        if self.username.trim().is_empty() {
            errors.push(ValidationError::EmptyUsername);
        }

        finish(errors)
    }

    /// Validate and build a create payload.
    ///
    /// # Errors
    ///
    /// Returns every [`ValidationError`] found.
    pub fn to_draft(&self) -> Result<ServerDraft, Vec<ValidationError>> {
        self.validate()?;
        let port = parse_port(&self.port).map_err(|e| vec![e])?;
        Ok(ServerDraft {
            name: self.name.trim().to_string(),
            host: self.host.trim().to_string(),
            port,
            database: self.database.trim().to_string(),
            username: self.username.trim().to_string(),
            password: self.password_field(),
            is_active: self.is_active,
        })
    }

    /// Validate and build an update payload carrying every field.
    ///
    /// # Errors
    ///
    /// Returns every [`ValidationError`] found.
    pub fn to_patch(&self) -> Result<ServerPatch, Vec<ValidationError>> {
        let draft = self.to_draft()?;
        Ok(ServerPatch {
            name: Some(draft.name),
            host: Some(draft.host),
            port: Some(draft.port),
            database: Some(draft.database),
            username: Some(draft.username),
            password: draft.password,
            is_active: Some(draft.is_active),
        })
    }

    fn password_field(&self) -> Option<String> {
        (!self.password.is_empty()).then(|| self.password.clone())
    }
}

/// Raw input of the sign-in form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
}

impl LoginForm {
    /// Create a form from its two fields.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Validate both fields.
    ///
    /// # Errors
    ///
    /// Returns every [`ValidationError`] found.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.email.trim().is_empty() {
            errors.push(ValidationError::EmptyEmail);
        } else if !is_valid_email(&self.email) {
            errors.push(ValidationError::InvalidEmail);
        }
        if self.password.is_empty() {
            errors.push(ValidationError::EmptyPassword);
        }

        finish(errors)
    }
}

fn parse_port(raw: &str) -> Result<u16, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::MissingPort);
    }
    let port: u64 = raw.parse().map_err(|_| ValidationError::InvalidPort)?;
    match u16::try_from(port) {
        Ok(0) => Err(ValidationError::PortTooLow),
        Ok(port) => Ok(port),
        Err(_) => Err(ValidationError::PortTooHigh),
    }
}

/// Basic email validation.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain must have at least one dot and no empty labels
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}
