//! Failure payloads from the data-access layer and their user-facing categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown for connectivity failures.
pub const CONNECTION_MESSAGE: &str = "Falha de conexão com o servidor.";
/// Message shown when the server denies the action.
pub const PERMISSION_MESSAGE: &str = "Você não tem permissão para executar esta ação.";
/// Message shown when a doctor cannot be removed because of linked records.
pub const MEDICO_LINKED_MESSAGE: &str =
    "Não é possível excluir este médico pois existem registros vinculados (pacientes ou exames)";
/// Message shown for any other referential conflict.
pub const LINKED_RECORDS_MESSAGE: &str =
    "A ação não pode ser concluída devido a registros vinculados.";
/// Message shown when nothing more specific is known.
pub const UNEXPECTED_MESSAGE: &str = "Ocorreu um erro inesperado. Tente novamente.";

/// A failed request as reported by the data-access layer.
///
/// Deserializes from the HTTP client's error shape:
///
/// ```json
/// { "response": { "status": 409, "data": { "message": "..." } }, "message": "..." }
/// ```
///
/// The backend message (`response.data.message`) takes precedence over the
/// client's own `message`; empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFailure")]
pub struct ApiFailure {
    /// HTTP status, if a response was received. `0` marks a network failure.
    pub status: Option<u16>,
    pub message: Option<String>,
}

impl ApiFailure {
    pub fn new(status: Option<u16>, message: Option<String>) -> Self {
        Self {
            status,
            message: message.filter(|m| !m.is_empty()),
        }
    }

    /// A failure with an HTTP status and no message.
    pub fn with_status(status: u16) -> Self {
        Self::new(Some(status), None)
    }

    /// A failure without any response, such as a refused connection.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(None, Some(message.into()))
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into()).filter(|m| !m.is_empty());
        self
    }

    /// Parses the client error shape from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The message text used for pattern matching, empty if absent.
    pub fn text(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.message) {
            (Some(status), Some(message)) => write!(f, "request failed ({}): {}", status, message),
            (Some(status), None) => write!(f, "request failed ({})", status),
            (None, Some(message)) => write!(f, "request failed: {}", message),
            (None, None) => f.write_str("request failed"),
        }
    }
}

impl std::error::Error for ApiFailure {}

#[derive(Deserialize)]
struct RawFailure {
    #[serde(default)]
    response: Option<RawResponse>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    data: Option<RawData>,
}

#[derive(Deserialize)]
struct RawData {
    #[serde(default)]
    message: Option<String>,
}

impl From<RawFailure> for ApiFailure {
    fn from(raw: RawFailure) -> Self {
        let (status, backend) = match raw.response {
            Some(response) => (
                response.status,
                response
                    .data
                    .and_then(|data| data.message)
                    .filter(|m| !m.is_empty()),
            ),
            None => (None, None),
        };
        ApiFailure::new(status, backend.or(raw.message))
    }
}

/// Record types managed by the administration screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Medico,
    Paciente,
    Exame,
    Usuario,
    Especialidade,
}

impl Entity {
    pub const ALL: [Entity; 5] = [
        Entity::Medico,
        Entity::Paciente,
        Entity::Exame,
        Entity::Usuario,
        Entity::Especialidade,
    ];

    /// Identifier used in configuration and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Medico => "medico",
            Entity::Paciente => "paciente",
            Entity::Exame => "exame",
            Entity::Usuario => "usuario",
            Entity::Especialidade => "especialidade",
        }
    }

    /// Display name shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Entity::Medico => "médico",
            Entity::Paciente => "paciente",
            Entity::Exame => "exame",
            Entity::Usuario => "usuário",
            Entity::Especialidade => "especialidade",
        }
    }

    pub fn not_found_message(&self) -> String {
        match self {
            Entity::Especialidade => format!("A {} não foi encontrada.", self.label()),
            _ => format!("O {} não foi encontrado.", self.label()),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown entity '{0}' (expected one of: medico, paciente, exame, usuario, especialidade)")]
pub struct UnknownEntity(pub String);

impl FromStr for Entity {
    type Err = UnknownEntity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Entity::ALL
            .into_iter()
            .find(|entity| entity.as_str() == wanted)
            .ok_or_else(|| UnknownEntity(s.to_string()))
    }
}

/// Outcome of classifying an [`ApiFailure`], in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Status 0 or a connectivity message.
    Connection,
    /// Status 403 or a permission message.
    PermissionDenied,
    /// Status 404.
    NotFound,
    /// Status 409 or a message about linked records.
    Conflict,
    /// Any other message supplied by the backend, shown verbatim.
    Backend(String),
    /// Nothing usable in the failure.
    Unexpected,
}

impl ErrorCategory {
    /// Short name for logs and terminal output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Connection => "connection",
            ErrorCategory::PermissionDenied => "permission_denied",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Backend(_) => "backend",
            ErrorCategory::Unexpected => "unexpected",
        }
    }

    /// The user-facing message for this category.
    pub fn user_message(&self, entity: Option<Entity>) -> String {
        match self {
            ErrorCategory::Connection => CONNECTION_MESSAGE.to_string(),
            ErrorCategory::PermissionDenied => PERMISSION_MESSAGE.to_string(),
            ErrorCategory::NotFound => match entity {
                Some(entity) => entity.not_found_message(),
                None => "O registro não foi encontrado.".to_string(),
            },
            ErrorCategory::Conflict => match entity {
                Some(Entity::Medico) => MEDICO_LINKED_MESSAGE.to_string(),
                _ => LINKED_RECORDS_MESSAGE.to_string(),
            },
            ErrorCategory::Backend(message) => message.clone(),
            ErrorCategory::Unexpected => UNEXPECTED_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
