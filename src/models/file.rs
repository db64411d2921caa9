use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::{file_on_database, file_on_file_system};

/// Response DTO for a filesystem-backed file.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileSystemFileResponse {
    pub id: i32,
    /// Filename without its extension.
    #[schema(example = "report")]
    pub name: String,
    /// Extension including the leading dot.
    #[schema(example = ".txt")]
    pub extension: String,
    /// MIME content type declared at upload time.
    #[schema(example = "text/plain")]
    pub content_type: String,
    pub description: String,
    /// Path of the on-disk artifact.
    pub file_path: String,
    pub created_on: DateTime<Utc>,
}

/// Response DTO for a database-backed file. The stored bytes are never
/// serialized into listings; only their length is reported.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DatabaseFileResponse {
    pub id: i32,
    /// Filename without its extension.
    #[schema(example = "report")]
    pub name: String,
    /// Extension including the leading dot.
    #[schema(example = ".txt")]
    pub extension: String,
    /// MIME content type declared at upload time.
    #[schema(example = "text/plain")]
    pub content_type: String,
    pub description: String,
    /// Size of the stored content in bytes.
    #[schema(example = 142857)]
    pub size: u64,
    pub created_on: DateTime<Utc>,
}

/// Response DTO for the combined listing of both file kinds.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileListingResponse {
    pub files_on_file_system: Vec<FileSystemFileResponse>,
    pub files_on_database: Vec<DatabaseFileResponse>,
    /// One-shot status message carried over from the preceding action's
    /// redirect, if any.
    pub message: Option<String>,
}

impl From<file_on_file_system::Model> for FileSystemFileResponse {
    fn from(model: file_on_file_system::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            extension: model.extension,
            content_type: model.content_type,
            description: model.description,
            file_path: model.file_path,
            created_on: model.created_on,
        }
    }
}

impl From<file_on_database::Model> for DatabaseFileResponse {
    fn from(model: file_on_database::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            extension: model.extension,
            content_type: model.content_type,
            description: model.description,
            size: model.data.len() as u64,
            created_on: model.created_on,
        }
    }
}
