use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Json, Redirect, Response};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use tracing::instrument;

use crate::entity::{file_on_database, file_on_file_system};
use crate::error::{AppError, ErrorBody};
use crate::models::file::{DatabaseFileResponse, FileListingResponse, FileSystemFileResponse};
use crate::state::AppState;
use crate::utils::filename::{split_name_extension, validate_flat_filename};

/// Absolute path of the listing endpoint, the redirect target for every
/// mutating operation.
const LISTING_ROUTE: &str = "/api/v1/files";

pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(128 * 1024 * 1024) // 128 MB
}

/// Query parameters accepted by the listing endpoint.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ListingQuery {
    /// One-shot status message set by the preceding action's redirect.
    pub message: Option<String>,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Files",
    operation_id = "listFiles",
    summary = "List all uploaded files",
    description = "Returns every filesystem-backed and database-backed file record, \
        together with the one-shot status message carried in the `message` query \
        parameter by the preceding action's redirect.",
    params(ListingQuery),
    responses(
        (status = 200, description = "Combined file listing", body = FileListingResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<FileListingResponse>, AppError> {
    let files_on_file_system = file_on_file_system::Entity::find()
        .order_by_asc(file_on_file_system::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(FileSystemFileResponse::from)
        .collect();

    let files_on_database = file_on_database::Entity::find()
        .order_by_asc(file_on_database::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(DatabaseFileResponse::from)
        .collect();

    Ok(Json(FileListingResponse {
        files_on_file_system,
        files_on_database,
        message: query.message,
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Files",
    operation_id = "uploadToFileSystem",
    summary = "Upload files to the filesystem target",
    description = "Accepts one or more `files` multipart fields plus a shared \
        `description` field. Each file is written into the blob directory under its \
        original filename and a metadata record is inserted. A file whose name already \
        exists on disk is skipped entirely: same-named uploads are a no-op. Items are \
        persisted independently, so a failure partway leaves earlier items in place.",
    request_body(content_type = "multipart/form-data", description = "`files` fields plus `description`"),
    responses(
        (status = 303, description = "Redirect to the listing with a confirmation message"),
        (status = 400, description = "Malformed multipart body or unusable filename (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_to_file_system(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let form = read_upload_form(multipart).await?;

    tokio::fs::create_dir_all(&state.config.storage.files_dir).await?;
    // Records store absolute artifact paths; the record is the only index
    // back into the blob directory.
    let base_path = tokio::fs::canonicalize(&state.config.storage.files_dir).await?;

    for file in form.files {
        let filename = validate_flat_filename(&file.filename)
            .map_err(|e| AppError::Validation(e.message().into()))?
            .to_string();
        let file_path = base_path.join(&filename);

        // The filename is the on-disk identity: re-uploading a same-named
        // file skips both the disk write and the record insert.
        if tokio::fs::try_exists(&file_path).await? {
            tracing::debug!(filename = %filename, "artifact already on disk, skipping");
            continue;
        }

        tokio::fs::write(&file_path, &file.data).await?;

        let (name, extension) = split_name_extension(&filename);
        let record = file_on_file_system::ActiveModel {
            name: Set(name.to_string()),
            extension: Set(extension.to_string()),
            content_type: Set(file.content_type),
            description: Set(form.description.clone()),
            file_path: Set(file_path.to_string_lossy().into_owned()),
            created_on: Set(Utc::now()),
            ..Default::default()
        };
        record.insert(&state.db).await?;
    }

    Ok(redirect_with_message(
        "File successfully uploaded to file system.",
    ))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Files",
    operation_id = "uploadToDatabase",
    summary = "Upload files to the database target",
    description = "Accepts the same multipart shape as the filesystem upload but stores \
        each file's bytes inline in the database. No collision check: identical \
        filenames always create new records.",
    request_body(content_type = "multipart/form-data", description = "`files` fields plus `description`"),
    responses(
        (status = 303, description = "Redirect to the listing with a confirmation message"),
        (status = 400, description = "Malformed multipart body (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_to_database(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let form = read_upload_form(multipart).await?;

    for file in form.files {
        let (name, extension) = split_name_extension(&file.filename);
        let record = file_on_database::ActiveModel {
            name: Set(name.to_string()),
            extension: Set(extension.to_string()),
            content_type: Set(file.content_type),
            description: Set(form.description.clone()),
            data: Set(file.data.to_vec()),
            created_on: Set(Utc::now()),
            ..Default::default()
        };
        record.insert(&state.db).await?;
    }

    Ok(redirect_with_message(
        "File successfully uploaded to database.",
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Files",
    operation_id = "downloadFromFileSystem",
    summary = "Download a filesystem-backed file",
    description = "Reads the on-disk artifact behind the record into memory and returns \
        it with the stored content type and original filename.",
    params(("id" = i32, Path, description = "File record ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "No record with this ID (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn download_from_file_system(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let record = file_on_file_system::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    let data = tokio::fs::read(&record.file_path).await?;

    file_response(
        &record.content_type,
        &format!("{}{}", record.name, record.extension),
        data,
    )
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Files",
    operation_id = "downloadFromDatabase",
    summary = "Download a database-backed file",
    description = "Returns the stored bytes with the stored content type and original filename.",
    params(("id" = i32, Path, description = "File record ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "No record with this ID (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn download_from_database(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let record = file_on_database::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    file_response(
        &record.content_type,
        &format!("{}{}", record.name, record.extension),
        record.data,
    )
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Files",
    operation_id = "deleteFromFileSystem",
    summary = "Delete a filesystem-backed file",
    description = "Removes the on-disk artifact (if it still exists) and the record, \
        then redirects to the listing with a confirmation message.",
    params(("id" = i32, Path, description = "File record ID")),
    responses(
        (status = 303, description = "Redirect to the listing with a confirmation message"),
        (status = 404, description = "No record with this ID (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn delete_from_file_system(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    let record = file_on_file_system::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    // The artifact may already be gone out-of-band; that is not an error.
    if tokio::fs::try_exists(&record.file_path).await? {
        tokio::fs::remove_file(&record.file_path).await?;
    }

    file_on_file_system::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;

    Ok(redirect_with_message(&format!(
        "Removed {}{} successfully from file system.",
        record.name, record.extension
    )))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Files",
    operation_id = "deleteFromDatabase",
    summary = "Delete a database-backed file",
    description = "Removes the record, then redirects to the listing with a \
        confirmation message.",
    params(("id" = i32, Path, description = "File record ID")),
    responses(
        (status = 303, description = "Redirect to the listing with a confirmation message"),
        (status = 404, description = "No record with this ID (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn delete_from_database(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    let record = file_on_database::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    file_on_database::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;

    Ok(redirect_with_message(&format!(
        "Removed {}{} successfully from database.",
        record.name, record.extension
    )))
}

/// A single file extracted from the upload form.
struct UploadedFile {
    filename: String,
    content_type: String,
    data: Bytes,
}

/// The fully drained upload form. The `description` field may arrive after
/// the file parts, so the whole form is read before anything is persisted.
struct UploadForm {
    files: Vec<UploadedFile>,
    description: String,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut files = Vec::new();
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("files") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| {
                        AppError::Validation("File field must have a filename".into())
                    })?
                    .to_string();
                let declared = field.content_type().map(|m| m.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                let content_type = declared.unwrap_or_else(|| {
                    mime_guess::from_path(&filename)
                        .first_or_octet_stream()
                        .to_string()
                });
                files.push(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("description") => {
                description = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read description: {e}"))
                })?;
            }
            _ => {} // Ignore unknown fields.
        }
    }

    Ok(UploadForm { files, description })
}

/// 303 redirect to the listing, carrying the one-shot status message as a
/// query parameter. The message lives only in this redirect URL.
fn redirect_with_message(message: &str) -> Redirect {
    Redirect::to(&format!(
        "{LISTING_ROUTE}?message={}",
        urlencoding::encode(message)
    ))
}

/// Build a file download response from an in-memory buffer.
fn file_response(content_type: &str, filename: &str, data: Vec<u8>) -> Result<Response, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, data.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(filename),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
