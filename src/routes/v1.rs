use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers::file;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/files", file_routes())
}

fn file_routes() -> OpenApiRouter<AppState> {
    let file_system = OpenApiRouter::new()
        .routes(routes!(file::upload_to_file_system))
        .routes(routes!(
            file::download_from_file_system,
            file::delete_from_file_system
        ))
        .layer(file::upload_body_limit());

    let database = OpenApiRouter::new()
        .routes(routes!(file::upload_to_database))
        .routes(routes!(
            file::download_from_database,
            file::delete_from_database
        ))
        .layer(file::upload_body_limit());

    OpenApiRouter::new()
        .routes(routes!(file::list_files))
        .nest("/file-system", file_system)
        .nest("/database", database)
}
