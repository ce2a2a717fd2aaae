use axum::response::Redirect;

/// Redirect the root URL to the API documentation
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 307, description = "Redirect to /docs")
    ),
    tag = "docs"
)]
pub async fn redirect_root_to_docs() -> Redirect {
    Redirect::temporary("/docs")
}
