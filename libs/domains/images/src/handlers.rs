use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_helpers::{
    UuidPath, ValidatedJson, ValidatedQuery,
    errors::responses::{
        BadGatewayResponse, BadRequestUuidResponse, BadRequestValidationResponse,
        ConflictResponse, InternalServerErrorResponse, NotFoundResponse, PayloadTooLargeResponse,
    },
};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::error::{ImageError, ImageResult};
use crate::models::{
    FeedbackWithQuery, Image, ImageUpload, Rating, Search, SearchFeedback, SearchParams,
    SearchWithImage, SubmitFeedback,
};
use crate::repository::ImageRepository;
use crate::service::ImageService;
use crate::storage::sanitize_filename;

pub const TAG: &str = "images";
pub const STORAGE_TAG: &str = "storage";

/// Multipart form for `POST /images`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    /// Image file contents
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// OpenAPI documentation for the Images API
#[derive(OpenApi)]
#[openapi(
    paths(
        create_image,
        search_image,
        get_image,
        get_search_query,
        submit_feedback,
    ),
    components(
        schemas(
            Image,
            ImageUploadForm,
            Search,
            SearchWithImage,
            SearchFeedback,
            FeedbackWithQuery,
            SubmitFeedback,
            Rating
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            PayloadTooLargeResponse,
            BadGatewayResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Image indexing and text-to-image search")
    )
)]
pub struct ApiDoc;

/// OpenAPI documentation for blob downloads
#[derive(OpenApi)]
#[openapi(
    paths(download_object),
    components(responses(NotFoundResponse, BadGatewayResponse, InternalServerErrorResponse)),
    tags(
        (name = STORAGE_TAG, description = "Download stored image objects")
    )
)]
pub struct StorageApiDoc;

/// Create the images router. Request bodies are capped at `max_upload_bytes`.
pub fn router<R: ImageRepository + 'static>(
    service: ImageService<R>,
    max_upload_bytes: usize,
) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(search_image).post(create_image))
        .route("/{id}", get(get_image))
        .route("/searches/{id}", get(get_search_query))
        .route("/{id}/feedback", post(submit_feedback))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(shared_service)
}

/// Create the router that serves stored objects back by provider and key.
pub fn storage_router<R: ImageRepository + 'static>(service: ImageService<R>) -> Router {
    Router::new()
        .route("/{provider}/files/{*key}", get(download_object))
        .with_state(Arc::new(service))
}

fn multipart_error(err: MultipartError) -> ImageError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ImageError::UploadTooLarge(err.body_text())
    } else {
        ImageError::Validation(err.body_text())
    }
}

/// Pull the `file` field out of the form, ignoring any other fields.
async fn read_upload(multipart: &mut Multipart) -> ImageResult<ImageUpload> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(ImageUpload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(ImageError::Validation(
        "multipart field 'file' is required".to_string(),
    ))
}

/// Upload and index an image
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored and indexed", body = Image),
        (status = 400, response = BadRequestValidationResponse),
        (status = 413, response = PayloadTooLargeResponse),
        (status = 502, response = BadGatewayResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_image<R: ImageRepository>(
    State(service): State<Arc<ImageService<R>>>,
    mut multipart: Multipart,
) -> ImageResult<impl IntoResponse> {
    let upload = read_upload(&mut multipart).await?;
    let image = service.create_image(upload).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// Find the indexed image that best matches a text query
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(SearchParams),
    responses(
        (status = 200, description = "Closest image and the recorded search", body = SearchWithImage),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 502, response = BadGatewayResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_image<R: ImageRepository>(
    State(service): State<Arc<ImageService<R>>>,
    ValidatedQuery(params): ValidatedQuery<SearchParams>,
) -> ImageResult<Json<SearchWithImage>> {
    let result = service.search_image(&params.query).await?;
    Ok(Json(result))
}

/// Get an image by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image found", body = Image),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_image<R: ImageRepository>(
    State(service): State<Arc<ImageService<R>>>,
    UuidPath(id): UuidPath,
) -> ImageResult<Json<Image>> {
    let image = service.get_image(id).await?;
    Ok(Json(image))
}

/// Get a recorded search by ID
#[utoipa::path(
    get,
    path = "/searches/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Search query ID")
    ),
    responses(
        (status = 200, description = "Search found", body = SearchWithImage),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_search_query<R: ImageRepository>(
    State(service): State<Arc<ImageService<R>>>,
    UuidPath(id): UuidPath,
) -> ImageResult<Json<SearchWithImage>> {
    let search = service.get_search_query(id).await?;
    Ok(Json(search))
}

/// Rate the result of a search. Each search accepts one rating.
#[utoipa::path(
    post,
    path = "/{id}/feedback",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Search query ID")
    ),
    request_body = SubmitFeedback,
    responses(
        (status = 201, description = "Feedback recorded", body = FeedbackWithQuery),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn submit_feedback<R: ImageRepository>(
    State(service): State<Arc<ImageService<R>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<SubmitFeedback>,
) -> ImageResult<impl IntoResponse> {
    let feedback = service.submit_feedback(id, input.rating).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Download a stored object
#[utoipa::path(
    get,
    path = "/{provider}/files/{key}",
    tag = STORAGE_TAG,
    params(
        ("provider" = String, Path, description = "Storage provider name"),
        ("key" = String, Path, description = "Object key, may contain '/'")
    ),
    responses(
        (status = 200, description = "Object contents", content_type = "application/octet-stream"),
        (status = 404, response = NotFoundResponse),
        (status = 502, response = BadGatewayResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn download_object<R: ImageRepository>(
    State(service): State<Arc<ImageService<R>>>,
    Path((provider, key)): Path<(String, String)>,
) -> ImageResult<Response> {
    let object = service.download(&provider, &key).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&object.filename)
    );

    Ok((
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::CONTENT_LENGTH, object.content_length.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        object.bytes,
    )
        .into_response())
}
