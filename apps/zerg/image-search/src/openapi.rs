use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Image Search API",
        version = "0.1.0",
        description = "Index images with CLIP embeddings and find them with free-text queries"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/images", api = domain_images::ApiDoc),
        (path = "/storage", api = domain_images::StorageApiDoc)
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_contains_domain_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/images",
            "/images/{id}",
            "/images/searches/{id}",
            "/images/{id}/feedback",
            "/storage/{provider}/files/{key}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {} in {:?}",
                expected,
                paths
            );
        }
    }
}
