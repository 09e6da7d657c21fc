/// Image upload endpoints under /api/media
///
/// Every route requires an admin. Stored files are served back by the
/// `/uploads` static route.
use crate::{
    api::{middleware::FormData, MessageResponse},
    auth::AdminUser,
    context::AppContext,
    error::{CmsError, CmsResult},
    media::{MediaStore, StoredFile, UploadedFile},
};
use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build media routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/upload", post(upload_single))
        .route("/upload-multiple", post(upload_multiple))
        .route("/files", get(list_files))
        .route("/files/:filename", delete(delete_file))
        // Fields are read in capped chunks instead
        .layer(DefaultBodyLimit::disable())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: UploadedFile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadManyResponse {
    pub message: String,
    pub files: Vec<UploadedFile>,
}

/// One file part held in memory until the whole form has been checked
struct Part {
    field: String,
    original_name: String,
    mimetype: String,
    data: Vec<u8>,
}

fn form_error(e: axum::extract::multipart::MultipartError) -> CmsError {
    CmsError::Validation(format!("Malformed multipart body: {}", e))
}

async fn read_part(store: &MediaStore, mut field: Field<'_>) -> CmsResult<Part> {
    let name = field.name().unwrap_or_default().to_string();
    let original_name = field.file_name().unwrap_or_default().to_string();
    let mimetype = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    MediaStore::check_mimetype(&mimetype)?;

    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(form_error)? {
        if data.len() + chunk.len() > store.max_file_bytes() {
            return Err(store.too_large());
        }
        data.extend_from_slice(&chunk);
    }

    Ok(Part {
        field: name,
        original_name,
        mimetype,
        data,
    })
}

/// Collect file parts named `wanted`, at most `limit` of them
async fn read_files(
    store: &MediaStore,
    FormData(mut form): FormData,
    wanted: &str,
    limit: usize,
) -> CmsResult<Vec<Part>> {
    let mut parts = Vec::new();
    while let Some(field) = form.next_field().await.map_err(form_error)? {
        if field.name() != Some(wanted) || field.file_name().is_none() {
            continue;
        }
        if parts.len() == limit {
            return Err(CmsError::Validation(format!(
                "Too many files, at most {} per upload",
                limit
            )));
        }
        parts.push(read_part(store, field).await?);
    }
    Ok(parts)
}

async fn store_all(store: &MediaStore, parts: Vec<Part>) -> CmsResult<Vec<UploadedFile>> {
    let mut files = Vec::with_capacity(parts.len());
    for part in parts {
        files.push(
            store
                .save(&part.field, &part.original_name, &part.mimetype, &part.data)
                .await?,
        );
    }
    Ok(files)
}

/// Single image in the `image` field
async fn upload_single(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    form: FormData,
) -> CmsResult<(StatusCode, Json<UploadResponse>)> {
    let parts = read_files(&ctx.media, form, "image", 1).await?;
    if parts.is_empty() {
        return Err(CmsError::Validation("No file uploaded".to_string()));
    }

    let mut files = store_all(&ctx.media, parts).await?;
    let file = files.remove(0);
    tracing::info!("{} uploaded {}", admin.username, file.filename);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            file,
        }),
    ))
}

/// Up to the configured number of images in `images` fields
async fn upload_multiple(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    form: FormData,
) -> CmsResult<(StatusCode, Json<UploadManyResponse>)> {
    let parts = read_files(&ctx.media, form, "images", ctx.config.media.max_files).await?;
    if parts.is_empty() {
        return Err(CmsError::Validation("No files uploaded".to_string()));
    }

    let files = store_all(&ctx.media, parts).await?;
    tracing::info!("{} uploaded {} files", admin.username, files.len());

    Ok((
        StatusCode::CREATED,
        Json(UploadManyResponse {
            message: format!("{} files uploaded successfully", files.len()),
            files,
        }),
    ))
}

async fn list_files(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
) -> CmsResult<Json<Vec<StoredFile>>> {
    Ok(Json(ctx.media.list().await?))
}

async fn delete_file(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(filename): Path<String>,
) -> CmsResult<Json<MessageResponse>> {
    if !ctx.media.delete(&filename).await? {
        return Err(CmsError::NotFound("File not found".to_string()));
    }
    tracing::info!("{} deleted upload {}", admin.username, filename);
    Ok(Json(MessageResponse::new("File deleted successfully")))
}

#[cfg(test)]
mod tests {
    use crate::{
        config::ServerConfig,
        context::AppContext,
        db::account::{NewUser, Role},
        server::build_router,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-for-testing-only-0123456789";
    const BOUNDARY: &str = "cms-form-boundary";

    struct TestApp {
        router: Router,
        admin: String,
        editor: String,
        dir: TempDir,
    }

    async fn setup(max_file_bytes: usize) -> TestApp {
        let dir = TempDir::new().unwrap();
        let mut config = ServerConfig::development(SECRET);
        config.media.upload_dir = dir.path().join("uploads");
        config.media.max_file_bytes = max_file_bytes;
        config.media.max_files = 3;
        let ctx = AppContext::new(config).await.unwrap();

        let mut tokens = Vec::new();
        for (name, role) in [("admin", Role::Admin), ("editor", Role::User)] {
            let user = ctx
                .users
                .insert(NewUser {
                    username: name.to_string(),
                    email: format!("{}@x.com", name),
                    password_hash: "unused".to_string(),
                    role,
                })
                .await
                .unwrap();
            tokens.push(
                ctx.tokens
                    .issue_access_token(&user.id, &user.username, user.role)
                    .unwrap(),
            );
        }

        TestApp {
            router: build_router(ctx),
            editor: tokens.pop().unwrap(),
            admin: tokens.pop().unwrap(),
            dir,
        }
    }

    /// `(field, filename, content type, bytes)` parts as a form-data body
    fn form(parts: &[(&str, &str, &str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, filename, content_type, data) in parts {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    BOUNDARY, field, filename, content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(data.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    impl TestApp {
        async fn send(
            &self,
            method: &str,
            uri: &str,
            body: Option<Vec<u8>>,
            token: Option<&str>,
        ) -> (StatusCode, Vec<u8>) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let body = match body {
                Some(bytes) => {
                    builder = builder.header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", BOUNDARY),
                    );
                    Body::from(bytes)
                }
                None => Body::empty(),
            };

            let response = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, bytes.to_vec())
        }

        async fn admin(&self, method: &str, uri: &str, body: Option<Vec<u8>>) -> (StatusCode, Value) {
            let token = self.admin.clone();
            let (status, bytes) = self.send(method, uri, body, Some(&token)).await;
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    #[tokio::test]
    async fn test_upload_serve_list_delete() {
        let app = setup(1024).await;

        let body = form(&[("image", "logo.png", "image/png", "fake-png")]);
        let (status, created) = app.admin("POST", "/api/media/upload", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["message"], "File uploaded successfully");
        assert_eq!(created["file"]["originalName"], "logo.png");
        assert_eq!(created["file"]["mimetype"], "image/png");
        assert_eq!(created["file"]["size"], 8);

        let filename = created["file"]["filename"].as_str().unwrap().to_string();
        assert!(app.dir.path().join("uploads").join(&filename).exists());

        // Served back without credentials
        let path = created["file"]["path"].as_str().unwrap().to_string();
        let (status, bytes) = app.send("GET", &path, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"fake-png");

        let (status, listed) = app.admin("GET", "/api/media/files", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["filename"], filename.as_str());

        let uri = format!("/api/media/files/{}", filename);
        let (status, body) = app.admin("DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "File deleted successfully");

        let (status, body) = app.admin("DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "File not found");
    }

    #[tokio::test]
    async fn test_media_requires_admin() {
        let app = setup(1024).await;
        let body = form(&[("image", "logo.png", "image/png", "x")]);

        let (status, _) = app
            .send("POST", "/api/media/upload", Some(body.clone()), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let editor = app.editor.clone();
        let (status, _) = app
            .send("POST", "/api/media/upload", Some(body), Some(&editor))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.send("GET", "/api/media/files", None, Some(&editor)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let app = setup(16).await;

        let body = form(&[("image", "notes.txt", "text/plain", "hello")]);
        let (status, err) = app.admin("POST", "/api/media/upload", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["message"], "Only image files are allowed");

        let body = form(&[("image", "big.jpg", "image/jpeg", &"x".repeat(17))]);
        let (status, err) = app.admin("POST", "/api/media/upload", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"], "ValidationError");

        let body = form(&[("other", "a.png", "image/png", "x")]);
        let (status, err) = app.admin("POST", "/api/media/upload", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["message"], "No file uploaded");

        let (_, listed) = app.admin("GET", "/api/media/files", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_multiple() {
        let app = setup(1024).await;

        let body = form(&[
            ("images", "a.png", "image/png", "a"),
            ("images", "b.gif", "image/gif", "bb"),
        ]);
        let (status, created) = app
            .admin("POST", "/api/media/upload-multiple", Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["message"], "2 files uploaded successfully");
        assert_eq!(created["files"].as_array().unwrap().len(), 2);

        let too_many = form(&[
            ("images", "1.png", "image/png", "1"),
            ("images", "2.png", "image/png", "2"),
            ("images", "3.png", "image/png", "3"),
            ("images", "4.png", "image/png", "4"),
        ]);
        let (status, err) = app
            .admin("POST", "/api/media/upload-multiple", Some(too_many))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["message"], "Too many files, at most 3 per upload");

        // A rejected batch stores nothing
        let (_, listed) = app.admin("GET", "/api/media/files", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);

        let (status, err) = app
            .admin("POST", "/api/media/upload-multiple", Some(form(&[])))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["message"], "No files uploaded");
    }
}
