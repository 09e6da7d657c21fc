/// Site content endpoints under /api/content
///
/// Reads of published material are public; every write and the client and
/// inquiry listings require an admin. The contact form is the one public write.
use crate::{
    api::{middleware::JsonBody, MessageResponse},
    auth::AdminUser,
    content::{
        models::{
            Client, ClientStatus, Faq, Inquiry, InquiryStatus, NewsCategory, NewsItem, Priority,
            Service, TeamMember,
        },
        parse_document, Document, Stored,
    },
    context::AppContext,
    error::{CmsError, CmsResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

/// Service fields an update may touch
const SERVICE_UPDATABLE: &[&str] = &["title", "description", "details", "icon", "isActive", "order"];

/// Build content routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/services", get(list_services).post(create_service))
        .route(
            "/services/:id",
            get(get_service).put(update_service).delete(delete_service),
        )
        .route("/team", get(list_team).post(create_document::<TeamMember>))
        .route(
            "/team/:id",
            get(get_team_member)
                .put(update_document::<TeamMember>)
                .delete(delete_document::<TeamMember>),
        )
        .route("/news", get(list_news).post(create_news))
        .route(
            "/news/:id",
            get(get_news)
                .put(update_document::<NewsItem>)
                .delete(delete_document::<NewsItem>),
        )
        .route("/faq", get(list_faq).post(create_document::<Faq>))
        .route(
            "/faq/:id",
            get(get_faq)
                .put(update_document::<Faq>)
                .delete(delete_document::<Faq>),
        )
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/:id",
            get(get_client)
                .put(update_document::<Client>)
                .delete(delete_document::<Client>),
        )
        .route("/inquiries", get(list_inquiries).post(submit_inquiry))
        .route(
            "/inquiries/:id",
            get(get_inquiry)
                .put(update_inquiry)
                .delete(delete_document::<Inquiry>),
        )
}

/// Query-string filters shared by the list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewsPage {
    pub news: Vec<Stored<NewsItem>>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InquiryReceipt {
    pub message: String,
    pub id: String,
}

fn not_found<T: Document>() -> CmsError {
    CmsError::NotFound(format!("{} not found", T::LABEL))
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an enum-valued filter by its wire name
fn parse_filter<E: DeserializeOwned>(field: &str, raw: Option<&str>) -> CmsResult<Option<E>> {
    match non_blank(raw) {
        None => Ok(None),
        Some(value) => serde_json::from_value(Value::String(value.to_string()))
            .map(Some)
            .map_err(|_| CmsError::Validation(format!("Invalid {} filter: {}", field, value))),
    }
}

fn parse_positive(field: &str, raw: Option<&str>, default: usize) -> CmsResult<usize> {
    match non_blank(raw) {
        None => Ok(default),
        Some(value) => value
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                CmsError::Validation(format!("{} must be a positive integer", field))
            }),
    }
}

async fn create_document<T: Document>(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<Value>,
) -> CmsResult<(StatusCode, Json<Stored<T>>)> {
    let doc = parse_document::<T>(body)?;
    let stored = ctx.content.insert(doc).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_document<T: Document>(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CmsResult<Json<Stored<T>>> {
    let stored = ctx.content.get::<T>(&id).await?.ok_or_else(not_found::<T>)?;
    Ok(Json(stored))
}

async fn update_document<T: Document>(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<Value>,
) -> CmsResult<Json<Stored<T>>> {
    let updated = ctx
        .content
        .patch::<T>(&id, patch)
        .await?
        .ok_or_else(not_found::<T>)?;
    Ok(Json(updated))
}

async fn delete_document<T: Document>(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> CmsResult<Json<MessageResponse>> {
    if !ctx.content.delete::<T>(&id).await? {
        return Err(not_found::<T>());
    }
    tracing::info!("{} deleted {} {}", admin.username, T::COLLECTION, id);
    Ok(Json(MessageResponse::new(format!("{} deleted", T::LABEL))))
}

// Services are addressed by their serviceId slug for writes

async fn list_services(State(ctx): State<AppContext>) -> CmsResult<Json<Vec<Stored<Service>>>> {
    let mut services: Vec<_> = ctx
        .content
        .list::<Service>()
        .await?
        .into_iter()
        .filter(|s| s.doc.is_active)
        .collect();
    services.sort_by_key(|s| s.doc.order);
    Ok(Json(services))
}

async fn find_service(ctx: &AppContext, service_id: &str) -> CmsResult<Option<Stored<Service>>> {
    let service_id = service_id.to_string();
    ctx.content
        .find::<Service>(move |s| s.service_id == service_id)
        .await
}

/// Looks up by document id, then by serviceId
async fn get_service(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CmsResult<Json<Stored<Service>>> {
    if let Some(service) = ctx.content.get::<Service>(&id).await? {
        return Ok(Json(service));
    }
    let service = find_service(&ctx, &id)
        .await?
        .ok_or_else(not_found::<Service>)?;
    Ok(Json(service))
}

async fn create_service(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<Value>,
) -> CmsResult<(StatusCode, Json<Stored<Service>>)> {
    let service = parse_document::<Service>(body)?;
    if find_service(&ctx, &service.service_id).await?.is_some() {
        return Err(CmsError::Conflict(
            "Service with this serviceId already exists".to_string(),
        ));
    }

    let stored = ctx.content.insert(service).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn update_service(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path(service_id): Path<String>,
    JsonBody(patch): JsonBody<Value>,
) -> CmsResult<Json<Stored<Service>>> {
    let Value::Object(fields) = patch else {
        return Err(CmsError::Validation(
            "Update body must be a JSON object".to_string(),
        ));
    };
    let allowed: Map<String, Value> = fields
        .into_iter()
        .filter(|(key, _)| SERVICE_UPDATABLE.contains(&key.as_str()))
        .collect();

    let current = find_service(&ctx, &service_id)
        .await?
        .ok_or_else(not_found::<Service>)?;
    let updated = ctx
        .content
        .patch::<Service>(&current.id, Value::Object(allowed))
        .await?
        .ok_or_else(not_found::<Service>)?;
    Ok(Json(updated))
}

async fn delete_service(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(service_id): Path<String>,
) -> CmsResult<Json<MessageResponse>> {
    let current = find_service(&ctx, &service_id)
        .await?
        .ok_or_else(not_found::<Service>)?;
    ctx.content.delete::<Service>(&current.id).await?;
    tracing::info!("{} deleted service {}", admin.username, service_id);
    Ok(Json(MessageResponse::new("Service deleted")))
}

async fn list_team(State(ctx): State<AppContext>) -> CmsResult<Json<Vec<Stored<TeamMember>>>> {
    let mut team: Vec<_> = ctx
        .content
        .list::<TeamMember>()
        .await?
        .into_iter()
        .filter(|m| m.doc.is_active)
        .collect();
    team.sort_by_key(|m| m.doc.order);
    Ok(Json(team))
}

/// Inactive members read as missing
async fn get_team_member(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CmsResult<Json<Stored<TeamMember>>> {
    let member = ctx
        .content
        .get::<TeamMember>(&id)
        .await?
        .filter(|m| m.doc.is_active)
        .ok_or_else(not_found::<TeamMember>)?;
    Ok(Json(member))
}

async fn list_news(
    State(ctx): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> CmsResult<Json<NewsPage>> {
    let limit = parse_positive("limit", query.limit.as_deref(), DEFAULT_PAGE_SIZE)?.min(MAX_PAGE_SIZE);
    let page = parse_positive("page", query.page.as_deref(), 1)?;
    let category: Option<NewsCategory> = parse_filter("category", query.category.as_deref())?;

    let mut news: Vec<_> = ctx
        .content
        .list::<NewsItem>()
        .await?
        .into_iter()
        .filter(|n| n.doc.is_published)
        .filter(|n| category.map_or(true, |c| n.doc.category == c))
        .collect();
    news.sort_by(|a, b| b.doc.date.cmp(&a.doc.date));

    let total = news.len();
    let news = news
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    Ok(Json(NewsPage {
        news,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
        },
    }))
}

/// Public read that counts a view
async fn get_news(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CmsResult<Json<Stored<NewsItem>>> {
    let mut item = ctx
        .content
        .get::<NewsItem>(&id)
        .await?
        .ok_or_else(not_found::<NewsItem>)?;
    item.doc.views += 1;
    ctx.content.save(&mut item).await?;
    Ok(Json(item))
}

async fn create_news(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    JsonBody(body): JsonBody<Value>,
) -> CmsResult<(StatusCode, Json<Stored<NewsItem>>)> {
    let mut item = parse_document::<NewsItem>(body)?;
    item.author = Some(admin.id);
    item.views = 0;

    let stored = ctx.content.insert(item).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_faq(
    State(ctx): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> CmsResult<Json<Vec<Stored<Faq>>>> {
    let category = non_blank(query.category.as_deref());

    let mut faq: Vec<_> = ctx
        .content
        .list::<Faq>()
        .await?
        .into_iter()
        .filter(|f| f.doc.is_published)
        .filter(|f| category.map_or(true, |c| f.doc.category == c))
        .collect();
    // Stable sort keeps newest first within one order value
    faq.sort_by_key(|f| f.doc.order);
    Ok(Json(faq))
}

async fn get_faq(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CmsResult<Json<Stored<Faq>>> {
    let faq = ctx
        .content
        .get::<Faq>(&id)
        .await?
        .filter(|f| f.doc.is_published)
        .ok_or_else(not_found::<Faq>)?;
    Ok(Json(faq))
}

async fn list_clients(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> CmsResult<Json<Vec<Stored<Client>>>> {
    let status: Option<ClientStatus> = parse_filter("status", query.status.as_deref())?;
    let search = non_blank(query.search.as_deref()).map(str::to_lowercase);

    let matches_search = |client: &Client| {
        let Some(needle) = &search else {
            return true;
        };
        [
            Some(client.name.as_str()),
            Some(client.email.as_str()),
            client.company.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle.as_str()))
    };

    let clients = ctx
        .content
        .list::<Client>()
        .await?
        .into_iter()
        .filter(|c| status.map_or(true, |s| c.doc.status == s))
        .filter(|c| matches_search(&c.doc))
        .collect();
    Ok(Json(clients))
}

async fn get_client(
    state: State<AppContext>,
    _admin: AdminUser,
    path: Path<String>,
) -> CmsResult<Json<Stored<Client>>> {
    get_document::<Client>(state, path).await
}

async fn create_client(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    JsonBody(body): JsonBody<Value>,
) -> CmsResult<(StatusCode, Json<Stored<Client>>)> {
    let mut client = parse_document::<Client>(body)?;
    client.assigned_to = Some(admin.id);

    let stored = ctx.content.insert(client).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_inquiries(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> CmsResult<Json<Vec<Stored<Inquiry>>>> {
    let status: Option<InquiryStatus> = parse_filter("status", query.status.as_deref())?;
    let priority: Option<Priority> = parse_filter("priority", query.priority.as_deref())?;

    let inquiries = ctx
        .content
        .list::<Inquiry>()
        .await?
        .into_iter()
        .filter(|i| status.map_or(true, |s| i.doc.status == s))
        .filter(|i| priority.map_or(true, |p| i.doc.priority == p))
        .collect();
    Ok(Json(inquiries))
}

async fn get_inquiry(
    state: State<AppContext>,
    _admin: AdminUser,
    path: Path<String>,
) -> CmsResult<Json<Stored<Inquiry>>> {
    get_document::<Inquiry>(state, path).await
}

/// Contact form submission
async fn submit_inquiry(
    State(ctx): State<AppContext>,
    JsonBody(body): JsonBody<Value>,
) -> CmsResult<(StatusCode, Json<InquiryReceipt>)> {
    let mut inquiry = parse_document::<Inquiry>(body)?;
    inquiry.reset_workflow();

    let stored = ctx.content.insert(inquiry).await?;
    tracing::info!("New inquiry {} from {}", stored.id, stored.doc.name);

    Ok((
        StatusCode::CREATED,
        Json(InquiryReceipt {
            message: "Inquiry submitted successfully".to_string(),
            id: stored.id,
        }),
    ))
}

async fn update_inquiry(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<Value>,
) -> CmsResult<Json<Stored<Inquiry>>> {
    let sets_status = patch.get("status").is_some();

    let mut updated = ctx
        .content
        .patch::<Inquiry>(&id, patch)
        .await?
        .ok_or_else(not_found::<Inquiry>)?;

    if sets_status && updated.doc.status.is_final() {
        updated.doc.resolved_at = Some(Utc::now());
        ctx.content.save(&mut updated).await?;
    }

    Ok(Json(updated))
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
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-for-testing-only-0123456789";

    struct TestApp {
        router: Router,
        admin: String,
        editor: String,
    }

    async fn setup() -> TestApp {
        let ctx = AppContext::new(ServerConfig::development(SECRET)).await.unwrap();

        let admin = ctx
            .users
            .insert(NewUser {
                username: "admin".to_string(),
                email: "admin@x.com".to_string(),
                password_hash: "unused".to_string(),
                role: Role::Admin,
            })
            .await
            .unwrap();
        let editor = ctx
            .users
            .insert(NewUser {
                username: "editor".to_string(),
                email: "editor@x.com".to_string(),
                password_hash: "unused".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();

        TestApp {
            admin: ctx
                .tokens
                .issue_access_token(&admin.id, &admin.username, admin.role)
                .unwrap(),
            editor: ctx
                .tokens
                .issue_access_token(&editor.id, &editor.username, editor.role)
                .unwrap(),
            router: build_router(ctx),
        }
    }

    impl TestApp {
        async fn call(
            &self,
            method: &str,
            uri: &str,
            body: Option<Value>,
            token: Option<&str>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let body = match body {
                Some(v) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(v.to_string())
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
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let token = self.admin.clone();
            self.call(method, uri, body, Some(&token)).await
        }
    }

    #[tokio::test]
    async fn test_writes_require_admin() {
        let app = setup().await;
        let faq = json!({ "question": "Q", "answer": "A" });

        let (status, _) = app.call("POST", "/api/content/faq", Some(faq.clone()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let editor = app.editor.clone();
        let (status, body) = app
            .call("POST", "/api/content/faq", Some(faq.clone()), Some(&editor))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Forbidden");

        let (status, body) = app.admin("POST", "/api/content/faq", Some(faq)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["question"], "Q");
        assert!(body["id"].is_string());
    }

    #[tokio::test]
    async fn test_services_crud_by_service_id() {
        let app = setup().await;
        let audit = json!({
            "serviceId": "audit",
            "title": "Audit",
            "description": "Annual audit",
            "order": 2
        });
        let payroll = json!({
            "serviceId": "payroll",
            "title": "Payroll",
            "description": "Salary accounting",
            "order": 1
        });

        let (status, created) = app.admin("POST", "/api/content/services", Some(audit.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        app.admin("POST", "/api/content/services", Some(payroll)).await;

        let (status, _) = app.admin("POST", "/api/content/services", Some(audit)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, list) = app.call("GET", "/api/content/services", None, None).await;
        let ids: Vec<_> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["serviceId"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["payroll", "audit"]);

        let uri = format!("/api/content/services/{}", created["id"].as_str().unwrap());
        let (status, _) = app.call("GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, updated) = app
            .admin(
                "PUT",
                "/api/content/services/audit",
                Some(json!({ "isActive": false, "serviceId": "renamed" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["serviceId"], "audit");
        assert_eq!(updated["isActive"], false);

        let (_, list) = app.call("GET", "/api/content/services", None, None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, body) = app.admin("DELETE", "/api/content/services/audit", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Service deleted");

        let (status, _) = app.admin("DELETE", "/api/content/services/audit", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_news_pagination_and_views() {
        let app = setup().await;
        for (i, category) in ["News", "Analytics", "News"].iter().enumerate() {
            let (status, _) = app
                .admin(
                    "POST",
                    "/api/content/news",
                    Some(json!({
                        "title": format!("Item {}", i),
                        "summary": "Summary",
                        "category": category,
                        "date": format!("2024-0{}-01T00:00:00Z", i + 1)
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }
        app.admin(
            "POST",
            "/api/content/news",
            Some(json!({ "title": "Draft", "summary": "s", "isPublished": false })),
        )
        .await;

        let (status, page) = app
            .call("GET", "/api/content/news?limit=2&page=1", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["pagination"]["total"], 3);
        assert_eq!(page["pagination"]["pages"], 2);
        assert_eq!(page["news"][0]["title"], "Item 2");
        assert_eq!(page["news"].as_array().unwrap().len(), 2);

        let (_, page) = app
            .call("GET", "/api/content/news?category=News", None, None)
            .await;
        assert_eq!(page["pagination"]["total"], 2);

        let (status, _) = app
            .call("GET", "/api/content/news?category=Gossip", None, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.call("GET", "/api/content/news?limit=0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let id = page["news"][0]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/content/news/{}", id);
        app.call("GET", &uri, None, None).await;
        let (_, item) = app.call("GET", &uri, None, None).await;
        assert_eq!(item["views"], 2);
        assert!(item["author"].is_string());
    }

    #[tokio::test]
    async fn test_clients_search_is_admin_only() {
        let app = setup().await;
        app.admin(
            "POST",
            "/api/content/clients",
            Some(json!({ "name": "Romashka", "email": "info@romashka.ru", "company": "Romashka LLC" })),
        )
        .await;
        let (_, created) = app
            .admin(
                "POST",
                "/api/content/clients",
                Some(json!({ "name": "Vasilek", "email": "hello@vasilek.ru", "status": "pending" })),
            )
            .await;
        assert!(created["assignedTo"].is_string());

        let (status, _) = app.call("GET", "/api/content/clients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, found) = app
            .admin("GET", "/api/content/clients?search=ROMASHKA", None)
            .await;
        assert_eq!(found.as_array().unwrap().len(), 1);

        let (_, pending) = app
            .admin("GET", "/api/content/clients?status=pending", None)
            .await;
        assert_eq!(pending[0]["name"], "Vasilek");

        let (status, _) = app
            .admin(
                "POST",
                "/api/content/clients",
                Some(json!({ "name": "Bad", "email": "bad@x.com", "inn": "123" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_inquiry_workflow() {
        let app = setup().await;

        let (status, receipt) = app
            .call(
                "POST",
                "/api/content/inquiries",
                Some(json!({
                    "name": "Ivan",
                    "email": "ivan@x.com",
                    "subject": "Bookkeeping",
                    "message": "Need help",
                    "status": "closed",
                    "notes": "sneaky"
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["message"], "Inquiry submitted successfully");
        let uri = format!("/api/content/inquiries/{}", receipt["id"].as_str().unwrap());

        let (_, inquiry) = app.admin("GET", &uri, None).await;
        assert_eq!(inquiry["status"], "pending");
        assert!(inquiry["notes"].is_null());

        let (status, updated) = app
            .admin("PUT", &uri, Some(json!({ "status": "resolved", "priority": "high" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(updated["resolvedAt"].is_string());

        let (_, high) = app
            .admin("GET", "/api/content/inquiries?priority=high", None)
            .await;
        assert_eq!(high.as_array().unwrap().len(), 1);

        let (status, _) = app
            .admin("PUT", &uri, Some(json!({ "status": "archived" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app.admin("DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Inquiry deleted");
    }

    #[tokio::test]
    async fn test_unknown_ids_are_404() {
        let app = setup().await;

        let (status, body) = app.call("GET", "/api/content/team/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Team member not found");

        let (status, _) = app
            .admin("PUT", "/api/content/faq/nope", Some(json!({ "answer": "x" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_hidden_items_are_404_by_id() {
        let app = setup().await;

        let (_, member) = app
            .admin(
                "POST",
                "/api/content/team",
                Some(json!({ "name": "Bo", "role": "Ops", "imageUrl": "/b.png", "isActive": false })),
            )
            .await;
        let uri = format!("/api/content/team/{}", member["id"].as_str().unwrap());
        let (status, body) = app.call("GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Team member not found");

        let (_, faq) = app
            .admin(
                "POST",
                "/api/content/faq",
                Some(json!({ "question": "Q", "answer": "A", "isPublished": false })),
            )
            .await;
        let faq_uri = format!("/api/content/faq/{}", faq["id"].as_str().unwrap());
        let (status, _) = app.call("GET", &faq_uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Publishing makes it readable
        let (status, _) = app
            .admin("PUT", &faq_uri, Some(json!({ "isPublished": true })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app.call("GET", &faq_uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question"], "Q");
    }
}
