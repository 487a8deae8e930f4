// tests/api.rs
use anyhow::Result;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header as JwtHeader};
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jobhunt::auth::{AuthConfig, Claims};
use jobhunt::build_rocket;
use jobhunt::core::{ConfigManager, Database};
use jobhunt::documents::{DocumentBackend, GeneratedDocument};
use jobhunt::llm::{AssistantBackend, ChatRequest, LanguageModel};
use jobhunt::models::{AssistantSpec, NewJob};
use jobhunt::repository::JobRepository;
use jobhunt::scrape::{ListingSource, RawListing, SearchQuery};
use jobhunt::services::AppState;

const SECRET: &str = "test-secret";
const PROJECT: &str = "jobhunt-test";
const ADMIN: &str = "admin@example.com";

struct ScriptedModel;

#[rocket::async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let system = request
            .messages
            .first()
            .map(|m| m.content.to_lowercase())
            .unwrap_or_default();
        if system.contains("cover letter") {
            Ok("Dear hiring team,\n\nI would love to join you.\n".to_string())
        } else {
            Ok(r#"{"ranking": "strong", "score": 86, "reasoning": "Solid Rust background"}"#
                .to_string())
        }
    }
}

#[derive(Default)]
struct CountingAssistants {
    next: AtomicUsize,
}

impl CountingAssistants {
    fn id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.next.fetch_add(1, Ordering::SeqCst))
    }
}

#[rocket::async_trait]
impl AssistantBackend for CountingAssistants {
    async fn create_assistant(&self, _spec: &AssistantSpec) -> Result<String> {
        Ok(self.id("asst"))
    }
    async fn update_assistant(&self, _assistant_id: &str, _spec: &AssistantSpec) -> Result<()> {
        Ok(())
    }
    async fn delete_assistant(&self, _assistant_id: &str) -> Result<()> {
        Ok(())
    }
    async fn create_vector_store(&self, _name: &str) -> Result<String> {
        Ok(self.id("vs"))
    }
    async fn upload_file(&self, _file_name: &str, _bytes: Vec<u8>) -> Result<String> {
        Ok(self.id("file"))
    }
    async fn attach_file(&self, _vector_store_id: &str, _file_id: &str) -> Result<()> {
        Ok(())
    }
    async fn delete_file(&self, _file_id: &str) -> Result<()> {
        Ok(())
    }
}

struct LocalDocuments;

#[rocket::async_trait]
impl DocumentBackend for LocalDocuments {
    async fn create_document(&self, _title: &str, _content: &str) -> Result<GeneratedDocument> {
        Ok(GeneratedDocument {
            id: "doc_1".to_string(),
            url: "https://docs.test/doc_1".to_string(),
        })
    }
    async fn delete_document(&self, _document_id: &str) -> Result<()> {
        Ok(())
    }
}

struct EmptySite;

#[rocket::async_trait]
impl ListingSource for EmptySite {
    async fn fetch_page(&self, _query: &SearchQuery, _page: u32) -> Result<Vec<RawListing>> {
        Ok(Vec::new())
    }
    async fn fetch_description(&self, _url: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

fn test_config(require_beta_approval: bool) -> ConfigManager {
    let mut config = ConfigManager::default();
    config.auth.firebase_project_id = PROJECT.to_string();
    config.auth.shared_secret = Some(SECRET.to_string());
    config.auth.admin_emails = vec![ADMIN.to_string()];
    config.auth.require_beta_approval = require_beta_approval;
    config.scraper.page_delay_ms = 0;
    config
}

async fn client_with(require_beta_approval: bool) -> (Client, Database) {
    let config = test_config(require_beta_approval);
    let db = Database::in_memory().await.unwrap();

    let auth = AuthConfig::from_settings(&config.auth);
    let state = AppState::new(
        config,
        db.clone(),
        Arc::new(ScriptedModel),
        Arc::new(CountingAssistants::default()),
        Arc::new(LocalDocuments),
        Arc::new(EmptySite),
    );

    let client = Client::tracked(build_rocket(state, auth)).await.unwrap();
    (client, db)
}

async fn client() -> (Client, Database) {
    client_with(false).await
}

fn token_for(uid: &str, email: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        aud: PROJECT.to_string(),
        iss: format!("https://securetoken.google.com/{}", PROJECT),
        sub: uid.to_string(),
        email: email.to_string(),
        name: Some(uid.to_string()),
        picture: None,
        email_verified: true,
        exp: (now + 3600) as usize,
        iat: now as usize,
    };
    encode(
        &JwtHeader::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn bearer(uid: &str, email: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", token_for(uid, email)))
}

async fn body(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().await.unwrap()
}

async fn seed_job(db: &Database, url: &str, title: &str) -> i64 {
    JobRepository::new(db.pool())
        .insert(&NewJob {
            url: url.to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: Some("Remote".to_string()),
            salary: None,
            posted: None,
            snippet: Some("Build backend services in Rust".to_string()),
            description: None,
            source: "test".to_string(),
        })
        .await
        .unwrap()
        .unwrap()
}

#[rocket::async_test]
async fn health_is_public() {
    let (client, _db) = client().await;
    let response = client.get("/api/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body = body(response).await;
    assert_eq!(body["type"], "text");
    assert_eq!(body["message"], "OK");
}

#[rocket::async_test]
async fn me_requires_a_valid_token() {
    let (client, _db) = client().await;

    let response = client.get("/api/me").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    let error = body(response).await;
    assert_eq!(error["success"], false);
    assert_eq!(error["error_code"], "UNAUTHORIZED");
    assert_eq!(error["error"], "Authorization token required");

    let response = client
        .get("/api/me")
        .header(Header::new("Authorization", "Bearer not-a-token"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/api/me")
        .header(bearer("u1", "Ada@Example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let me = body(response).await;
    assert_eq!(me["data"]["uid"], "u1");
    assert_eq!(me["data"]["is_admin"], false);
    assert_eq!(me["data"]["has_resume"], false);
}

#[rocket::async_test]
async fn beta_gate_blocks_until_approved() {
    let (client, _db) = client_with(true).await;

    let response = client
        .get("/api/me")
        .header(bearer("u2", "bob@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    assert_eq!(body(response).await["error_code"], "FORBIDDEN");

    let response = client
        .post("/api/beta-requests")
        .header(ContentType::JSON)
        .body(json!({"email": "Bob@Example.com", "reason": "Looking for work"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let request_id = body(response).await["data"]["id"].as_i64().unwrap();

    // Non-admins cannot decide
    let response = client
        .patch(format!("/api/beta-requests/{}", request_id))
        .header(bearer("u2", "bob@example.com"))
        .header(ContentType::JSON)
        .body(json!({"status": "approved"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .patch(format!("/api/beta-requests/{}", request_id))
        .header(bearer("admin", ADMIN))
        .header(ContentType::JSON)
        .body(json!({"status": "approved"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response).await["data"]["status"], "approved");

    let response = client
        .get("/api/beta-requests?status=approved")
        .header(bearer("admin", ADMIN))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response).await["data"].as_array().unwrap().len(), 1);

    let response = client
        .get("/api/me")
        .header(bearer("u2", "bob@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
}

#[rocket::async_test]
async fn jobs_can_be_listed_and_annotated() {
    let (client, db) = client().await;
    let first = seed_job(&db, "https://jobs.test/1", "Rust Engineer").await;
    seed_job(&db, "https://jobs.test/2", "Data Analyst").await;
    let auth = bearer("u3", "carol@example.com");

    let response = client.get("/api/jobs").header(auth.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response).await["data"]["total"], 2);

    let response = client
        .patch(format!("/api/jobs/{}/preference", first))
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"starred": true, "status": "applied", "conversation_id": "c-9"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated = body(response).await;
    assert_eq!(updated["data"]["starred"], true);
    assert_eq!(updated["conversation_id"], "c-9");

    let response = client
        .get("/api/jobs?starred=true")
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(body(response).await["data"]["total"], 1);

    let response = client.get("/api/jobs/stats").header(auth.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response).await["data"]["starred"], 1);

    let response = client.get("/api/jobs/9999").header(auth.clone()).dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    assert_eq!(body(response).await["error_code"], "NOT_FOUND");

    let response = client
        .get("/api/jobs?sort=sideways")
        .header(auth)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn ranking_needs_a_resume_then_caches() {
    let (client, db) = client().await;
    let job = seed_job(&db, "https://jobs.test/rank", "Rust Engineer").await;
    let auth = bearer("u4", "dan@example.com");

    let response = client
        .post(format!("/api/jobs/{}/rank", job))
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    assert_eq!(body(response).await["error_code"], "PROFILE_INCOMPLETE");

    let response = client
        .put("/api/profile")
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"resume_text": "Ten years of Rust and distributed systems"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .post(format!("/api/jobs/{}/rank?mode=sync", job))
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let ranked = body(response).await;
    assert_eq!(ranked["data"]["score"], 86);
    assert_eq!(ranked["data"]["ranking"], "strong");
    assert_eq!(ranked["data"]["cached"], false);

    let response = client
        .post(format!("/api/jobs/{}/rank", job))
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(body(response).await["data"]["cached"], true);

    let response = client
        .post(format!("/api/jobs/{}/rank?mode=batch", job))
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
    assert_eq!(body(response).await["error_code"], "NOT_RANKED");

    let response = client
        .post(format!("/api/jobs/{}/rank?mode=psychic", job))
        .header(auth)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn cover_letter_lifecycle() {
    let (client, db) = client().await;
    let job = seed_job(&db, "https://jobs.test/letter", "Rust Engineer").await;
    let auth = bearer("u5", "erin@example.com");

    client
        .put("/api/profile")
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"resume_text": "Rust, Postgres, Kubernetes"}).to_string())
        .dispatch()
        .await;

    let response = client
        .post(format!("/api/jobs/{}/cover-letters", job))
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"create_document": true}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let generated = body(response).await;
    let letter_id = generated["data"]["id"].as_i64().unwrap();
    assert!(generated["data"]["content"]
        .as_str()
        .unwrap()
        .starts_with("Dear hiring team"));
    assert_eq!(generated["data"]["document_url"], "https://docs.test/doc_1");

    let response = client
        .get(format!("/api/cover-letters?job_id={}", job))
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(body(response).await["data"].as_array().unwrap().len(), 1);

    let response = client
        .put(format!("/api/cover-letters/{}", letter_id))
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"content": "   "}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .put(format!("/api/cover-letters/{}", letter_id))
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"content": "Edited letter"}).to_string())
        .dispatch()
        .await;
    assert_eq!(body(response).await["data"]["content"], "Edited letter");

    // Another user cannot see it
    let response = client
        .get(format!("/api/cover-letters/{}", letter_id))
        .header(bearer("u6", "frank@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .delete(format!("/api/cover-letters/{}", letter_id))
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response).await["type"], "action");

    let response = client
        .get(format!("/api/cover-letters/{}", letter_id))
        .header(auth)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn assistant_can_be_saved_and_removed() {
    let (client, _db) = client().await;
    let auth = bearer("u7", "gail@example.com");

    let response = client.get("/api/assistant").header(auth.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert!(body(response).await["data"].is_null());

    let response = client
        .put("/api/assistant")
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"name": "Coach", "instructions": "Be concise", "temperature": 5.0}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .put("/api/assistant")
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"name": "Coach", "instructions": "Be concise"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response).await["data"]["name"], "Coach");

    let response = client.delete("/api/assistant").header(auth.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let response = client.delete("/api/assistant").header(auth).dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn scrape_start_is_admin_only() {
    let (client, _db) = client().await;

    let response = client
        .post("/api/scrape")
        .header(bearer("u8", "hank@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    assert_eq!(body(response).await["error"], "Administrator access required");

    let response = client
        .post("/api/scrape")
        .header(bearer("admin", ADMIN))
        .header(ContentType::JSON)
        .body(json!({"query": "rust", "max_pages": 1}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get("/api/scrape")
        .header(bearer("u8", "hank@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert!(body(response).await["data"]["run_id"].is_string());
}

#[rocket::async_test]
async fn preflight_and_unknown_routes() {
    let (client, _db) = client().await;

    let response = client.options("/api/jobs").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("*")
    );

    let response = client.get("/api/nowhere").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    assert_eq!(body(response).await["error_code"], "NOT_FOUND");
}

const BOUNDARY: &str = "jobhunt-upload-boundary";

fn multipart_file(file_name: &str, content: &[u8]) -> (Header<'static>, Vec<u8>) {
    let mut body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
        BOUNDARY, file_name
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let content_type = Header::new(
        "Content-Type",
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    (content_type, body)
}

#[rocket::async_test]
async fn documents_upload_list_and_delete() {
    let (client, _db) = client().await;
    let auth = bearer("u8", "hana@example.com");

    let (content_type, payload) = multipart_file("My Resume.txt", b"Rust engineer, ten years");
    let response = client
        .post("/api/documents")
        .header(auth.clone())
        .header(content_type)
        .body(payload)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let uploaded = body(response).await;
    let document_id = uploaded["data"]["id"].as_i64().unwrap();
    assert!(uploaded["data"]["file_name"].as_str().unwrap().ends_with(".txt"));
    assert_eq!(uploaded["data"]["size_bytes"], 24);

    let (content_type, payload) = multipart_file("payload.exe", b"MZ");
    let response = client
        .post("/api/documents")
        .header(auth.clone())
        .header(content_type)
        .body(payload)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(body(response).await["error_code"], "BAD_REQUEST");

    let response = client.get("/api/documents").header(auth.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let listed = body(response).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["id"], document_id);

    // Another user cannot remove it
    let response = client
        .delete(format!("/api/documents/{}", document_id))
        .header(bearer("u9", "ivan@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .delete(format!("/api/documents/{}", document_id))
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response).await["action"], "deleted");

    let response = client.get("/api/documents").header(auth).dispatch().await;
    assert!(body(response).await["data"].as_array().unwrap().is_empty());
}

#[rocket::async_test]
async fn oversized_upload_is_refused() {
    let (client, _db) = client().await;
    let auth = bearer("u10", "jo@example.com");

    let (content_type, payload) = multipart_file("huge.txt", &vec![b'a'; 10 * 1024 * 1024 + 1]);
    let response = client
        .post("/api/documents")
        .header(auth.clone())
        .header(content_type)
        .body(payload)
        .dispatch()
        .await;
    assert_ne!(response.status(), Status::Ok);
    assert_eq!(response.status().class(), rocket::http::StatusClass::ClientError);

    let response = client.get("/api/documents").header(auth).dispatch().await;
    assert!(body(response).await["data"].as_array().unwrap().is_empty());
}

#[rocket::async_test]
async fn batch_ranking_runs_in_background() {
    let (client, db) = client().await;
    let job = seed_job(&db, "https://jobs.test/batch", "Rust Engineer").await;
    let auth = bearer("u11", "kim@example.com");

    let response = client
        .post("/api/jobs/rank-batch")
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    assert_eq!(body(response).await["error_code"], "PROFILE_INCOMPLETE");

    client
        .put("/api/profile")
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"resume_text": "Rust services at scale"}).to_string())
        .dispatch()
        .await;

    let response = client
        .post("/api/jobs/rank-batch")
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let started = body(response).await;
    assert!(started["data"]["run_id"].is_string());

    let mut status = Value::Null;
    for _ in 0..100 {
        let response = client
            .get("/api/jobs/rank-batch")
            .header(auth.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        status = body(response).await["data"].clone();
        if status["running"] == false {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(status["running"], false);
    assert_eq!(status["ranked"], 1);
    assert_eq!(status["failed"], 0);

    let response = client
        .post(format!("/api/jobs/{}/rank?mode=batch", job))
        .header(auth)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let ranked = body(response).await;
    assert_eq!(ranked["data"]["score"], 86);
    assert_eq!(ranked["data"]["cached"], true);
}

#[rocket::async_test]
async fn cover_letter_can_be_exported_later() {
    let (client, db) = client().await;
    let job = seed_job(&db, "https://jobs.test/export", "Rust Engineer").await;
    let auth = bearer("u12", "lee@example.com");

    client
        .put("/api/profile")
        .header(auth.clone())
        .header(ContentType::JSON)
        .body(json!({"resume_text": "Rust and SQL"}).to_string())
        .dispatch()
        .await;

    let response = client
        .post(format!("/api/jobs/{}/cover-letters", job))
        .header(auth.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let generated = body(response).await;
    let letter_id = generated["data"]["id"].as_i64().unwrap();
    assert!(generated["data"]["document_url"].is_null());

    let response = client
        .post(format!("/api/cover-letters/{}/document", letter_id))
        .header(bearer("u13", "max@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .post(format!("/api/cover-letters/{}/document", letter_id))
        .header(auth)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let exported = body(response).await;
    assert_eq!(exported["data"]["document_id"], "doc_1");
    assert_eq!(exported["data"]["document_url"], "https://docs.test/doc_1");
}
