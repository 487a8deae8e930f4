// src/web/mod.rs
pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use anyhow::Result;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::form::Form;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{
    catch, catchers, delete, get, options, patch, post, put, routes, Build, Request, Response,
    Rocket, State,
};
use tracing::{error, info, warn};

use crate::auth::{AdminUser, AuthConfig, AuthFailure, AuthenticatedUser, OptionalAuth};
use crate::core::{ConfigManager, Database};
use crate::models::{
    BetaRequest, CoverLetter, JobPage, JobPreference, JobStats, JobWithPreference,
    PreferencePatch, ProfileUpdate, User, UserAssistant, UserDocument,
};
use crate::scrape::ScrapeStatus;
use crate::services::{
    AppState, AssistantInput, BatchStatus, GenerateLetter, GeneratedLetter, RankingOutcome,
};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, PATCH, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

// System

#[get("/health")]
pub async fn health(auth: OptionalAuth, state: &State<AppState>) -> ApiResult<TextResponse> {
    handlers::health_handler(auth, state).await
}

#[get("/me")]
pub async fn get_current_user(auth: AuthenticatedUser) -> Json<DataResponse<UserInfo>> {
    handlers::get_current_user_handler(auth).await
}

// Profile, assistant and documents

#[get("/profile")]
pub async fn get_profile(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<User>> {
    handlers::get_profile_handler(auth, state).await
}

#[put("/profile", data = "<request>")]
pub async fn update_profile(
    request: Json<StandardRequest<ProfileUpdate>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<User>> {
    handlers::update_profile_handler(request, auth, state).await
}

#[get("/assistant")]
pub async fn get_assistant(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Option<UserAssistant>>> {
    handlers::get_assistant_handler(auth, state).await
}

#[put("/assistant", data = "<request>")]
pub async fn save_assistant(
    request: Json<StandardRequest<AssistantInput>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<UserAssistant>> {
    handlers::save_assistant_handler(request, auth, state).await
}

#[delete("/assistant")]
pub async fn delete_assistant(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<ActionResponse> {
    handlers::delete_assistant_handler(auth, state).await
}

#[get("/documents")]
pub async fn list_documents(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<UserDocument>>> {
    handlers::list_documents_handler(auth, state).await
}

#[post("/documents", data = "<upload>")]
pub async fn upload_document(
    upload: Form<DocumentUploadForm<'_>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<UserDocument>> {
    handlers::upload_document_handler(upload, auth, state).await
}

#[delete("/documents/<id>")]
pub async fn delete_document(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<ActionResponse> {
    handlers::delete_document_handler(id, auth, state).await
}

// Beta access

#[post("/beta-requests", data = "<request>")]
pub async fn create_beta_request(
    request: Json<StandardRequest<CreateBetaRequest>>,
    state: &State<AppState>,
) -> ApiResult<DataResponse<BetaRequest>> {
    handlers::create_beta_request_handler(request, state).await
}

#[get("/beta-requests?<status>")]
pub async fn list_beta_requests(
    status: Option<String>,
    admin: AdminUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<BetaRequest>>> {
    handlers::list_beta_requests_handler(status, admin, state).await
}

#[patch("/beta-requests/<id>", data = "<request>")]
pub async fn decide_beta_request(
    id: i64,
    request: Json<StandardRequest<BetaDecision>>,
    admin: AdminUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<BetaRequest>> {
    handlers::decide_beta_request_handler(id, request, admin, state).await
}

// Jobs and ranking

#[get("/jobs?<query..>")]
pub async fn list_jobs(
    query: JobQuery,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobPage>> {
    handlers::list_jobs_handler(query, auth, state).await
}

#[get("/jobs/stats")]
pub async fn job_stats(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobStats>> {
    handlers::job_stats_handler(auth, state).await
}

#[get("/jobs/<id>")]
pub async fn get_job(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobWithPreference>> {
    handlers::get_job_handler(id, auth, state).await
}

#[patch("/jobs/<id>/preference", data = "<request>")]
pub async fn update_preference(
    id: i64,
    request: Json<StandardRequest<PreferencePatch>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<JobPreference>> {
    handlers::update_preference_handler(id, request, auth, state).await
}

#[post("/jobs/<id>/rank?<mode>")]
pub async fn rank_job(
    id: i64,
    mode: Option<String>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<RankingOutcome>> {
    handlers::rank_job_handler(id, mode, auth, state).await
}

#[post("/jobs/rank-batch")]
pub async fn start_batch_ranking(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<BatchStatus>> {
    handlers::start_batch_handler(auth, state).await
}

#[get("/jobs/rank-batch")]
pub async fn batch_ranking_status(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Json<DataResponse<BatchStatus>> {
    handlers::batch_status_handler(auth, state).await
}

// Cover letters

#[post("/jobs/<job_id>/cover-letters", data = "<request>")]
pub async fn generate_cover_letter(
    job_id: i64,
    request: Option<Json<StandardRequest<GenerateLetter>>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<GeneratedLetter>> {
    handlers::generate_letter_handler(job_id, request, auth, state).await
}

#[get("/cover-letters?<job_id>")]
pub async fn list_cover_letters(
    job_id: Option<i64>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<CoverLetter>>> {
    handlers::list_letters_handler(job_id, auth, state).await
}

#[get("/cover-letters/<id>")]
pub async fn get_cover_letter(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<CoverLetter>> {
    handlers::get_letter_handler(id, auth, state).await
}

#[put("/cover-letters/<id>", data = "<request>")]
pub async fn update_cover_letter(
    id: i64,
    request: Json<StandardRequest<UpdateLetterRequest>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<CoverLetter>> {
    handlers::update_letter_handler(id, request, auth, state).await
}

#[delete("/cover-letters/<id>")]
pub async fn delete_cover_letter(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<ActionResponse> {
    handlers::delete_letter_handler(id, auth, state).await
}

#[post("/cover-letters/<id>/document")]
pub async fn export_cover_letter(
    id: i64,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<CoverLetter>> {
    handlers::export_letter_handler(id, auth, state).await
}

// Scraping

#[post("/scrape", data = "<request>")]
pub async fn start_scrape(
    request: Option<Json<StandardRequest<ScrapeRequest>>>,
    admin: AdminUser,
    state: &State<AppState>,
) -> ApiResult<DataResponse<ScrapeStatus>> {
    handlers::start_scrape_handler(request, admin, state).await
}

#[get("/scrape")]
pub async fn scrape_status(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Json<DataResponse<ScrapeStatus>> {
    handlers::scrape_status_handler(auth, state).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers

fn catcher_body(error: &str, code: &str, suggestions: &[&str]) -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        error.to_string(),
        code.to_string(),
        suggestions.iter().map(|s| s.to_string()).collect(),
        None,
    ))
}

fn auth_failure_message(req: &Request<'_>, fallback: &'static str) -> &'static str {
    req.local_cache(|| AuthFailure(None))
        .0
        .map(|e| e.message())
        .unwrap_or(fallback)
}

#[catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    catcher_body(
        "Invalid request format",
        "BAD_REQUEST",
        &[
            "Check your request JSON format",
            "Verify all required fields are present",
        ],
    )
}

#[catch(401)]
pub fn unauthorized(req: &Request<'_>) -> Json<StandardErrorResponse> {
    catcher_body(
        auth_failure_message(req, "Authentication required"),
        "UNAUTHORIZED",
        &["Send a valid Firebase ID token as 'Authorization: Bearer <token>'"],
    )
}

#[catch(403)]
pub fn forbidden(req: &Request<'_>) -> Json<StandardErrorResponse> {
    catcher_body(
        auth_failure_message(req, "Access denied"),
        "FORBIDDEN",
        &["Request beta access with POST /api/beta-requests"],
    )
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        format!("No route for {} {}", req.method(), req.uri().path()),
        "NOT_FOUND".to_string(),
        vec![],
        None,
    ))
}

#[catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    catcher_body(
        "Request body could not be processed",
        "UNPROCESSABLE",
        &["Check field names and value types"],
    )
}

#[catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    catcher_body(
        "Internal server error",
        "INTERNAL_ERROR",
        &[
            "Try again in a few moments",
            "Contact support if the problem persists",
        ],
    )
}

/// Assemble the API; callers decide whether to launch it or drive it with a local client
pub fn build_rocket(state: AppState, auth_config: AuthConfig) -> Rocket<Build> {
    let limits = Limits::default()
        .limit("file", 10.mebibytes())
        .limit("data-form", 11.mebibytes());

    let figment = rocket::Config::figment()
        .merge(("port", state.config.server.port))
        .merge(("limits", limits));

    rocket::custom(figment)
        .attach(Cors)
        .manage(state)
        .manage(auth_config)
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable,
                internal_error
            ],
        )
        .mount(
            "/api",
            routes![
                health,
                get_current_user,
                get_profile,
                update_profile,
                get_assistant,
                save_assistant,
                delete_assistant,
                list_documents,
                upload_document,
                delete_document,
                create_beta_request,
                list_beta_requests,
                decide_beta_request,
                list_jobs,
                job_stats,
                get_job,
                update_preference,
                rank_job,
                start_batch_ranking,
                batch_ranking_status,
                generate_cover_letter,
                list_cover_letters,
                get_cover_letter,
                update_cover_letter,
                delete_cover_letter,
                export_cover_letter,
                start_scrape,
                scrape_status,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    config.ensure_directories().await?;

    let db = match Database::connect(&config.server.database_path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database: {:#}", e);
            return Err(e);
        }
    };

    let mut auth_config = AuthConfig::from_settings(&config.auth);
    if let Err(e) = auth_config.update_firebase_keys().await {
        if auth_config.shared_secret.is_none() {
            error!("Failed to fetch Firebase keys: {}", e);
            return Err(e);
        }
        warn!(
            "Failed to fetch Firebase keys ({}); only shared-secret tokens will be accepted",
            e
        );
    }

    info!("Starting jobhunt API server on port {}", config.server.port);
    info!("Database: {}", config.server.database_path.display());
    if config.auth.require_beta_approval {
        info!("Beta approval is required for non-admin users");
    }

    let state = AppState::from_config(config, db)?;

    let _rocket = build_rocket(state, auth_config)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket server failed: {}", e))?;

    Ok(())
}
