//! API Request Handlers

use axum::{
    extract::{Json, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::middleware::{RateLimiter, Session};
use super::types::*;
use crate::core::access;
use crate::core::auth::{self, SessionClaims, SessionKeys};
use crate::core::schema::FormDefinition;
use crate::core::statistics::{self, FormStatistics};
use crate::core::submission;
use crate::models::{
    AppConfig, AppError, AppResult, ErrorCode, FormDetail, FormDraft, MyResponseEntry, NewUser,
    ResponseDetail, Role, SubRoleWithCount, UserWithSubRole,
};
use crate::storage::Store;
use crate::utils::upload::{StoredFile, UploadPolicy};

/// Shared application state
pub struct AppState {
    pub store: Arc<Store>,
    pub config: AppConfig,
    pub sessions: SessionKeys,
    pub uploads: UploadPolicy,
    pub login_limiter: Arc<RateLimiter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Store, config: AppConfig) -> Self {
        Self {
            store: Arc::new(store),
            sessions: SessionKeys::new(&config.session_secret, config.session_ttl),
            uploads: UploadPolicy::new(config.upload_dir.clone()),
            login_limiter: Arc::new(RateLimiter::per_minute(config.login_attempts_per_minute)),
            config,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn ok<T: serde::Serialize>(data: T, start: Instant) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

/// Run CPU-heavy or blocking work (bcrypt) off the async workers
async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::with_source(ErrorCode::Internal, "Background task failed", e))?
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Auth
// ============================================

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let start = Instant::now();

    let store = state.store.clone();
    let (user, sub_role_name) =
        blocking(move || auth::authenticate(&store, &req.username, &req.password)).await?;

    let ttl = state.sessions.ttl();
    let claims = SessionClaims::for_user(&user, sub_role_name, ttl);
    let token = state.sessions.issue(&claims)?;
    let cookie = auth::session_cookie(&token, ttl);

    let data = LoginData {
        token,
        expires_at: claims.exp,
        user: claims,
    };

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(data, elapsed_ms(start))),
    ))
}

pub async fn logout(Session(session): Session) -> impl IntoResponse {
    let start = Instant::now();
    info!(user_id = %session.id, "👋 Logout");

    (
        [(header::SET_COOKIE, auth::cleared_session_cookie())],
        Json(ApiResponse::success(LogoutData { logged_out: true }, elapsed_ms(start))),
    )
}

pub async fn me(Session(session): Session) -> ApiResult<SessionClaims> {
    ok(session, Instant::now())
}

// ============================================
// Dashboard
// ============================================

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
) -> ApiResult<DashboardData> {
    let start = Instant::now();
    let store = &state.store;

    let data = match session.role {
        Role::Superadmin => DashboardData::Superadmin {
            total_users: store.count_users()?,
            total_forms: store.count_forms(None)?,
            total_responses: store.count_responses()?,
            total_sub_roles: store.count_sub_roles()?,
        },
        Role::Admin => DashboardData::Admin {
            my_forms: store.count_forms(Some(&session.id))?,
            total_responses: store.count_responses_for_creator(&session.id)?,
        },
        Role::Teknisi => DashboardData::Teknisi {
            available_forms: match &session.sub_role_id {
                Some(id) => store.count_forms_for_sub_role(id)?,
                None => 0,
            },
            my_responses: store.count_responses_for_user(&session.id)?,
            sub_role_name: session.sub_role_name.clone(),
        },
    };

    ok(data, start)
}

// ============================================
// Sub-roles
// ============================================

/// Any signed-in user may list sub-roles
pub async fn list_sub_roles(
    State(state): State<Arc<AppState>>,
    Session(_session): Session,
) -> ApiResult<Vec<SubRoleWithCount>> {
    let start = Instant::now();
    ok(state.store.list_sub_roles()?, start)
}

pub async fn admin_list_sub_roles(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
) -> ApiResult<Vec<SubRoleWithCount>> {
    let start = Instant::now();
    access::ensure_superadmin(&session)?;
    ok(state.store.list_sub_roles()?, start)
}

pub async fn create_sub_role(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Json(req): Json<SubRoleRequest>,
) -> ApiResult<crate::models::SubRole> {
    let start = Instant::now();
    access::ensure_superadmin(&session)?;

    let (name, description) = req.validate()?;
    if state.store.find_sub_role_by_name(&name)?.is_some() {
        return Err(AppError::conflict("Nama sub-role sudah ada"));
    }

    let sub_role = state.store.insert_sub_role(&name, description.as_deref())?;
    info!(sub_role_id = %sub_role.id, actor = %session.id, "🏷️ Sub-role created");
    ok(sub_role, start)
}

pub async fn update_sub_role(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
    Json(req): Json<SubRoleRequest>,
) -> ApiResult<crate::models::SubRole> {
    let start = Instant::now();
    access::ensure_superadmin(&session)?;

    let (name, description) = req.validate()?;
    if let Some(existing) = state.store.find_sub_role_by_name(&name)? {
        if existing.id != id {
            return Err(AppError::conflict("Nama sub-role sudah ada"));
        }
    }

    if !state.store.update_sub_role(&id, &name, description.as_deref())? {
        return Err(AppError::not_found("Sub-role tidak ditemukan"));
    }

    let sub_role = state
        .store
        .find_sub_role(&id)?
        .ok_or_else(|| AppError::not_found("Sub-role tidak ditemukan"))?;
    info!(sub_role_id = %id, actor = %session.id, "🏷️ Sub-role updated");
    ok(sub_role, start)
}

pub async fn delete_sub_role(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<DeletedData> {
    let start = Instant::now();
    access::ensure_superadmin(&session)?;

    if state.store.find_sub_role(&id)?.is_none() {
        return Err(AppError::not_found("Sub-role tidak ditemukan"));
    }

    let assigned = state.store.count_users_in_sub_role(&id)?;
    if assigned > 0 {
        return Err(AppError::conflict(format!(
            "Tidak dapat menghapus. Masih ada {} user dengan sub-role ini.",
            assigned
        )));
    }

    state.store.delete_sub_role(&id)?;
    info!(sub_role_id = %id, actor = %session.id, "🗑️ Sub-role deleted");
    ok(DeletedData { id }, start)
}

// ============================================
// Users (superadmin)
// ============================================

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
) -> ApiResult<Vec<UserWithSubRole>> {
    let start = Instant::now();
    access::ensure_superadmin(&session)?;
    ok(state.store.list_users()?, start)
}

/// Sub-role must exist when given
fn check_sub_role(store: &Store, sub_role_id: Option<&str>) -> AppResult<()> {
    match sub_role_id {
        Some(id) if store.find_sub_role(id)?.is_none() => {
            Err(AppError::validation("sub_role_id", "Sub-role tidak ditemukan"))
        }
        _ => Ok(()),
    }
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Json(req): Json<UserRequest>,
) -> ApiResult<UserWithSubRole> {
    let start = Instant::now();
    access::ensure_superadmin(&session)?;

    let fields = req.validate(true)?;
    let (Some(name), Some(username), Some(password), Some(role)) =
        (fields.name, fields.username, fields.password, fields.role)
    else {
        return Err(AppError::validation("user", "Data user tidak lengkap"));
    };

    if state.store.find_user_by_username(&username)?.is_some() {
        return Err(AppError::conflict("Username sudah terdaftar"));
    }

    // Hanya teknisi yang punya sub-role
    let sub_role_id = match role {
        Role::Teknisi => fields.sub_role_id.flatten(),
        _ => None,
    };
    check_sub_role(&state.store, sub_role_id.as_deref())?;

    let password_hash = blocking(move || auth::hash_password(&password)).await?;
    let user = state.store.insert_user(&NewUser {
        name,
        username,
        password_hash,
        role,
        sub_role_id,
        is_active: fields.is_active.unwrap_or(true),
    })?;

    info!(user_id = %user.id, role = %user.role, actor = %session.id, "👤 User created");
    let sub_role = match &user.sub_role_id {
        Some(id) => state.store.find_sub_role(id)?,
        None => None,
    };
    ok(UserWithSubRole { user, sub_role }, start)
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
    Json(req): Json<UserRequest>,
) -> ApiResult<UserWithSubRole> {
    let start = Instant::now();
    access::ensure_superadmin(&session)?;

    let fields = req.validate(false)?;
    let mut user = state
        .store
        .find_user(&id)?
        .ok_or_else(|| AppError::not_found("User tidak ditemukan"))?;

    if let Some(username) = fields.username {
        if username != user.username {
            if state.store.find_user_by_username(&username)?.is_some() {
                return Err(AppError::conflict("Username sudah terdaftar"));
            }
            user.username = username;
        }
    }
    if let Some(name) = fields.name {
        user.name = Some(name);
    }
    if let Some(role) = fields.role {
        user.role = role;
    }
    if let Some(is_active) = fields.is_active {
        user.is_active = is_active;
    }

    user.sub_role_id = match user.role {
        Role::Teknisi => fields.sub_role_id.unwrap_or(user.sub_role_id),
        _ => None,
    };
    check_sub_role(&state.store, user.sub_role_id.as_deref())?;

    if let Some(password) = fields.password {
        user.password_hash = Some(blocking(move || auth::hash_password(&password)).await?);
    }

    state.store.save_user(&user)?;
    info!(user_id = %user.id, actor = %session.id, "👤 User updated");

    let sub_role = match &user.sub_role_id {
        Some(id) => state.store.find_sub_role(id)?,
        None => None,
    };
    ok(UserWithSubRole { user, sub_role }, start)
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<DeletedData> {
    let start = Instant::now();
    access::ensure_superadmin(&session)?;

    if id == session.id {
        return Err(AppError::validation("id", "Tidak dapat menghapus akun sendiri"));
    }

    if !state.store.delete_user(&id)? {
        return Err(AppError::not_found("User tidak ditemukan"));
    }

    info!(user_id = %id, actor = %session.id, "🗑️ User deleted");
    ok(DeletedData { id }, start)
}

pub async fn toggle_user_status(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<ToggleData> {
    let start = Instant::now();
    access::ensure_superadmin(&session)?;

    let user = state
        .store
        .find_user(&id)?
        .ok_or_else(|| AppError::not_found("User tidak ditemukan"))?;

    let is_active = !user.is_active;
    state.store.set_user_active(&id, is_active)?;
    info!(user_id = %id, is_active, actor = %session.id, "🔁 User status toggled");
    ok(ToggleData { id, is_active }, start)
}

// ============================================
// Forms (admin / superadmin)
// ============================================

fn load_form(store: &Store, id: &str) -> AppResult<FormDetail> {
    store
        .form_detail(id)?
        .ok_or_else(|| AppError::not_found("Form tidak ditemukan"))
}

/// Validate a builder payload, including that the target sub-role exists
fn form_draft(store: &Store, definition: FormDefinition) -> AppResult<FormDraft> {
    let draft = definition.validate()?;
    check_sub_role(store, draft.sub_role_id.as_deref())?;
    Ok(draft)
}

pub async fn list_forms(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
) -> ApiResult<Vec<FormListItem>> {
    let start = Instant::now();
    access::ensure_form_manager(&session)?;

    let scope = match session.role {
        Role::Superadmin => None,
        _ => Some(session.id.as_str()),
    };
    let forms = state.store.list_forms(scope)?;
    ok(forms.into_iter().map(FormListItem::from).collect(), start)
}

pub async fn create_form(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Json(definition): Json<FormDefinition>,
) -> ApiResult<FormDetail> {
    let start = Instant::now();
    access::ensure_form_manager(&session)?;

    let draft = form_draft(&state.store, definition)?;
    let form = state.store.insert_form(&session.id, &draft)?;
    info!(
        form_id = %form.id,
        questions = draft.questions.len(),
        actor = %session.id,
        "📝 Form created"
    );

    ok(load_form(&state.store, &form.id)?, start)
}

pub async fn get_form(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<FormDetail> {
    let start = Instant::now();
    let detail = load_form(&state.store, &id)?;
    access::ensure_can_view_form(&session, &detail.form)?;
    ok(detail, start)
}

pub async fn update_form(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
    Json(definition): Json<FormDefinition>,
) -> ApiResult<FormDetail> {
    let start = Instant::now();
    let existing = load_form(&state.store, &id)?;
    access::ensure_can_manage_form(&session, &existing.form)?;

    let draft = form_draft(&state.store, definition)?;
    state.store.replace_form(&id, &draft)?;
    info!(form_id = %id, actor = %session.id, "📝 Form updated");

    ok(load_form(&state.store, &id)?, start)
}

pub async fn delete_form(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<DeletedData> {
    let start = Instant::now();
    let existing = load_form(&state.store, &id)?;
    access::ensure_can_manage_form(&session, &existing.form)?;

    state.store.delete_form(&id)?;
    info!(form_id = %id, actor = %session.id, "🗑️ Form deleted");
    ok(DeletedData { id }, start)
}

pub async fn toggle_form_status(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<ToggleData> {
    let start = Instant::now();
    let existing = load_form(&state.store, &id)?;
    access::ensure_can_manage_form(&session, &existing.form)?;

    let is_active = !existing.form.is_active;
    state.store.set_form_active(&id, is_active)?;
    info!(form_id = %id, is_active, actor = %session.id, "🔁 Form status toggled");
    ok(ToggleData { id, is_active }, start)
}

pub async fn form_responses(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<FormResponsesData> {
    let start = Instant::now();
    access::ensure_form_manager(&session)?;
    let form = load_form(&state.store, &id)?;
    access::ensure_can_manage_form(&session, &form.form)?;

    let responses = state.store.responses_for_form(&id)?;
    ok(FormResponsesData { form, responses }, start)
}

pub async fn form_statistics(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<FormStatistics> {
    let start = Instant::now();
    access::ensure_form_manager(&session)?;
    let form = load_form(&state.store, &id)?;
    access::ensure_can_manage_form(&session, &form.form)?;

    let answers = state.store.answers_for_form(&id)?;
    let total_responses = state.store.count_responses_for_form(&id)?;
    let question_stats = statistics::summarize(&form.questions, &answers);

    ok(
        FormStatistics {
            form,
            total_responses,
            question_stats,
        },
        start,
    )
}

// ============================================
// Responses
// ============================================

fn load_response(
    store: &Store,
    session: &SessionClaims,
    response_id: &str,
) -> AppResult<ResponseDetail> {
    let detail = store
        .response_detail(response_id)?
        .ok_or_else(|| AppError::not_found("Response tidak ditemukan"))?;
    access::ensure_can_view_response(session, &detail.response, &detail.form.form)?;
    Ok(detail)
}

pub async fn get_form_response(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path((form_id, response_id)): Path<(String, String)>,
) -> ApiResult<ResponseDetail> {
    let start = Instant::now();
    let detail = load_response(&state.store, &session, &response_id)?;
    if detail.response.form_id != form_id {
        return Err(AppError::not_found("Response tidak ditemukan"));
    }
    ok(detail, start)
}

pub async fn get_my_response(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<ResponseDetail> {
    let start = Instant::now();
    ok(load_response(&state.store, &session, &id)?, start)
}

pub async fn my_responses(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
) -> ApiResult<Vec<MyResponseEntry>> {
    let start = Instant::now();
    ok(state.store.responses_for_user(&session.id)?, start)
}

// ============================================
// Technician forms
// ============================================

pub async fn my_forms(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
) -> ApiResult<Vec<FormDetail>> {
    let start = Instant::now();
    if session.role != Role::Teknisi {
        return Err(AppError::forbidden("Unauthorized"));
    }

    let forms = match &session.sub_role_id {
        Some(sub_role_id) => state.store.list_active_forms_for_sub_role(sub_role_id)?,
        None => Vec::new(),
    };
    ok(forms, start)
}

/// Form to fill: must be active for technicians
pub async fn get_my_form(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<FormDetail> {
    let start = Instant::now();
    let detail = load_form(&state.store, &id)?;
    access::ensure_can_view_form(&session, &detail.form)?;

    if session.role == Role::Teknisi && !detail.form.is_active {
        return Err(AppError::not_found("Form tidak ditemukan atau tidak aktif"));
    }
    ok(detail, start)
}

pub async fn submit_response(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    Path(form_id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<SubmittedData> {
    let start = Instant::now();

    let detail = state
        .store
        .form_detail(&form_id)?
        .filter(|d| d.form.is_active)
        .ok_or_else(|| AppError::not_found("Form tidak ditemukan atau tidak aktif"))?;
    access::ensure_can_submit(&session, &detail.form)?;

    let answers = submission::validate_answers(&detail.questions, req.answers)?;
    let response = state.store.insert_response(&form_id, &session.id, &answers)?;

    info!(
        response_id = %response.id,
        form_id = %form_id,
        answers = answers.len(),
        user_id = %session.id,
        "✅ Response submitted"
    );
    ok(
        SubmittedData {
            response_id: response.id,
        },
        start,
    )
}

// ============================================
// Upload
// ============================================

pub async fn upload(
    State(state): State<Arc<AppState>>,
    Session(session): Session,
    mut multipart: Multipart,
) -> ApiResult<StoredFile> {
    let start = Instant::now();

    let too_large = |status: StatusCode| {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::upload_rejected("File size exceeds 10MB limit")
        } else {
            AppError::upload_rejected("No file provided")
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(|e| too_large(e.status()))? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| too_large(e.status()))?;

        let stored = state.uploads.store(&original_name, &bytes).await?;
        info!(url = %stored.url, user_id = %session.id, "📎 Upload stored");
        return ok(stored, start);
    }

    Err(AppError::upload_rejected("No file provided"))
}
