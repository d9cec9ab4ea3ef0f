//! Role gating
//!
//! Dua lapis: gate berbasis prefix path (dipakai middleware) dan
//! pengecekan per-resource di dalam handler.

use crate::core::auth::SessionClaims;
use crate::models::{AppError, AppResult, Form, Response, Role};

/// Path prefixes that require a session
pub const PROTECTED_PREFIXES: [&str; 9] = [
    "/dashboard",
    "/admin",
    "/forms",
    "/my-forms",
    "/my-responses",
    "/uploads",
    "/api/upload",
    "/sub-roles",
    "/auth/me",
];

/// Outcome of the route gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// No valid session
    Unauthenticated,
    /// Session present, role not allowed under this prefix
    Forbidden,
}

/// `/forms` matches `/forms` and `/forms/...`, never `/formsx`
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| under(path, prefix))
}

/// Decide whether a request for `path` may proceed given the caller's role
pub fn gate(path: &str, role: Option<Role>) -> GateDecision {
    if !is_protected(path) {
        return GateDecision::Allow;
    }

    let Some(role) = role else {
        return GateDecision::Unauthenticated;
    };

    if under(path, "/admin") && role != Role::Superadmin {
        return GateDecision::Forbidden;
    }
    if under(path, "/forms") && !role.can_manage_forms() {
        return GateDecision::Forbidden;
    }

    GateDecision::Allow
}

// ============================================
// Resource rules
// ============================================

pub fn ensure_superadmin(session: &SessionClaims) -> AppResult<()> {
    if session.is_superadmin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Unauthorized"))
    }
}

pub fn ensure_form_manager(session: &SessionClaims) -> AppResult<()> {
    if session.role.can_manage_forms() {
        Ok(())
    } else {
        Err(AppError::forbidden("Unauthorized"))
    }
}

/// Superadmin manages every form, admin only its own
pub fn can_manage_form(session: &SessionClaims, form: &Form) -> bool {
    match session.role {
        Role::Superadmin => true,
        Role::Admin => form.created_by_id == session.id,
        Role::Teknisi => false,
    }
}

pub fn ensure_can_manage_form(session: &SessionClaims, form: &Form) -> AppResult<()> {
    if can_manage_form(session, form) {
        Ok(())
    } else {
        Err(AppError::forbidden("Unauthorized"))
    }
}

/// A technician sees a form only when it targets their sub-role.
/// Untargeted forms are hidden from technicians.
pub fn form_targets(session: &SessionClaims, form: &Form) -> bool {
    match (&form.sub_role_id, &session.sub_role_id) {
        (Some(target), Some(own)) => target == own,
        _ => false,
    }
}

/// Read access to a single form
pub fn ensure_can_view_form(session: &SessionClaims, form: &Form) -> AppResult<()> {
    match session.role {
        Role::Teknisi if !form_targets(session, form) => {
            Err(AppError::forbidden("Form tidak tersedia untuk Anda"))
        }
        Role::Teknisi => Ok(()),
        _ => ensure_can_manage_form(session, form),
    }
}

/// Submitting: technicians are bound to their sub-role, managers are not
pub fn ensure_can_submit(session: &SessionClaims, form: &Form) -> AppResult<()> {
    if session.role == Role::Teknisi && !form_targets(session, form) {
        return Err(AppError::forbidden("Form tidak tersedia untuk Anda"));
    }
    Ok(())
}

/// Technician: own responses. Admin: responses to own forms.
pub fn ensure_can_view_response(
    session: &SessionClaims,
    response: &Response,
    form: &Form,
) -> AppResult<()> {
    let allowed = match session.role {
        Role::Superadmin => true,
        Role::Admin => form.created_by_id == session.id,
        Role::Teknisi => response.user_id == session.id,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::forbidden("Unauthorized"))
    }
}
