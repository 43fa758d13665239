//! OpenAPI documentation for the public site API and the admin API.
//!
//! Both surfaces live in one document since they share most of their
//! schemas; admin-only paths are marked with the `session_token` cookie
//! security requirement.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Registers the session cookie as a security scheme.
struct SessionSecurityAddon;

impl Modify for SessionSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "session_token".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "calisound_session",
                    "Session cookie issued by `POST /authentication/login`. Mutating \
                     requests must also echo the CSRF token from the session in an \
                     `x-csrf-token` header.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CALI Sound API",
        description = "Public content API and admin management API for the CALI Sound site.",
    ),
    paths(
        // Authentication
        api::handlers::auth::login,
        api::handlers::auth::verify_totp,
        api::handlers::auth::logout,
        api::handlers::auth::me,
        api::handlers::auth::enroll_totp,
        api::handlers::auth::confirm_totp,
        api::handlers::auth::disable_totp,
        api::handlers::auth::change_password,
        // Public site
        api::handlers::cities::list_public_cities,
        api::handlers::cities::get_public_city,
        api::handlers::sets::list_public_sets,
        api::handlers::sets::get_public_set,
        api::handlers::comments::list_set_comments,
        api::handlers::comments::submit_comment,
        api::handlers::content::list_public_content,
        api::handlers::content::follow_link,
        api::handlers::content::submit_contact,
        api::handlers::search::search_media,
        api::handlers::club::club_ws,
        // Admin: catalog
        api::handlers::cities::list_cities,
        api::handlers::cities::get_city,
        api::handlers::cities::create_city,
        api::handlers::cities::update_city,
        api::handlers::cities::delete_city,
        api::handlers::sets::list_sets,
        api::handlers::sets::get_set,
        api::handlers::sets::create_set,
        api::handlers::sets::update_set,
        api::handlers::sets::delete_set,
        api::handlers::sets::import_sets,
        // Admin: moderation and inbox
        api::handlers::comments::list_comments,
        api::handlers::comments::update_comment_status,
        api::handlers::comments::delete_comment,
        api::handlers::content::list_content,
        api::handlers::content::create_content,
        api::handlers::content::update_content,
        api::handlers::content::delete_content,
        api::handlers::content::link_stats,
        api::handlers::content::list_contact_messages,
        api::handlers::content::update_contact_message,
        api::handlers::activity::list_activity,
        // Admin: release planning
        api::handlers::releases::create_plan,
        api::handlers::releases::list_plans,
        api::handlers::releases::get_plan,
        api::handlers::releases::update_plan,
        api::handlers::releases::delete_plan,
        api::handlers::releases::toggle_task,
        api::handlers::releases::regenerate_copy,
        // Admin: social composer
        api::handlers::social::create_post,
        api::handlers::social::list_posts,
        api::handlers::social::get_post,
        api::handlers::social::update_post,
        api::handlers::social::delete_post,
        api::handlers::social::delete_variant,
        api::handlers::social::validate_post,
        api::handlers::social::schedule_post,
        api::handlers::social::list_jobs,
        api::handlers::social::cancel_job,
        // Admin: club characters
        api::handlers::club::list_characters,
        api::handlers::club::create_character,
        api::handlers::club::update_character,
        api::handlers::club::delete_character,
    ),
    components(schemas(
        api::models::auth::LoginRequest,
        api::models::auth::TotpVerifyRequest,
        api::models::auth::TotpChallengeResponse,
        api::models::auth::SessionResponse,
        api::models::auth::UserResponse,
        api::models::auth::TotpSetupResponse,
        api::models::auth::TotpEnableRequest,
        api::models::auth::PasswordChangeRequest,
        api::models::auth::AuthMessageResponse,
        api::models::cities::CityCreate,
        api::models::cities::CityUpdate,
        api::models::cities::CityResponse,
        api::models::sets::SetStatus,
        api::models::sets::SetCreate,
        api::models::sets::SetUpdate,
        api::models::sets::SetResponse,
        api::models::sets::SetImportRowResult,
        api::models::sets::SetImportResult,
        api::models::comments::CommentStatus,
        api::models::comments::CommentSubmit,
        api::models::comments::CommentResponse,
        api::models::comments::AdminCommentResponse,
        api::models::comments::CommentStatusUpdate,
        api::models::content::ContentKind,
        api::models::content::ContentCreate,
        api::models::content::ContentUpdate,
        api::models::content::ContentResponse,
        api::models::content::ContactSubmit,
        api::models::content::ContactResponse,
        api::models::content::LinkClickStats,
        api::models::activity::ActivityResponse,
        api::models::releases::PlanStatus,
        api::models::releases::CopyStatus,
        api::models::releases::PlanCreate,
        api::models::releases::PlanUpdate,
        api::models::releases::PlanResponse,
        api::models::releases::TaskResponse,
        api::models::releases::CopyResponse,
        api::models::releases::PlanDetailResponse,
        api::models::releases::TaskToggleRequest,
        api::models::social::PostStatus,
        api::models::social::JobStatus,
        api::models::social::VariantCreate,
        api::models::social::PostCreate,
        api::models::social::PostUpdate,
        api::models::social::VariantResponse,
        api::models::social::PostResponse,
        api::models::social::PostDetailResponse,
        api::models::social::VariantViolations,
        api::models::social::ValidationReport,
        api::models::social::ScheduleRequest,
        api::models::social::JobResponse,
        api::models::club::CharacterCreate,
        api::models::club::CharacterUpdate,
        api::models::club::CharacterResponse,
        crate::platforms::Platform,
        crate::media_search::SearchSource,
        crate::media_search::SearchHit,
    )),
    modifiers(&SessionSecurityAddon),
    tags(
        (name = "authentication", description = "Admin login, sessions, and TOTP"),
        (name = "cities", description = "Cities the brand plays in"),
        (name = "sets", description = "DJ sets and mixes"),
        (name = "comments", description = "Listener comments on sets"),
        (name = "content", description = "FAQ entries, links, pages, and the contact form"),
        (name = "search", description = "YouTube and Spotify lookup for set metadata"),
        (name = "club", description = "The virtual club"),
        (name = "admin", description = "Content management"),
        (name = "releases", description = "Release planning and promo copy"),
        (name = "social", description = "Social post composer and scheduling"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().expect("document serializes");
        assert!(json.contains("/api/v1/sets/{slug}"));
        assert!(json.contains("/admin/api/v1/releases"));
        assert!(json.contains("session_token"));
    }
}
