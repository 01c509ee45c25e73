use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

/// Email domain accepted on public registration submissions. The check is a
/// guard rail, not a security boundary.
pub const INSTITUTIONAL_EMAIL_DOMAIN: &str = "@ashesi.edu";

// ============================================================================
// ENUMS
// ============================================================================

/// Registration review status (also a Postgres enum). Transitions are
/// monotone: pending -> approved | rejected, never reversed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

// ============================================================================
// BUSINESS REGISTRATIONS (Approval Workflow)
// ============================================================================

/// Social links captured on registration and carried onto the listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialLinks {
    pub website: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
}

/// Public submission awaiting admin review. Rows are never deleted; once the
/// status leaves `pending` it is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BusinessRegistration {
    pub id: Uuid,
    pub name: String,
    pub founder: String,
    pub email: String,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub year: Option<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub founded: Option<String>,
    pub stage: Option<String>,
    pub team_size: Option<String>,
    pub achievements: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub social_media: Option<Json<SocialLinks>>,
    pub status: RegistrationStatus,
    /// Set when the registration is converted into a listed business, so a
    /// raced or retried approval cannot insert a second row.
    pub converted_business_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Helper struct used when inserting a new registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBusinessRegistration {
    pub id: Uuid,
    pub name: String,
    pub founder: String,
    pub email: String,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub year: Option<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub founded: Option<String>,
    pub stage: Option<String>,
    pub team_size: Option<String>,
    pub achievements: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub social_media: Option<Json<SocialLinks>>,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
}

impl BusinessRegistration {
    /// Field-maps an approved registration onto a public listing. An absent
    /// numeric year defaults to the current calendar year; absent optional
    /// text collapses to empty strings and an absent social map to `{}` so the
    /// listing never carries nulls.
    pub fn to_listed_business(&self, now: DateTime<Utc>) -> NewBusiness {
        let year = self
            .year
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .unwrap_or_else(|| now.year());

        NewBusiness {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            category: self.category.clone().unwrap_or_default(),
            year,
            founder: self.founder.clone(),
            phone: self.phone.clone().unwrap_or_default(),
            email: self.email.clone(),
            education: self.education.clone().unwrap_or_default(),
            location: self.location.clone().unwrap_or_default(),
            founded: self.founded.clone().unwrap_or_default(),
            stage: self.stage.clone().unwrap_or_default(),
            team_size: self.team_size.clone().unwrap_or_default(),
            achievements: self.achievements.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            social_media: Json(
                self.social_media
                    .as_ref()
                    .map(|links| links.0.clone())
                    .unwrap_or_default(),
            ),
            image_url: self.image_url.clone().unwrap_or_default(),
            created_at: now,
        }
    }
}

/// Admin review queue: pending registrations are actionable, everything else
/// is history. Both partitions keep the newest-created-first order of the
/// input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationQueue {
    pub pending: Vec<BusinessRegistration>,
    pub history: Vec<BusinessRegistration>,
}

impl RegistrationQueue {
    pub fn partition(registrations: Vec<BusinessRegistration>) -> Self {
        let (pending, history) = registrations
            .into_iter()
            .partition(|reg| reg.status == RegistrationStatus::Pending);
        Self { pending, history }
    }
}

// ============================================================================
// LISTED BUSINESSES
// ============================================================================

/// Published directory entry. Created either directly by an admin or by
/// approving a registration.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub year: i32,
    pub founder: String,
    pub phone: String,
    pub email: String,
    pub education: String,
    pub location: String,
    pub founded: String,
    pub stage: String,
    pub team_size: String,
    pub achievements: String,
    pub description: String,
    pub social_media: Json<SocialLinks>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Helper for creating a new listed business
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBusiness {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub year: i32,
    pub founder: String,
    pub phone: String,
    pub email: String,
    pub education: String,
    pub location: String,
    pub founded: String,
    pub stage: String,
    pub team_size: String,
    pub achievements: String,
    pub description: String,
    pub social_media: Json<SocialLinks>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// BLOG POSTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub author: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Helper for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub author: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// COMMITTEE & GALLERY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommitteeMember {
    pub id: Uuid,
    pub name: String,
    pub position: String,
    pub year: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GalleryImage {
    pub id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    pub height: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Result of approving a registration: the terminal registration row and the
/// listing created from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub registration: BusinessRegistration,
    pub business: Business,
}

/// Aggregated counts for the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DashboardStats {
    pub pending_registrations: i64,
    pub businesses: i64,
    pub published_posts: i64,
    pub committee_members: i64,
    pub gallery_images: i64,
}

// ============================================================================
// ADMIN ACCOUNTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// REQUEST/RESPONSE DTOs
// ============================================================================

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

/// Payload sent by founders to register their business for review
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitRegistrationRequest {
    #[validate(length(min = 2, max = 160))]
    pub name: String,
    #[validate(length(min = 2, max = 120))]
    pub founder: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub year: Option<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub founded: Option<String>,
    pub stage: Option<String>,
    pub team_size: Option<String>,
    pub achievements: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub social_media: Option<SocialLinks>,
}

impl SubmitRegistrationRequest {
    /// Domain guard rail: submissions must come from an institutional address.
    pub fn validate_institutional_email(&self) -> Result<(), String> {
        if self.email.contains(INSTITUTIONAL_EMAIL_DOMAIN) {
            Ok(())
        } else {
            Err(format!(
                "Please use your {} email address",
                INSTITUTIONAL_EMAIL_DOMAIN
            ))
        }
    }

    pub fn into_new_registration(self) -> NewBusinessRegistration {
        NewBusinessRegistration {
            id: Uuid::new_v4(),
            name: self.name,
            founder: self.founder,
            email: self.email,
            phone: self.phone,
            category: self.category,
            year: self.year,
            education: self.education,
            location: self.location,
            founded: self.founded,
            stage: self.stage,
            team_size: self.team_size,
            achievements: self.achievements,
            description: self.description,
            image_url: self.image_url,
            social_media: self.social_media.map(Json),
            status: RegistrationStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Request to create or replace a listed business directly (admin surface)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBusinessRequest {
    #[validate(length(min = 2, max = 160))]
    pub name: String,
    #[validate(length(min = 2, max = 120))]
    pub category: String,
    pub year: Option<i32>,
    #[validate(length(min = 2, max = 120))]
    pub founder: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub founded: Option<String>,
    pub stage: Option<String>,
    pub team_size: Option<String>,
    pub achievements: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub social_media: Option<SocialLinks>,
}

impl CreateBusinessRequest {
    pub fn into_new_business(self, now: DateTime<Utc>) -> NewBusiness {
        NewBusiness {
            id: Uuid::new_v4(),
            name: self.name,
            category: self.category,
            year: self.year.unwrap_or_else(|| now.year()),
            founder: self.founder,
            phone: self.phone.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            education: self.education.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            founded: self.founded.unwrap_or_default(),
            stage: self.stage.unwrap_or_default(),
            team_size: self.team_size.unwrap_or_default(),
            achievements: self.achievements.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            social_media: Json(self.social_media.unwrap_or_default()),
            image_url: self.image_url.unwrap_or_default(),
            created_at: now,
        }
    }

    pub fn apply_to_existing(self, existing: &mut Business) {
        existing.name = self.name;
        existing.category = self.category;
        if let Some(year) = self.year {
            existing.year = year;
        }
        existing.founder = self.founder;
        existing.phone = self.phone.unwrap_or_default();
        existing.email = self.email.unwrap_or_default();
        existing.education = self.education.unwrap_or_default();
        existing.location = self.location.unwrap_or_default();
        existing.founded = self.founded.unwrap_or_default();
        existing.stage = self.stage.unwrap_or_default();
        existing.team_size = self.team_size.unwrap_or_default();
        existing.achievements = self.achievements.unwrap_or_default();
        existing.description = self.description.unwrap_or_default();
        existing.social_media = Json(self.social_media.unwrap_or_default());
        existing.image_url = self.image_url.unwrap_or_default();
    }
}

/// Request to create a blog post (JSON API, session-required)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    pub excerpt: Option<String>,
    #[validate(length(min = 1))]
    pub content: String,
    pub cover_image_url: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl CreatePostRequest {
    pub fn into_new_post(self, now: DateTime<Utc>) -> NewPost {
        // Drafts get their timestamp on first publish, not on creation.
        let published_at = if self.published {
            self.published_at.or(Some(now))
        } else {
            None
        };

        NewPost {
            id: Uuid::new_v4(),
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            content: self.content,
            cover_image_url: self.cover_image_url,
            author: self.author,
            published: self.published,
            published_at,
            created_at: now,
        }
    }
}

/// Partial update for a blog post (JSON API, session-required)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image_url: Option<String>,
    pub author: Option<String>,
    pub published: Option<bool>,
    pub published_at: Option<DateTime<Utc>>,
}

impl UpdatePostRequest {
    /// Applies the patch. `published_at` is set exactly once, on the first
    /// transition into `published = true`, and kept on later edits unless the
    /// caller supplies a replacement.
    pub fn apply_to_existing(self, existing: &mut Post, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            existing.title = title;
        }
        if let Some(slug) = self.slug {
            existing.slug = slug;
        }
        if let Some(excerpt) = self.excerpt {
            existing.excerpt = Some(excerpt);
        }
        if let Some(content) = self.content {
            existing.content = content;
        }
        if let Some(cover_image_url) = self.cover_image_url {
            existing.cover_image_url = Some(cover_image_url);
        }
        if let Some(author) = self.author {
            existing.author = Some(author);
        }
        if let Some(published) = self.published {
            existing.published = published;
        }
        if let Some(published_at) = self.published_at {
            existing.published_at = Some(published_at);
        } else if existing.published && existing.published_at.is_none() {
            existing.published_at = Some(now);
        }
    }
}

/// Request to create or replace a committee member (admin surface)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommitteeMemberRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[validate(length(min = 2, max = 120))]
    pub position: String,
    pub year: i32,
    pub image_url: Option<String>,
}

/// Request to create or replace a gallery image (admin surface)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGalleryImageRequest {
    #[validate(url)]
    pub url: String,
    pub caption: Option<String>,
    pub height: Option<i32>,
}

/// Admin login credentials
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Payload for the registration-notification relay endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub email: String,
    pub business_name: String,
    pub founder: Option<String>,
    pub status: RegistrationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn registration(year: Option<&str>) -> BusinessRegistration {
        BusinessRegistration {
            id: Uuid::new_v4(),
            name: "Kente Threads".to_string(),
            founder: "Ama Mensah".to_string(),
            email: "ama@ashesi.edu.gh".to_string(),
            phone: None,
            category: Some("Fashion".to_string()),
            year: year.map(|y| y.to_string()),
            education: None,
            location: None,
            founded: None,
            stage: None,
            team_size: None,
            achievements: None,
            description: None,
            image_url: None,
            social_media: None,
            status: RegistrationStatus::Pending,
            converted_business_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn listing_defaults_missing_year_to_current_calendar_year() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let business = registration(None).to_listed_business(now);
        assert_eq!(business.year, 2026);
    }

    #[test]
    fn listing_parses_supplied_year() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let business = registration(Some(" 2024 ")).to_listed_business(now);
        assert_eq!(business.year, 2024);
    }

    #[test]
    fn listing_falls_back_when_year_is_not_numeric() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let business = registration(Some("Class of 2025")).to_listed_business(now);
        assert_eq!(business.year, 2026);
    }

    #[test]
    fn listing_collapses_absent_optionals_to_empty_values() {
        let now = Utc::now();
        let business = registration(None).to_listed_business(now);
        assert_eq!(business.phone, "");
        assert_eq!(business.education, "");
        assert_eq!(business.achievements, "");
        assert_eq!(business.social_media.0, SocialLinks::default());
    }

    #[test]
    fn institutional_email_guard() {
        let mut request = SubmitRegistrationRequest {
            name: "Kente Threads".to_string(),
            founder: "Ama Mensah".to_string(),
            email: "ama@ashesi.edu.gh".to_string(),
            phone: None,
            category: None,
            year: None,
            education: None,
            location: None,
            founded: None,
            stage: None,
            team_size: None,
            achievements: None,
            description: None,
            image_url: None,
            social_media: None,
        };
        assert!(request.validate_institutional_email().is_ok());

        request.email = "ama@gmail.com".to_string();
        assert!(request.validate_institutional_email().is_err());
    }

    #[test]
    fn queue_partition_keeps_order_within_each_bucket() {
        let mut newest = registration(None);
        newest.status = RegistrationStatus::Approved;
        let mut middle = registration(None);
        middle.status = RegistrationStatus::Pending;
        let mut oldest = registration(None);
        oldest.status = RegistrationStatus::Rejected;

        let queue = RegistrationQueue::partition(vec![
            newest.clone(),
            middle.clone(),
            oldest.clone(),
        ]);

        assert_eq!(queue.pending.len(), 1);
        assert_eq!(queue.pending[0].id, middle.id);
        assert_eq!(queue.history.len(), 2);
        assert_eq!(queue.history[0].id, newest.id);
        assert_eq!(queue.history[1].id, oldest.id);
    }

    fn draft_post() -> Post {
        Post {
            id: Uuid::new_v4(),
            title: "Pitch night recap".to_string(),
            slug: "pitch-night-recap".to_string(),
            excerpt: None,
            content: "...".to_string(),
            cover_image_url: None,
            author: None,
            published: false,
            published_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_publish_stamps_published_at() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let mut post = draft_post();

        let patch = UpdatePostRequest {
            published: Some(true),
            ..Default::default()
        };
        patch.apply_to_existing(&mut post, now);

        assert!(post.published);
        assert_eq!(post.published_at, Some(now));
    }

    #[test]
    fn later_edits_keep_the_original_publish_timestamp() {
        let first = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
        let mut post = draft_post();

        UpdatePostRequest {
            published: Some(true),
            ..Default::default()
        }
        .apply_to_existing(&mut post, first);

        UpdatePostRequest {
            title: Some("Pitch night recap, updated".to_string()),
            ..Default::default()
        }
        .apply_to_existing(&mut post, later);

        assert_eq!(post.published_at, Some(first));
    }

    #[test]
    fn explicit_published_at_overrides() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let supplied = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
        let mut post = draft_post();

        UpdatePostRequest {
            published: Some(true),
            published_at: Some(supplied),
            ..Default::default()
        }
        .apply_to_existing(&mut post, now);

        assert_eq!(post.published_at, Some(supplied));
    }

    #[test]
    fn draft_creation_has_no_publish_timestamp() {
        let now = Utc::now();
        let post = CreatePostRequest {
            title: "Draft".to_string(),
            slug: "draft".to_string(),
            excerpt: None,
            content: "...".to_string(),
            cover_image_url: None,
            author: None,
            published: false,
            published_at: None,
        }
        .into_new_post(now);

        assert!(post.published_at.is_none());
    }

    #[test]
    fn published_creation_defaults_publish_timestamp_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let post = CreatePostRequest {
            title: "Live".to_string(),
            slug: "live".to_string(),
            excerpt: None,
            content: "...".to_string(),
            cover_image_url: None,
            author: None,
            published: true,
            published_at: None,
        }
        .into_new_post(now);

        assert_eq!(post.published_at, Some(now));
    }
}
