use std::{borrow::Cow, time::Duration};

use chrono::Utc;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, Executor, PgPool, Postgres, Transaction,
};
use uuid::Uuid;

use crate::models::{
    Admin, Business, BusinessRegistration, CommitteeMember, DashboardStats, GalleryImage,
    NewBusiness, NewBusinessRegistration, NewPost, Post,
};

const REGISTRATION_COLUMNS: &str = r#"
    id,
    name,
    founder,
    email,
    phone,
    category,
    year,
    education,
    location,
    founded,
    stage,
    team_size,
    achievements,
    description,
    image_url,
    social_media,
    status,
    converted_business_id,
    created_at
"#;

const BUSINESS_COLUMNS: &str = r#"
    id,
    name,
    category,
    year,
    founder,
    phone,
    email,
    education,
    location,
    founded,
    stage,
    team_size,
    achievements,
    description,
    social_media,
    image_url,
    created_at
"#;

const POST_COLUMNS: &str = r#"
    id,
    title,
    slug,
    excerpt,
    content,
    cover_image_url,
    author,
    published,
    published_at,
    created_at
"#;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = match PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600)))
            .test_before_acquire(true)
            .connect(database_url)
            .await
        {
            Ok(pool) => pool,
            Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("3D000")) => {
                log::info!("Database missing, attempting to create it");
                create_database_if_missing(database_url).await?;

                PgPoolOptions::new()
                    .max_connections(10)
                    .min_connections(2)
                    .acquire_timeout(Duration::from_secs(5))
                    .idle_timeout(Some(Duration::from_secs(600)))
                    .test_before_acquire(true)
                    .connect(database_url)
                    .await?
            }
            Err(err) => return Err(err),
        };

        // Run embedded migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    // ========================================================================
    // BUSINESS REGISTRATIONS (Approval Workflow)
    // ========================================================================

    pub async fn create_registration(
        &self,
        registration: NewBusinessRegistration,
    ) -> Result<BusinessRegistration, sqlx::Error> {
        let NewBusinessRegistration {
            id,
            name,
            founder,
            email,
            phone,
            category,
            year,
            education,
            location,
            founded,
            stage,
            team_size,
            achievements,
            description,
            image_url,
            social_media,
            status,
            created_at,
        } = registration;

        let record = sqlx::query_as::<_, BusinessRegistration>(&format!(
            r#"
            INSERT INTO business_registrations (
                id, name, founder, email, phone, category, year, education,
                location, founded, stage, team_size, achievements, description,
                image_url, social_media, status, created_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18
            )
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(founder)
        .bind(email)
        .bind(phone)
        .bind(category)
        .bind(year)
        .bind(education)
        .bind(location)
        .bind(founded)
        .bind(stage)
        .bind(team_size)
        .bind(achievements)
        .bind(description)
        .bind(image_url)
        .bind(social_media)
        .bind(status)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_registration_by_id(
        &self,
        registration_id: Uuid,
    ) -> Result<Option<BusinessRegistration>, sqlx::Error> {
        let record = sqlx::query_as::<_, BusinessRegistration>(&format!(
            r#"
            SELECT {REGISTRATION_COLUMNS}
            FROM business_registrations
            WHERE id = $1
            "#
        ))
        .bind(registration_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_registrations(&self) -> Result<Vec<BusinessRegistration>, sqlx::Error> {
        let records = sqlx::query_as::<_, BusinessRegistration>(&format!(
            r#"
            SELECT {REGISTRATION_COLUMNS}
            FROM business_registrations
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Approves a pending registration: flips the status, inserts the listed
    /// business mapped from it and stamps the conversion id, all in one
    /// transaction. Returns `None` when the registration is missing or no
    /// longer pending, in which case nothing is written; a raced or retried
    /// approval therefore cannot duplicate the listing.
    pub async fn approve_registration(
        &self,
        registration_id: Uuid,
    ) -> Result<Option<(BusinessRegistration, Business)>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let registration = sqlx::query_as::<_, BusinessRegistration>(&format!(
            r#"
            UPDATE business_registrations
            SET status = 'approved'
            WHERE id = $1 AND status = 'pending'
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(registration_id)
        .fetch_optional(tx.as_mut())
        .await?;

        let Some(mut registration) = registration else {
            return Ok(None);
        };

        let business =
            Self::insert_business_with_tx(&mut tx, registration.to_listed_business(Utc::now()))
                .await?;

        sqlx::query(
            r#"
            UPDATE business_registrations
            SET converted_business_id = $2
            WHERE id = $1
            "#,
        )
        .bind(registration_id)
        .bind(business.id)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;

        registration.converted_business_id = Some(business.id);
        Ok(Some((registration, business)))
    }

    /// Rejects a pending registration. Returns `None` when the registration is
    /// missing or already reviewed; no listing row is touched either way.
    pub async fn reject_registration(
        &self,
        registration_id: Uuid,
    ) -> Result<Option<BusinessRegistration>, sqlx::Error> {
        let record = sqlx::query_as::<_, BusinessRegistration>(&format!(
            r#"
            UPDATE business_registrations
            SET status = 'rejected'
            WHERE id = $1 AND status = 'pending'
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(registration_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    // ========================================================================
    // LISTED BUSINESSES
    // ========================================================================

    pub async fn create_business(&self, business: NewBusiness) -> Result<Business, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let record = Self::insert_business_with_tx(&mut tx, business).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn insert_business_with_tx(
        tx: &mut Transaction<'_, Postgres>,
        business: NewBusiness,
    ) -> Result<Business, sqlx::Error> {
        let NewBusiness {
            id,
            name,
            category,
            year,
            founder,
            phone,
            email,
            education,
            location,
            founded,
            stage,
            team_size,
            achievements,
            description,
            social_media,
            image_url,
            created_at,
        } = business;

        let record = sqlx::query_as::<_, Business>(&format!(
            r#"
            INSERT INTO businesses (
                id, name, category, year, founder, phone, email, education,
                location, founded, stage, team_size, achievements, description,
                social_media, image_url, created_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17
            )
            RETURNING {BUSINESS_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(category)
        .bind(year)
        .bind(founder)
        .bind(phone)
        .bind(email)
        .bind(education)
        .bind(location)
        .bind(founded)
        .bind(stage)
        .bind(team_size)
        .bind(achievements)
        .bind(description)
        .bind(social_media)
        .bind(image_url)
        .bind(created_at)
        .fetch_one(tx.as_mut())
        .await?;

        Ok(record)
    }

    pub async fn get_business(&self, business_id: Uuid) -> Result<Option<Business>, sqlx::Error> {
        let record = sqlx::query_as::<_, Business>(&format!(
            r#"
            SELECT {BUSINESS_COLUMNS}
            FROM businesses
            WHERE id = $1
            "#
        ))
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_businesses(&self, limit: Option<i64>) -> Result<Vec<Business>, sqlx::Error> {
        let records = sqlx::query_as::<_, Business>(&format!(
            r#"
            SELECT {BUSINESS_COLUMNS}
            FROM businesses
            ORDER BY created_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn update_business(&self, business: Business) -> Result<Business, sqlx::Error> {
        let record = sqlx::query_as::<_, Business>(&format!(
            r#"
            UPDATE businesses
            SET name = $2, category = $3, year = $4, founder = $5, phone = $6,
                email = $7, education = $8, location = $9, founded = $10,
                stage = $11, team_size = $12, achievements = $13,
                description = $14, social_media = $15, image_url = $16
            WHERE id = $1
            RETURNING {BUSINESS_COLUMNS}
            "#
        ))
        .bind(business.id)
        .bind(business.name)
        .bind(business.category)
        .bind(business.year)
        .bind(business.founder)
        .bind(business.phone)
        .bind(business.email)
        .bind(business.education)
        .bind(business.location)
        .bind(business.founded)
        .bind(business.stage)
        .bind(business.team_size)
        .bind(business.achievements)
        .bind(business.description)
        .bind(business.social_media)
        .bind(business.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_business(&self, business_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM businesses WHERE id = $1")
            .bind(business_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // ========================================================================
    // BLOG POSTS
    // ========================================================================

    pub async fn create_post(&self, post: NewPost) -> Result<Post, sqlx::Error> {
        let NewPost {
            id,
            title,
            slug,
            excerpt,
            content,
            cover_image_url,
            author,
            published,
            published_at,
            created_at,
        } = post;

        let record = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (
                id, title, slug, excerpt, content, cover_image_url, author,
                published, published_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(excerpt)
        .bind(content)
        .bind(cover_image_url)
        .bind(author)
        .bind(published)
        .bind(published_at)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
        let record = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE id = $1
            "#
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Public blog list: published posts only, newest publication first.
    pub async fn list_published_posts(&self) -> Result<Vec<Post>, sqlx::Error> {
        let records = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE published = TRUE
            ORDER BY published_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Public detail route: a draft is never fetchable by slug.
    pub async fn get_published_post_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Post>, sqlx::Error> {
        let record = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE slug = $1 AND published = TRUE
            "#
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Admin list: drafts included, newest creation first.
    pub async fn list_posts(&self) -> Result<Vec<Post>, sqlx::Error> {
        let records = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn update_post(&self, post: Post) -> Result<Post, sqlx::Error> {
        let record = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET title = $2, slug = $3, excerpt = $4, content = $5,
                cover_image_url = $6, author = $7, published = $8,
                published_at = $9
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(post.id)
        .bind(post.title)
        .bind(post.slug)
        .bind(post.excerpt)
        .bind(post.content)
        .bind(post.cover_image_url)
        .bind(post.author)
        .bind(post.published)
        .bind(post.published_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // ========================================================================
    // COMMITTEE MEMBERS
    // ========================================================================

    pub async fn create_committee_member(
        &self,
        name: String,
        position: String,
        year: i32,
        image_url: Option<String>,
    ) -> Result<CommitteeMember, sqlx::Error> {
        let record = sqlx::query_as::<_, CommitteeMember>(
            r#"
            INSERT INTO committee_members (id, name, position, year, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, position, year, image_url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(position)
        .bind(year)
        .bind(image_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_committee_members(&self) -> Result<Vec<CommitteeMember>, sqlx::Error> {
        let records = sqlx::query_as::<_, CommitteeMember>(
            r#"
            SELECT id, name, position, year, image_url, created_at
            FROM committee_members
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn update_committee_member(
        &self,
        member_id: Uuid,
        name: String,
        position: String,
        year: i32,
        image_url: Option<String>,
    ) -> Result<Option<CommitteeMember>, sqlx::Error> {
        let record = sqlx::query_as::<_, CommitteeMember>(
            r#"
            UPDATE committee_members
            SET name = $2, position = $3, year = $4, image_url = $5
            WHERE id = $1
            RETURNING id, name, position, year, image_url, created_at
            "#,
        )
        .bind(member_id)
        .bind(name)
        .bind(position)
        .bind(year)
        .bind(image_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_committee_member(&self, member_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM committee_members WHERE id = $1")
            .bind(member_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // ========================================================================
    // GALLERY IMAGES
    // ========================================================================

    pub async fn create_gallery_image(
        &self,
        url: String,
        caption: Option<String>,
        height: Option<i32>,
    ) -> Result<GalleryImage, sqlx::Error> {
        let record = sqlx::query_as::<_, GalleryImage>(
            r#"
            INSERT INTO gallery_images (id, url, caption, height, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, url, caption, height, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(url)
        .bind(caption)
        .bind(height)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_gallery_images(&self) -> Result<Vec<GalleryImage>, sqlx::Error> {
        let records = sqlx::query_as::<_, GalleryImage>(
            r#"
            SELECT id, url, caption, height, created_at
            FROM gallery_images
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn update_gallery_image(
        &self,
        image_id: Uuid,
        url: String,
        caption: Option<String>,
        height: Option<i32>,
    ) -> Result<Option<GalleryImage>, sqlx::Error> {
        let record = sqlx::query_as::<_, GalleryImage>(
            r#"
            UPDATE gallery_images
            SET url = $2, caption = $3, height = $4
            WHERE id = $1
            RETURNING id, url, caption, height, created_at
            "#,
        )
        .bind(image_id)
        .bind(url)
        .bind(caption)
        .bind(height)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_gallery_image(&self, image_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM gallery_images WHERE id = $1")
            .bind(image_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // ========================================================================
    // DASHBOARD
    // ========================================================================

    pub async fn get_dashboard_stats(&self) -> Result<DashboardStats, sqlx::Error> {
        let record = sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM business_registrations WHERE status = 'pending')
                    AS pending_registrations,
                (SELECT COUNT(*) FROM businesses) AS businesses,
                (SELECT COUNT(*) FROM posts WHERE published = TRUE) AS published_posts,
                (SELECT COUNT(*) FROM committee_members) AS committee_members,
                (SELECT COUNT(*) FROM gallery_images) AS gallery_images
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    // ========================================================================
    // ADMIN ACCOUNTS
    // ========================================================================

    pub async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>, sqlx::Error> {
        let record = sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM admins
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    let options: PgConnectOptions = database_url.parse()?;
    let database_name = options
        .get_database()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "postgres".to_string());

    // If we're already targeting the default maintenance database, nothing to do.
    if database_name.eq_ignore_ascii_case("postgres") {
        return Ok(());
    }

    let maintenance_options = options.clone().database("postgres");

    let mut connection = sqlx::postgres::PgConnection::connect_with(&maintenance_options).await?;

    let escaped_name = database_name.replace('"', "\"\"");
    let create_stmt = format!("CREATE DATABASE \"{}\"", escaped_name);

    match connection.execute(create_stmt.as_str()).await {
        Ok(_) => {
            log::info!("Created database '{}'", database_name);
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("42P04")) => {
            log::info!("Database '{}' already exists", database_name);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistrationStatus;

    fn sample_registration(name: &str) -> NewBusinessRegistration {
        NewBusinessRegistration {
            id: Uuid::new_v4(),
            name: name.to_string(),
            founder: "Ama Mensah".to_string(),
            email: "ama@ashesi.edu.gh".to_string(),
            phone: None,
            category: Some("Fashion".to_string()),
            year: Some("2024".to_string()),
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
            created_at: Utc::now(),
        }
    }

    async fn business_count(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM businesses")
            .fetch_one(pool)
            .await
            .expect("count businesses")
    }

    #[sqlx::test]
    async fn approval_creates_the_listing_exactly_once(pool: PgPool) {
        let db = Database { pool: pool.clone() };
        let created = db
            .create_registration(sample_registration("Kente Threads"))
            .await
            .expect("create registration");

        let (registration, business) = db
            .approve_registration(created.id)
            .await
            .expect("approve")
            .expect("first approval goes through");
        assert_eq!(registration.status, RegistrationStatus::Approved);
        assert_eq!(registration.converted_business_id, Some(business.id));
        assert_eq!(business_count(&pool).await, 1);

        // A retried approval matches no pending row and writes nothing.
        let retried = db.approve_registration(created.id).await.expect("retry");
        assert!(retried.is_none());
        assert_eq!(business_count(&pool).await, 1);
    }

    #[sqlx::test]
    async fn approving_an_already_reviewed_registration_is_refused(pool: PgPool) {
        let db = Database { pool: pool.clone() };
        let created = db
            .create_registration(sample_registration("Kente Threads"))
            .await
            .expect("create registration");

        sqlx::query("UPDATE business_registrations SET status = 'approved' WHERE id = $1")
            .bind(created.id)
            .execute(&pool)
            .await
            .expect("mark reviewed");

        let outcome = db.approve_registration(created.id).await.expect("approve");
        assert!(outcome.is_none());
        assert_eq!(business_count(&pool).await, 0);
    }

    #[sqlx::test]
    async fn review_decisions_are_terminal(pool: PgPool) {
        let db = Database { pool: pool.clone() };
        let created = db
            .create_registration(sample_registration("Kente Threads"))
            .await
            .expect("create registration");

        let rejected = db
            .reject_registration(created.id)
            .await
            .expect("reject")
            .expect("first rejection goes through");
        assert_eq!(rejected.status, RegistrationStatus::Rejected);
        assert_eq!(business_count(&pool).await, 0);

        assert!(db.approve_registration(created.id).await.expect("approve").is_none());
        assert!(db.reject_registration(created.id).await.expect("re-reject").is_none());
        assert_eq!(business_count(&pool).await, 0);

        let stored = db
            .get_registration_by_id(created.id)
            .await
            .expect("fetch")
            .expect("row kept");
        assert_eq!(stored.status, RegistrationStatus::Rejected);
    }

    #[sqlx::test]
    async fn registrations_list_newest_first(pool: PgPool) {
        let db = Database { pool: pool.clone() };

        let mut first = sample_registration("First");
        first.created_at = Utc::now() - chrono::Duration::minutes(2);
        let mut second = sample_registration("Second");
        second.created_at = Utc::now() - chrono::Duration::minutes(1);
        let third = sample_registration("Third");

        db.create_registration(first).await.expect("create first");
        db.create_registration(second).await.expect("create second");
        db.create_registration(third).await.expect("create third");

        let names: Vec<String> = db
            .list_registrations()
            .await
            .expect("list")
            .into_iter()
            .map(|reg| reg.name)
            .collect();
        assert_eq!(names, ["Third", "Second", "First"]);
    }
}
