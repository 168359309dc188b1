use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Blog rows. Each call is atomic at single-row granularity.
#[async_trait]
pub trait BlogRepo: Send + Sync {
    async fn create_blog(&self, new: NewBlog) -> RepoResult<BlogPost>;
    async fn get_blog(&self, id: Id) -> RepoResult<BlogPost>;
    async fn update_blog(&self, id: Id, upd: BlogUpdate) -> RepoResult<BlogPost>;
    async fn delete_blog(&self, id: Id) -> RepoResult<()>;
    /// One page of summaries, newest first, plus the total row count.
    async fn list_blogs(&self, page: PageRequest) -> RepoResult<(Vec<BlogSummary>, i64)>;
    /// Up to `limit` randomly chosen posts other than `exclude`.
    async fn random_blogs(&self, exclude: Id, limit: i64) -> RepoResult<Vec<BlogSummary>>;
}

#[async_trait]
pub trait GuestRepo: Send + Sync {
    async fn create_guest(&self, new: NewGuest) -> RepoResult<Guest>;
    async fn get_guest(&self, id: Id) -> RepoResult<Guest>;
    async fn list_guests(&self) -> RepoResult<Vec<GuestSummary>>;
    async fn update_guest(&self, id: Id, upd: GuestUpdate) -> RepoResult<Guest>;
    async fn delete_guest(&self, id: Id) -> RepoResult<()>;
}

pub trait Repo: BlogRepo + GuestRepo {}

impl<T> Repo for T where T: BlogRepo + GuestRepo {}

/// Process-local repository for tests and database-less development runs.
pub mod inmem {
    use super::*;
    use rand::seq::SliceRandom;

    #[derive(Default)]
    struct State {
        // insertion order doubles as creation order
        blogs: Vec<BlogPost>,
        guests: Vec<Guest>,
    }

    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }
    }

    #[async_trait]
    impl BlogRepo for InMemRepo {
        async fn create_blog(&self, new: NewBlog) -> RepoResult<BlogPost> {
            let now = Utc::now();
            let post = BlogPost {
                id: new.id,
                title: new.title,
                author: new.author,
                user_id: new.user_id,
                thumbnail: new.thumbnail,
                content: new.content,
                created_at: now,
                updated_at: now,
            };
            self.write()?.blogs.push(post.clone());
            Ok(post)
        }

        async fn get_blog(&self, id: Id) -> RepoResult<BlogPost> {
            self.read()?.blogs.iter().find(|b| b.id == id).cloned().ok_or(RepoError::NotFound)
        }

        async fn update_blog(&self, id: Id, upd: BlogUpdate) -> RepoResult<BlogPost> {
            let mut s = self.write()?;
            let post = s.blogs.iter_mut().find(|b| b.id == id).ok_or(RepoError::NotFound)?;
            post.title = upd.title;
            post.author = upd.author;
            post.thumbnail = upd.thumbnail;
            post.content = upd.content;
            post.updated_at = Utc::now();
            Ok(post.clone())
        }

        async fn delete_blog(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            let before = s.blogs.len();
            s.blogs.retain(|b| b.id != id);
            if s.blogs.len() == before { Err(RepoError::NotFound) } else { Ok(()) }
        }

        async fn list_blogs(&self, page: PageRequest) -> RepoResult<(Vec<BlogSummary>, i64)> {
            let s = self.read()?;
            let items = s
                .blogs
                .iter()
                .rev()
                .skip(page.offset().unwrap_or(i64::MAX).max(0) as usize)
                .take(page.limit.max(0) as usize)
                .map(BlogSummary::from)
                .collect();
            Ok((items, s.blogs.len() as i64))
        }

        async fn random_blogs(&self, exclude: Id, limit: i64) -> RepoResult<Vec<BlogSummary>> {
            let s = self.read()?;
            let mut others: Vec<BlogSummary> =
                s.blogs.iter().filter(|b| b.id != exclude).map(BlogSummary::from).collect();
            others.shuffle(&mut rand::thread_rng());
            others.truncate(limit.max(0) as usize);
            Ok(others)
        }
    }

    #[async_trait]
    impl GuestRepo for InMemRepo {
        async fn create_guest(&self, new: NewGuest) -> RepoResult<Guest> {
            let now = Utc::now();
            let p = new.profile;
            let guest = Guest {
                id: new.id,
                image: new.image,
                name: p.name,
                role: p.role,
                about: p.about,
                instagram: p.instagram,
                twitter: p.twitter,
                threads: p.threads,
                heading_one: p.heading_one,
                description_one: p.description_one,
                heading_two: p.heading_two,
                description_two: p.description_two,
                heading_three: p.heading_three,
                description_three: p.description_three,
                youtube_link: p.youtube_link,
                user_id: new.user_id,
                created_at: now,
                updated_at: now,
            };
            self.write()?.guests.push(guest.clone());
            Ok(guest)
        }

        async fn get_guest(&self, id: Id) -> RepoResult<Guest> {
            self.read()?.guests.iter().find(|g| g.id == id).cloned().ok_or(RepoError::NotFound)
        }

        async fn list_guests(&self) -> RepoResult<Vec<GuestSummary>> {
            Ok(self.read()?.guests.iter().map(GuestSummary::from).collect())
        }

        async fn update_guest(&self, id: Id, upd: GuestUpdate) -> RepoResult<Guest> {
            let mut s = self.write()?;
            let g = s.guests.iter_mut().find(|g| g.id == id).ok_or(RepoError::NotFound)?;
            let p = upd.profile;
            g.image = upd.image;
            g.name = p.name;
            g.role = p.role;
            g.about = p.about;
            g.instagram = p.instagram;
            g.twitter = p.twitter;
            g.threads = p.threads;
            g.heading_one = p.heading_one;
            g.description_one = p.description_one;
            g.heading_two = p.heading_two;
            g.description_two = p.description_two;
            g.heading_three = p.heading_three;
            g.description_three = p.description_three;
            g.youtube_link = p.youtube_link;
            g.updated_at = Utc::now();
            Ok(g.clone())
        }

        async fn delete_guest(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            let before = s.guests.len();
            s.guests.retain(|g| g.id != id);
            if s.guests.len() == before { Err(RepoError::NotFound) } else { Ok(()) }
        }
    }
}

/// Postgres implementation; schema in `migrations/`.
pub mod pg {
    use super::*;
    use crate::content::ContentBlock;
    use chrono::DateTime;
    use sqlx::types::Json;
    use sqlx::{Pool, Postgres};

    const BLOG_COLUMNS: &str =
        "id, title, author, user_id, thumbnail, content, created_at, updated_at";
    const SUMMARY_COLUMNS: &str = "id, title, author, thumbnail, created_at, updated_at";
    const GUEST_COLUMNS: &str = "id, image, name, role, about, instagram, twitter, threads, \
        heading_one, description_one, heading_two, description_two, heading_three, \
        description_three, youtube_link, user_id, created_at, updated_at";

    #[derive(sqlx::FromRow)]
    struct BlogRow {
        id: Id,
        title: String,
        author: Option<String>,
        user_id: Option<String>,
        thumbnail: Option<String>,
        content: Json<Vec<ContentBlock>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl From<BlogRow> for BlogPost {
        fn from(r: BlogRow) -> Self {
            BlogPost {
                id: r.id,
                title: r.title,
                author: r.author,
                user_id: r.user_id,
                thumbnail: r.thumbnail,
                content: r.content.0,
                created_at: r.created_at,
                updated_at: r.updated_at,
            }
        }
    }

    fn db_err(e: sqlx::Error) -> RepoError {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            other => RepoError::Internal(other.to_string()),
        }
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }
    }

    #[async_trait]
    impl BlogRepo for PgRepo {
        async fn create_blog(&self, new: NewBlog) -> RepoResult<BlogPost> {
            let row = sqlx::query_as::<_, BlogRow>(&format!(
                "INSERT INTO blogs (id, title, author, user_id, thumbnail, content) \
                 VALUES ($1,$2,$3,$4,$5,$6) RETURNING {BLOG_COLUMNS}"
            ))
            .bind(new.id)
            .bind(&new.title)
            .bind(&new.author)
            .bind(&new.user_id)
            .bind(&new.thumbnail)
            .bind(Json(&new.content))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
            Ok(row.into())
        }

        async fn get_blog(&self, id: Id) -> RepoResult<BlogPost> {
            let row = sqlx::query_as::<_, BlogRow>(&format!(
                "SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"
            ))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
            Ok(row.into())
        }

        async fn update_blog(&self, id: Id, upd: BlogUpdate) -> RepoResult<BlogPost> {
            let row = sqlx::query_as::<_, BlogRow>(&format!(
                "UPDATE blogs SET title = $2, author = $3, thumbnail = $4, content = $5, \
                 updated_at = now() WHERE id = $1 RETURNING {BLOG_COLUMNS}"
            ))
            .bind(id)
            .bind(&upd.title)
            .bind(&upd.author)
            .bind(&upd.thumbnail)
            .bind(Json(&upd.content))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
            Ok(row.into())
        }

        async fn delete_blog(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM blogs WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
            if res.rows_affected() == 0 { Err(RepoError::NotFound) } else { Ok(()) }
        }

        async fn list_blogs(&self, page: PageRequest) -> RepoResult<(Vec<BlogSummary>, i64)> {
            let items = sqlx::query_as::<_, BlogSummary>(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM blogs ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
            ))
            .bind(page.limit)
            .bind(page.offset().ok_or_else(|| RepoError::Internal("page offset out of range".into()))?)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blogs")
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
            Ok((items, total))
        }

        async fn random_blogs(&self, exclude: Id, limit: i64) -> RepoResult<Vec<BlogSummary>> {
            sqlx::query_as::<_, BlogSummary>(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM blogs WHERE id <> $1 ORDER BY random() LIMIT $2"
            ))
            .bind(exclude)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
        }
    }

    #[async_trait]
    impl GuestRepo for PgRepo {
        async fn create_guest(&self, new: NewGuest) -> RepoResult<Guest> {
            let p = &new.profile;
            sqlx::query_as::<_, Guest>(&format!(
                "INSERT INTO guests (id, image, name, role, about, instagram, twitter, threads, \
                 heading_one, description_one, heading_two, description_two, heading_three, \
                 description_three, youtube_link, user_id) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16) \
                 RETURNING {GUEST_COLUMNS}"
            ))
            .bind(new.id)
            .bind(&new.image)
            .bind(&p.name)
            .bind(&p.role)
            .bind(&p.about)
            .bind(&p.instagram)
            .bind(&p.twitter)
            .bind(&p.threads)
            .bind(&p.heading_one)
            .bind(&p.description_one)
            .bind(&p.heading_two)
            .bind(&p.description_two)
            .bind(&p.heading_three)
            .bind(&p.description_three)
            .bind(&p.youtube_link)
            .bind(&new.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
        }

        async fn get_guest(&self, id: Id) -> RepoResult<Guest> {
            sqlx::query_as::<_, Guest>(&format!("SELECT {GUEST_COLUMNS} FROM guests WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn list_guests(&self) -> RepoResult<Vec<GuestSummary>> {
            sqlx::query_as::<_, GuestSummary>(
                "SELECT id, image, name, role, instagram, twitter, threads FROM guests ORDER BY created_at",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
        }

        async fn update_guest(&self, id: Id, upd: GuestUpdate) -> RepoResult<Guest> {
            let p = &upd.profile;
            sqlx::query_as::<_, Guest>(&format!(
                "UPDATE guests SET image = $2, name = $3, role = $4, about = $5, instagram = $6, \
                 twitter = $7, threads = $8, heading_one = $9, description_one = $10, \
                 heading_two = $11, description_two = $12, heading_three = $13, \
                 description_three = $14, youtube_link = $15, updated_at = now() \
                 WHERE id = $1 RETURNING {GUEST_COLUMNS}"
            ))
            .bind(id)
            .bind(&upd.image)
            .bind(&p.name)
            .bind(&p.role)
            .bind(&p.about)
            .bind(&p.instagram)
            .bind(&p.twitter)
            .bind(&p.threads)
            .bind(&p.heading_one)
            .bind(&p.description_one)
            .bind(&p.heading_two)
            .bind(&p.description_two)
            .bind(&p.heading_three)
            .bind(&p.description_three)
            .bind(&p.youtube_link)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
        }

        async fn delete_guest(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM guests WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
            if res.rows_affected() == 0 { Err(RepoError::NotFound) } else { Ok(()) }
        }
    }
}
