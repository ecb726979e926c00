use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::{
    db::SpotStore,
    error::{AppError, AppResult},
    geo::CellId,
    models::{
        Caption, DensityScore, ImageUrl, Post, PostId, ResonantUser, Spot, SpotId, SpotName,
        UserId, Username,
    },
};

/// PostgreSQL-backed [`SpotStore`]
#[derive(Clone)]
pub struct PgSpotStore {
    pool: PgPool,
}

impl PgSpotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ResonanceRow {
    user_id: i64,
    match_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SpotRow {
    id: i64,
    name: String,
    latitude: f64,
    longitude: f64,
    registered_user_id: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    user_id: i64,
    user_name: String,
    spot_id: i64,
    image_url: String,
    caption: String,
    posted_at: DateTime<Utc>,
}

/// Tags a validation failure on a stored row as a storage fault
fn corrupt(table: &str, id: i64, err: AppError) -> AppError {
    AppError::Storage(format!("malformed {} row {}: {}", table, id, err))
}

impl TryFrom<ResonanceRow> for ResonantUser {
    type Error = AppError;

    fn try_from(row: ResonanceRow) -> AppResult<Self> {
        let user_id = UserId::new(row.user_id).map_err(|e| corrupt("posts", row.user_id, e))?;
        let match_count = u32::try_from(row.match_count).map_err(|_| {
            AppError::Storage(format!(
                "match count {} out of range for user {}",
                row.match_count, row.user_id
            ))
        })?;
        Ok(ResonantUser {
            user_id,
            match_count,
        })
    }
}

impl TryFrom<SpotRow> for Spot {
    type Error = AppError;

    fn try_from(row: SpotRow) -> AppResult<Self> {
        let id = row.id;
        let build = || -> AppResult<Spot> {
            Spot::new(
                SpotId::new(row.id)?,
                SpotName::new(row.name)?,
                row.latitude,
                row.longitude,
                UserId::new(row.registered_user_id)?,
            )
        };
        build().map_err(|e| corrupt("spots", id, e))
    }
}

impl TryFrom<PostRow> for Post {
    type Error = AppError;

    fn try_from(row: PostRow) -> AppResult<Self> {
        let id = row.id;
        let build = || -> AppResult<Post> {
            Ok(Post {
                id: PostId::new(row.id)?,
                author: UserId::new(row.user_id)?,
                author_name: Username::new(row.user_name)?,
                spot_id: SpotId::new(row.spot_id)?,
                image_url: ImageUrl::new(row.image_url)?,
                caption: Caption::new(row.caption)?,
                posted_at: row.posted_at,
            })
        };
        build().map_err(|e| corrupt("posts", id, e))
    }
}

#[async_trait::async_trait]
impl SpotStore for PgSpotStore {
    #[instrument(skip(self), fields(store = "postgres"))]
    async fn resonant_users(&self, user_id: UserId) -> AppResult<Vec<ResonantUser>> {
        let rows = sqlx::query_as::<_, ResonanceRow>(
            r#"
            SELECT p.user_id, COUNT(DISTINCT p.spot_id) AS match_count
            FROM posts p
            WHERE p.spot_id IN (
                SELECT mine.spot_id FROM posts mine WHERE mine.user_id = $1
            )
            AND p.user_id <> $1
            GROUP BY p.user_id
            ORDER BY p.user_id
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(count = rows.len(), "Resolved resonant users");

        rows.into_iter().map(ResonantUser::try_from).collect()
    }

    #[instrument(
        skip(self, cells, owners),
        fields(store = "postgres", cells = cells.len(), owners = owners.len())
    )]
    async fn find_spots(&self, cells: &[CellId], owners: &[UserId]) -> AppResult<Vec<Spot>> {
        if cells.is_empty() || owners.is_empty() {
            return Ok(Vec::new());
        }

        let cell_ids: Vec<String> = cells.iter().map(|c| c.as_str().to_string()).collect();
        let owner_ids: Vec<i64> = owners.iter().map(UserId::value).collect();

        let rows = sqlx::query_as::<_, SpotRow>(
            r#"
            SELECT id, name, latitude, longitude, registered_user_id
            FROM spots
            WHERE cell_id = ANY($1) AND registered_user_id = ANY($2)
            ORDER BY id
            "#,
        )
        .bind(&cell_ids)
        .bind(&owner_ids)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(count = rows.len(), "Fetched candidate spots");

        rows.into_iter().map(Spot::try_from).collect()
    }

    #[instrument(skip(self), fields(store = "postgres", cell = %cell))]
    async fn density(&self, cell: &CellId) -> AppResult<DensityScore> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(p.id)
            FROM posts p
            JOIN spots s ON p.spot_id = s.id
            WHERE s.cell_id = $1
            "#,
        )
        .bind(cell.as_str())
        .fetch_one(&self.pool)
        .await?;

        DensityScore::from_count(count)
    }

    #[instrument(skip(self), fields(store = "postgres", spot_id = %spot_id))]
    async fn find_posts(&self, spot_id: SpotId) -> AppResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, user_id, user_name, spot_id, image_url, caption, posted_at
            FROM posts
            WHERE spot_id = $1
            ORDER BY posted_at DESC, id DESC
            "#,
        )
        .bind(spot_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Post::try_from).collect()
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
