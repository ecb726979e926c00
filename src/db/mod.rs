//! Storage contracts consumed by the distillation engine
//!
//! The engine only ever reads. Spots and posts are written by the registration
//! workflow, which relies on the unique `cell_id` constraint to keep one spot
//! per cell.

use crate::{
    error::AppResult,
    geo::CellId,
    models::{DensityScore, Post, ResonantUser, Spot, SpotId, UserId},
};

pub mod postgres;
pub mod spot_store;

pub use postgres::{create_pool, run_migrations};
pub use spot_store::PgSpotStore;

/// Read-only access to spots and posts
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotStore: Send + Sync {
    /// Users other than `user_id` who posted at a spot `user_id` also posted at
    ///
    /// Each entry carries the number of distinct shared spots. An empty list
    /// means no overlap and is not an error.
    async fn resonant_users(&self, user_id: UserId) -> AppResult<Vec<ResonantUser>>;

    /// Spots located in one of `cells` and registered by one of `owners`
    async fn find_spots(&self, cells: &[CellId], owners: &[UserId]) -> AppResult<Vec<Spot>>;

    /// Every post ever made at any spot in `cell`
    async fn density(&self, cell: &CellId) -> AppResult<DensityScore>;

    /// All posts made at `spot_id`
    async fn find_posts(&self, spot_id: SpotId) -> AppResult<Vec<Post>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
