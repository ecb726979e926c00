use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{TimeZone, Utc};

use distill_api::{
    db::SpotStore,
    error::{AppError, AppResult},
    geo::CellId,
    models::{
        Caption, DensityScore, ImageUrl, Post, PostId, ResonantUser, Spot, SpotId, SpotName,
        UserId, Username,
    },
};

/// Fixture store holding spots and posts in memory
#[derive(Default)]
pub struct InMemoryStore {
    spots: Vec<Spot>,
    posts: Vec<Post>,
    pub fail_density: bool,
    pub calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spot(mut self, id: i64, owner: i64, name: &str, lat: f64, lng: f64) -> Self {
        let spot = Spot::new(
            SpotId::new(id).unwrap(),
            SpotName::new(name).unwrap(),
            lat,
            lng,
            UserId::new(owner).unwrap(),
        )
        .unwrap();
        self.spots.push(spot);
        self
    }

    pub fn with_post(mut self, id: i64, author: i64, spot_id: i64, caption: &str) -> Self {
        self.posts.push(Post {
            id: PostId::new(id).unwrap(),
            author: UserId::new(author).unwrap(),
            author_name: Username::new(format!("user{:03}", author)).unwrap(),
            spot_id: SpotId::new(spot_id).unwrap(),
            image_url: ImageUrl::new(format!("https://img.example.com/{}.jpg", id)).unwrap(),
            caption: Caption::new(caption).unwrap(),
            posted_at: Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap() + chrono::Duration::minutes(id),
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SpotStore for InMemoryStore {
    async fn resonant_users(&self, user_id: UserId) -> AppResult<Vec<ResonantUser>> {
        self.record();
        let mine: HashSet<SpotId> = self
            .posts
            .iter()
            .filter(|p| p.author == user_id)
            .map(|p| p.spot_id)
            .collect();

        let mut shared: BTreeMap<UserId, HashSet<SpotId>> = BTreeMap::new();
        for post in &self.posts {
            if post.author != user_id && mine.contains(&post.spot_id) {
                shared.entry(post.author).or_default().insert(post.spot_id);
            }
        }

        Ok(shared
            .into_iter()
            .map(|(user_id, spots)| ResonantUser {
                user_id,
                match_count: spots.len() as u32,
            })
            .collect())
    }

    async fn find_spots(&self, cells: &[CellId], owners: &[UserId]) -> AppResult<Vec<Spot>> {
        self.record();
        Ok(self
            .spots
            .iter()
            .filter(|s| cells.contains(&s.cell) && owners.contains(&s.owner))
            .cloned()
            .collect())
    }

    async fn density(&self, cell: &CellId) -> AppResult<DensityScore> {
        self.record();
        if self.fail_density {
            return Err(AppError::Storage("density query failed".to_string()));
        }
        let in_cell: HashSet<SpotId> = self
            .spots
            .iter()
            .filter(|s| &s.cell == cell)
            .map(|s| s.id)
            .collect();
        let count = self
            .posts
            .iter()
            .filter(|p| in_cell.contains(&p.spot_id))
            .count();
        Ok(DensityScore::new(count as u64))
    }

    async fn find_posts(&self, spot_id: SpotId) -> AppResult<Vec<Post>> {
        self.record();
        Ok(self
            .posts
            .iter()
            .filter(|p| p.spot_id == spot_id)
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Alice (1) and Bob (2) both posted at Bob's spot in Ebisu; Carol (3) posted
/// at Alice's spot. Dave (4) never overlaps with anyone.
pub fn neighbourhood() -> InMemoryStore {
    InMemoryStore::new()
        .with_spot(1, 2, "Bob's Hideaway", 35.6467, 139.7101)
        .with_spot(2, 1, "Alice's Corner", 35.6567, 139.7101)
        .with_spot(3, 4, "Dave's Far Place", 43.0621, 141.3544)
        .with_post(10, 2, 1, "first visit")
        .with_post(11, 1, 1, "great coffee")
        .with_post(12, 3, 1, "quiet evening")
        .with_post(13, 1, 2, "my place")
        .with_post(14, 3, 2, "visited alice")
        .with_post(15, 4, 3, "all alone")
}
