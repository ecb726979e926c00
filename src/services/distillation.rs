use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::instrument;

use crate::{
    db::SpotStore,
    error::{AppError, AppResult},
    geo::{distance_km, CellId, Coordinate},
    models::{Distillation, Post, Reason, ResonanceCount, ResonantUser, TotalScore, UserId},
    services::{
        deadline::Deadline,
        scoring::{select_representatives, ScoredCandidate, ScoringWeights},
    },
};

/// Picks the single best spot for a user standing at a coordinate
///
/// Every call recomputes from the store: quantize the position, resolve the
/// user's resonance circle, collect their spots in the surrounding 3x3 cells,
/// keep one representative per cell, score each, and assemble the winner.
/// Any failure aborts the pass; there are no partial results.
#[derive(Clone)]
pub struct Distiller {
    store: Arc<dyn SpotStore>,
    weights: ScoringWeights,
}

impl Distiller {
    pub fn new(store: Arc<dyn SpotStore>, weights: ScoringWeights) -> Self {
        Self { store, weights }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Runs the pipeline with no deadline
    pub async fn distill(
        &self,
        user_id: UserId,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<Distillation> {
        self.distill_within(user_id, latitude, longitude, Deadline::none())
            .await
    }

    /// Runs the pipeline, refusing further storage calls once `deadline` passes
    #[instrument(skip(self, deadline), fields(store = self.store.name()))]
    pub async fn distill_within(
        &self,
        user_id: UserId,
        latitude: f64,
        longitude: f64,
        deadline: Deadline,
    ) -> AppResult<Distillation> {
        // Validation happens before any storage access
        let origin = Coordinate::new(latitude, longitude)?;
        let cell = CellId::of(&origin);
        let cells = cell.with_neighbors();

        let resonant = self.resolve_resonance(user_id, deadline).await?;
        let resonance: HashMap<UserId, u32> = resonant
            .iter()
            .map(|r| (r.user_id, r.match_count))
            .collect();

        let owners: Vec<UserId> = resonant.iter().map(|r| r.user_id).collect();
        let candidates = deadline
            .guard("candidate lookup", self.store.find_spots(&cells, &owners))
            .await?;

        tracing::debug!(
            cell = %cell,
            searched_cells = cells.len(),
            candidates = candidates.len(),
            "Collected candidate spots"
        );

        let representatives = select_representatives(candidates, &resonance);

        let mut best: Option<ScoredCandidate> = None;
        for (cell_id, representative) in representatives {
            let density = deadline
                .guard("density lookup", self.store.density(&cell_id))
                .await?;
            let distance = distance_km(&origin, &representative.spot.location);
            let score = self
                .weights
                .score(representative.match_count, density, distance);

            tracing::debug!(
                cell = %cell_id,
                spot_id = %representative.spot.id,
                match_count = representative.match_count,
                density = density.value(),
                distance_km = distance,
                score,
                "Scored representative"
            );

            let scored = ScoredCandidate {
                representative,
                density,
                distance_km: distance,
                score,
            };
            if scored.beats(best.as_ref()) {
                best = Some(scored);
            }
        }

        let Some(winner) = best else {
            tracing::info!(user_id = %user_id, "No representative scored above zero");
            return Err(AppError::NoViableCandidate);
        };

        self.assemble(winner, &resonance, deadline).await
    }

    /// Resolves the resonance circle; an empty circle ends the distillation
    async fn resolve_resonance(
        &self,
        user_id: UserId,
        deadline: Deadline,
    ) -> AppResult<Vec<ResonantUser>> {
        let resonant: Vec<ResonantUser> = deadline
            .guard("resonance lookup", self.store.resonant_users(user_id))
            .await?
            .into_iter()
            .filter(|r| r.user_id != user_id)
            .collect();

        if resonant.is_empty() {
            tracing::info!(user_id = %user_id, "User has no resonant users");
            return Err(AppError::NoResonanceFound);
        }

        tracing::info!(
            user_id = %user_id,
            resonant_users = resonant.len(),
            "Resolved resonance circle"
        );

        Ok(resonant)
    }

    /// Packages the winner with its reason and the resonant users' posts
    async fn assemble(
        &self,
        winner: ScoredCandidate,
        resonance: &HashMap<UserId, u32>,
        deadline: Deadline,
    ) -> AppResult<Distillation> {
        let spot = winner.representative.spot;
        let resonance_count = ResonanceCount::new(winner.representative.match_count);
        let total_score = TotalScore::new(winner.score)?;
        let reason = Reason::explain(resonance_count, winner.density);

        let circle: HashSet<UserId> = resonance.keys().copied().collect();
        let posts: Vec<Post> = deadline
            .guard("post lookup", self.store.find_posts(spot.id))
            .await?
            .into_iter()
            .filter(|post| circle.contains(&post.author))
            .collect();

        tracing::info!(
            spot_id = %spot.id,
            cell = %spot.cell,
            total_score = total_score.value(),
            resonance = resonance_count.value(),
            density = winner.density.value(),
            posts = posts.len(),
            "Distilled recommendation"
        );

        Ok(Distillation {
            spot,
            total_score,
            resonance: resonance_count,
            density: winner.density,
            reason,
            posts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockSpotStore;
    use crate::models::{
        Caption, DensityScore, ImageUrl, PostId, Spot, SpotId, SpotName, Username,
    };
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const REQUESTER: i64 = 1;

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn resonant(id: i64, match_count: u32) -> ResonantUser {
        ResonantUser {
            user_id: user(id),
            match_count,
        }
    }

    fn spot(id: i64, owner: i64, lat: f64, lng: f64) -> Spot {
        Spot::new(
            SpotId::new(id).unwrap(),
            SpotName::new(format!("spot-{}", id)).unwrap(),
            lat,
            lng,
            user(owner),
        )
        .unwrap()
    }

    fn post(id: i64, author: i64, spot_id: i64) -> Post {
        Post {
            id: PostId::new(id).unwrap(),
            author: user(author),
            author_name: Username::new(format!("user-{}", author)).unwrap(),
            spot_id: SpotId::new(spot_id).unwrap(),
            image_url: ImageUrl::new(format!("https://img.example.com/{}.jpg", id)).unwrap(),
            caption: Caption::new("view from the bench").unwrap(),
            posted_at: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn distiller(store: MockSpotStore) -> Distiller {
        Distiller::new(Arc::new(store), ScoringWeights::default())
    }

    fn mock_store() -> MockSpotStore {
        let mut store = MockSpotStore::new();
        store.expect_name().return_const("mock");
        store
    }

    #[tokio::test]
    async fn test_invalid_coordinates_never_touch_storage() {
        for (lat, lng) in [(91.0, 0.0), (0.0, 181.0), (-90.5, 10.0), (f64::NAN, 0.0)] {
            let mut store = mock_store();
            store.expect_resonant_users().times(0);
            store.expect_find_spots().times(0);
            store.expect_density().times(0);
            store.expect_find_posts().times(0);

            let result = distiller(store).distill(user(REQUESTER), lat, lng).await;
            assert!(
                matches!(result, Err(AppError::InvalidCoordinate(_))),
                "({}, {}) should be rejected",
                lat,
                lng
            );
        }
    }

    #[tokio::test]
    async fn test_no_resonant_users_is_no_resonance_found() {
        let mut store = mock_store();
        store
            .expect_resonant_users()
            .with(eq(user(REQUESTER)))
            .times(1)
            .returning(|_| Ok(vec![]));
        store.expect_find_spots().times(0);

        let result = distiller(store)
            .distill(user(REQUESTER), 35.6467, 139.7101)
            .await;
        assert!(matches!(result, Err(AppError::NoResonanceFound)));
    }

    #[tokio::test]
    async fn test_requester_is_never_part_of_own_circle() {
        let mut store = mock_store();
        store
            .expect_resonant_users()
            .returning(|_| Ok(vec![resonant(REQUESTER, 4)]));
        store.expect_find_spots().times(0);

        let result = distiller(store)
            .distill(user(REQUESTER), 35.6467, 139.7101)
            .await;
        assert!(matches!(result, Err(AppError::NoResonanceFound)));
    }

    #[tokio::test]
    async fn test_candidates_are_requested_for_neighbourhood_and_circle() {
        let origin = CellId::quantize(35.6467, 139.7101).unwrap();
        let expected_cells = origin.with_neighbors();

        let mut store = mock_store();
        store
            .expect_resonant_users()
            .returning(|_| Ok(vec![resonant(2, 1), resonant(3, 2)]));
        store
            .expect_find_spots()
            .withf(move |cells, owners| {
                cells == expected_cells.as_slice() && owners == [user(2), user(3)].as_slice()
            })
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let result = distiller(store)
            .distill(user(REQUESTER), 35.6467, 139.7101)
            .await;
        assert!(matches!(result, Err(AppError::NoViableCandidate)));
    }

    #[tokio::test]
    async fn test_strong_near_match_loses_to_popular_far_cell() {
        // spot 10: 5 shared spots, density 10, ~1 km away
        // spot 20: 1 shared spot, density 100, ~50 km away
        let near = spot(10, 2, 35.009, 139.0);
        let far = spot(20, 3, 35.45, 139.0);
        let near_cell = near.cell.clone();
        let far_cell = far.cell.clone();

        let mut store = mock_store();
        store
            .expect_resonant_users()
            .returning(|_| Ok(vec![resonant(2, 5), resonant(3, 1)]));
        let candidates = vec![near.clone(), far.clone()];
        store
            .expect_find_spots()
            .returning(move |_, _| Ok(candidates.clone()));
        store
            .expect_density()
            .with(eq(near_cell))
            .returning(|_| Ok(DensityScore::new(10)));
        store
            .expect_density()
            .with(eq(far_cell))
            .returning(|_| Ok(DensityScore::new(100)));
        store
            .expect_find_posts()
            .with(eq(SpotId::new(20).unwrap()))
            .returning(|_| Ok(vec![]));

        let result = distiller(store)
            .distill(user(REQUESTER), 35.0, 139.0)
            .await
            .unwrap();

        assert_eq!(result.spot.id.value(), 20);
        assert_eq!(result.resonance.value(), 1);
        assert_eq!(result.density.value(), 100);
        // (ln 2 * 3 + 1) * 100 / (1 + ln(1 + 50.0377))
        assert!((result.total_score.value() - 62.4308).abs() < 1e-3);
        assert!(result.reason.as_str().contains("100"));
    }

    #[tokio::test]
    async fn test_posts_limited_to_resonant_authors() {
        let winner = spot(7, 2, 35.6467, 139.7101);

        let mut store = mock_store();
        store
            .expect_resonant_users()
            .returning(|_| Ok(vec![resonant(2, 3), resonant(3, 1)]));
        let candidates = vec![winner.clone()];
        store
            .expect_find_spots()
            .returning(move |_, _| Ok(candidates.clone()));
        store
            .expect_density()
            .returning(|_| Ok(DensityScore::new(6)));
        store.expect_find_posts().returning(|_| {
            Ok(vec![
                post(100, 2, 7),
                post(101, 99, 7),
                post(102, 3, 7),
                post(103, REQUESTER, 7),
            ])
        });

        let result = distiller(store)
            .distill(user(REQUESTER), 35.6467, 139.7101)
            .await
            .unwrap();

        let ids: Vec<i64> = result.posts.iter().map(|p| p.id.value()).collect();
        assert_eq!(ids, vec![100, 102]);
    }

    #[tokio::test]
    async fn test_zero_density_everywhere_is_no_viable_candidate() {
        let mut store = mock_store();
        store
            .expect_resonant_users()
            .returning(|_| Ok(vec![resonant(2, 3)]));
        let candidates = vec![spot(1, 2, 35.6467, 139.7101), spot(2, 2, 35.6567, 139.7101)];
        store
            .expect_find_spots()
            .returning(move |_, _| Ok(candidates.clone()));
        store
            .expect_density()
            .times(2)
            .returning(|_| Ok(DensityScore::new(0)));
        store.expect_find_posts().times(0);

        let result = distiller(store)
            .distill(user(REQUESTER), 35.6467, 139.7101)
            .await;
        assert!(matches!(result, Err(AppError::NoViableCandidate)));
    }

    #[tokio::test]
    async fn test_exact_tie_goes_to_lowest_spot_id() {
        // mirror-image spots in different cells: same distance, density and match count
        let east = spot(31, 2, 35.0, 0.005);
        let west = spot(30, 3, 35.0, -0.005);
        assert_ne!(east.cell, west.cell);

        let mut store = mock_store();
        store
            .expect_resonant_users()
            .returning(|_| Ok(vec![resonant(2, 2), resonant(3, 2)]));
        let candidates = vec![east, west];
        store
            .expect_find_spots()
            .returning(move |_, _| Ok(candidates.clone()));
        store
            .expect_density()
            .returning(|_| Ok(DensityScore::new(5)));
        store.expect_find_posts().returning(|_| Ok(vec![]));

        let result = distiller(store)
            .distill(user(REQUESTER), 35.0, 0.0)
            .await
            .unwrap();
        assert_eq!(result.spot.id.value(), 30);
    }

    #[tokio::test]
    async fn test_storage_failure_aborts_pipeline() {
        let mut store = mock_store();
        store
            .expect_resonant_users()
            .returning(|_| Ok(vec![resonant(2, 1)]));
        store
            .expect_find_spots()
            .returning(|_, _| Ok(vec![spot(1, 2, 35.6467, 139.7101)]));
        store
            .expect_density()
            .returning(|_| Err(AppError::Storage("connection reset".to_string())));
        store.expect_find_posts().times(0);

        let result = distiller(store)
            .distill(user(REQUESTER), 35.6467, 139.7101)
            .await;
        let err = assert_err!(result);
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_expired_deadline_cancels_before_first_query() {
        let mut store = mock_store();
        store.expect_resonant_users().times(0);

        let deadline = Deadline::at(tokio::time::Instant::now() - Duration::from_millis(1));
        let result = distiller(store)
            .distill_within(user(REQUESTER), 35.6467, 139.7101, deadline)
            .await;
        assert!(matches!(result, Err(AppError::Cancelled("resonance lookup"))));
    }

    #[tokio::test]
    async fn test_generous_deadline_does_not_interfere() {
        let mut store = mock_store();
        store
            .expect_resonant_users()
            .returning(|_| Ok(vec![resonant(2, 1)]));
        store
            .expect_find_spots()
            .returning(|_, _| Ok(vec![spot(1, 2, 35.6467, 139.7101)]));
        store
            .expect_density()
            .returning(|_| Ok(DensityScore::new(2)));
        store.expect_find_posts().returning(|_| Ok(vec![post(1, 2, 1)]));

        let result = distiller(store)
            .distill_within(
                user(REQUESTER),
                35.6467,
                139.7101,
                Deadline::after(Duration::from_secs(30)),
            )
            .await;
        let distillation = assert_ok!(result);
        assert_eq!(distillation.posts.len(), 1);
        assert_eq!(distillation.resonance.value(), 1);
    }
}
