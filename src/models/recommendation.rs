use serde::Serialize;

use super::{DensityScore, Post, Reason, ResonanceCount, Spot, TotalScore};

/// Outcome of one successful distillation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distillation {
    pub spot: Spot,
    pub total_score: TotalScore,
    pub resonance: ResonanceCount,
    pub density: DensityScore,
    pub reason: Reason,
    /// Posts at the winning spot authored by resonant users
    pub posts: Vec<Post>,
}

// ============================================================================
// Response types
// ============================================================================

/// Body returned by the distill endpoint
#[derive(Debug, Serialize)]
pub struct DistillResponse {
    pub recommendation: RecommendationBody,
}

#[derive(Debug, Serialize)]
pub struct RecommendationBody {
    pub spot: SpotOutput,
    pub distillation_analysis: AnalysisOutput,
    pub posts: Vec<PostOutput>,
}

#[derive(Debug, Serialize)]
pub struct SpotOutput {
    pub id: i64,
    pub name: String,
    pub cell_id: String,
    pub location: LocationOutput,
}

#[derive(Debug, Serialize)]
pub struct LocationOutput {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct AnalysisOutput {
    pub resonance_score: u32,
    pub density_score: u64,
    pub total_score: f64,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct PostOutput {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub caption: String,
    pub image_url: String,
    /// RFC 3339 timestamp
    pub posted_at: String,
}

impl From<&Post> for PostOutput {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.value(),
            user_id: post.author.value(),
            user_name: post.author_name.as_str().to_string(),
            caption: post.caption.as_str().to_string(),
            image_url: post.image_url.as_str().to_string(),
            posted_at: post.posted_at.to_rfc3339(),
        }
    }
}

impl From<Distillation> for DistillResponse {
    fn from(result: Distillation) -> Self {
        let spot = SpotOutput {
            id: result.spot.id.value(),
            name: result.spot.name.as_str().to_string(),
            cell_id: result.spot.cell.as_str().to_string(),
            location: LocationOutput {
                latitude: result.spot.location.latitude(),
                longitude: result.spot.location.longitude(),
            },
        };

        let distillation_analysis = AnalysisOutput {
            resonance_score: result.resonance.value(),
            density_score: result.density.value(),
            total_score: result.total_score.value(),
            reason: result.reason.as_str().to_string(),
        };

        Self {
            recommendation: RecommendationBody {
                spot,
                distillation_analysis,
                posts: result.posts.iter().map(PostOutput::from).collect(),
            },
        }
    }
}
