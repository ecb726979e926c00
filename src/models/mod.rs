mod ids;
mod post;
mod recommendation;
mod score;
mod spot;

pub use ids::{PostId, SpotId, UserId};
pub use post::{Caption, ImageUrl, Post, Username};
pub use recommendation::{
    AnalysisOutput, DistillResponse, Distillation, LocationOutput, PostOutput,
    RecommendationBody, SpotOutput,
};
pub use score::{DensityScore, Reason, ResonanceCount, ResonantUser, TotalScore};
pub use spot::{Spot, SpotName};
