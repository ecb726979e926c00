use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PostId, SpotId, UserId};
use crate::error::{AppError, AppResult};

const MAX_CAPTION_CHARS: usize = 256;

/// Author display name copied onto the post at write time, 3 to 32 characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let len = value.chars().count();
        if !(3..=32).contains(&len) {
            return Err(AppError::InvalidInput(format!(
                "username must be 3-32 chars, got {}",
                len
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Free-text caption, at most 256 characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Caption(String);

impl Caption {
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.chars().count() > MAX_CAPTION_CHARS {
            return Err(AppError::InvalidInput(format!(
                "caption must be <= {} chars",
                MAX_CAPTION_CHARS
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Absolute http(s) reference to the post image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageUrl(String);

impl ImageUrl {
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let rest = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"));
        let has_host = rest
            .and_then(|r| r.split(['/', '?', '#']).next())
            .is_some_and(|host| !host.is_empty() && !host.contains(char::is_whitespace));
        if !has_host {
            return Err(AppError::InvalidInput(format!("invalid image url: {}", value)));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One photo post made at a spot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub author_name: Username,
    pub spot_id: SpotId,
    pub image_url: ImageUrl,
    pub caption: Caption,
    pub posted_at: DateTime<Utc>,
}
