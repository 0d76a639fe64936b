//! # App-SDK Converters
//!
//! Bridges internal records to the shapes the plugin SDK expects.
//!
//! The video-conference conversion is a verbatim field copy in both
//! directions: the two representations are structurally identical and differ
//! only in which side of the plugin boundary owns the type. `None` in,
//! `None` out, no validation.

use crate::types::{CallId, UserId, VideoConference};
use serde::{Deserialize, Serialize};

// =============================================================================
// SDK SHAPE
// =============================================================================

/// The video-conference record as the plugin SDK sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppVideoConference {
    #[serde(rename = "_id")]
    pub id: CallId,
    pub rid: String,
    #[serde(rename = "createdBy")]
    pub created_by: UserId,
    pub title: Option<String>,
    pub status: i64,
    pub url: Option<String>,
    #[serde(rename = "providerName")]
    pub provider_name: String,
}

// =============================================================================
// CONVERSIONS
// =============================================================================

/// Convert an internal record to the SDK representation.
#[must_use]
pub fn to_app_video_conference(call: Option<&VideoConference>) -> Option<AppVideoConference> {
    let call = call?;
    Some(AppVideoConference {
        id: call.id.clone(),
        rid: call.rid.clone(),
        created_by: call.created_by.clone(),
        title: call.title.clone(),
        status: call.status,
        url: call.url.clone(),
        provider_name: call.provider_name.clone(),
    })
}

/// Convert an SDK record back to the internal representation.
#[must_use]
pub fn from_app_video_conference(call: Option<&AppVideoConference>) -> Option<VideoConference> {
    let call = call?;
    Some(VideoConference {
        id: call.id.clone(),
        rid: call.rid.clone(),
        created_by: call.created_by.clone(),
        title: call.title.clone(),
        status: call.status,
        url: call.url.clone(),
        provider_name: call.provider_name.clone(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
