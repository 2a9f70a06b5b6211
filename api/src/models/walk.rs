//! # Walk entity and its wire shapes
//!
//! The server owns the walk record; the client only ever holds a projection
//! of it. These types mirror the backend's JSON:
//!
//! | Type | Used by |
//! |------|---------|
//! | [`WalkStatus`] | `GET /api/Walks/{id}/status` body, `status` field everywhere |
//! | [`Walk`] | `POST /api/Walks` and `GET /api/Walks[/{id}]` responses |
//! | [`WalkRequest`] | `POST /api/Walks` body |
//! | [`WalkUpdate`] | `PUT /api/Walks/{id}` body |
//!
//! Status travels as an integer code (`0` requested, `1` accepted, `2`
//! completed). Denial and cancellation have no code here — they are record
//! deletion on the server.

use serde::{Deserialize, Serialize};
use store::LatLng;

/// Server-side status of a walk. Denied/canceled walks are deleted rather
/// than given a status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum WalkStatus {
    Requested,
    Accepted,
    Completed,
}

impl WalkStatus {
    pub fn code(&self) -> i32 {
        match self {
            WalkStatus::Requested => 0,
            WalkStatus::Accepted => 1,
            WalkStatus::Completed => 2,
        }
    }
}

impl TryFrom<i32> for WalkStatus {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(WalkStatus::Requested),
            1 => Ok(WalkStatus::Accepted),
            2 => Ok(WalkStatus::Completed),
            other => Err(format!("unknown walk status code {other}")),
        }
    }
}

impl From<WalkStatus> for i32 {
    fn from(status: WalkStatus) -> i32 {
        status.code()
    }
}

/// A walk record as the server returns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Walk {
    pub id: String,
    /// Unix seconds of the request.
    pub time: i64,
    pub start_lat: f64,
    pub start_lng: f64,
    pub start_text: String,
    pub dest_text: String,
    #[serde(default)]
    pub dest_lat: Option<f64>,
    #[serde(default)]
    pub dest_lng: Option<f64>,
    pub user_email: String,
    #[serde(default)]
    pub walker_email: Option<String>,
    #[serde(default)]
    pub user_socket_id: Option<String>,
    #[serde(default)]
    pub walker_socket_id: Option<String>,
    pub status: WalkStatus,
}

impl Walk {
    pub fn start(&self) -> LatLng {
        LatLng::new(self.start_lat, self.start_lng)
    }

    pub fn destination(&self) -> Option<LatLng> {
        Some(LatLng::new(self.dest_lat?, self.dest_lng?))
    }
}

/// Body for `POST /api/Walks`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkRequest {
    pub time: i64,
    pub start_lat: f64,
    pub start_lng: f64,
    pub start_text: String,
    pub dest_text: String,
    #[serde(default)]
    pub user_socket_id: Option<String>,
}

/// Body for `PUT /api/Walks/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkUpdate {
    pub status: WalkStatus,
    #[serde(default)]
    pub walker_socket_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WalkStatus::Requested.code(), 0);
        assert_eq!(WalkStatus::Accepted.code(), 1);
        assert_eq!(WalkStatus::Completed.code(), 2);
        assert_eq!(WalkStatus::try_from(1), Ok(WalkStatus::Accepted));
        assert!(WalkStatus::try_from(3).is_err());
        assert!(WalkStatus::try_from(-1).is_err());
    }

    #[test]
    fn test_status_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&WalkStatus::Accepted).unwrap(), "1");
        let status: WalkStatus = serde_json::from_str("2").unwrap();
        assert_eq!(status, WalkStatus::Completed);
    }

    #[test]
    fn test_walk_wire_shape_is_camel_case() {
        let json = r#"{
            "id": "17",
            "time": 1700000000,
            "startLat": 43.0757,
            "startLng": -89.404,
            "startText": "Memorial Union",
            "destText": "College Library",
            "userEmail": "user@wisc.edu",
            "status": 0
        }"#;
        let walk: Walk = serde_json::from_str(json).unwrap();
        assert_eq!(walk.id, "17");
        assert_eq!(walk.status, WalkStatus::Requested);
        assert_eq!(walk.walker_email, None);
        assert_eq!(walk.start(), LatLng::new(43.0757, -89.404));
        assert_eq!(walk.destination(), None);

        let update = WalkUpdate {
            status: WalkStatus::Accepted,
            walker_socket_id: Some("w-sock".to_string()),
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body["status"], 1);
        assert_eq!(body["walkerSocketId"], "w-sock");
    }
}
