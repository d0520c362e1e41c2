use serde::{Deserialize, Serialize};
use serde_json::json;

use super::common::with_query;

/// Search form for `GET /api/buses/search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub from_city_id: i64,
    pub to_city_id: i64,
    pub date: time::Date,
    pub seats: u32,
}

impl SearchQuery {
    pub fn path(&self) -> String {
        with_query(
            "/api/buses/search",
            [
                ("fromCityId", self.from_city_id.to_string()),
                ("toCityId", self.to_city_id.to_string()),
                ("date", self.date.to_string()),
                ("seats", self.seats.to_string()),
            ],
        )
    }

    pub fn dependency_key(&self) -> serde_json::Value {
        json!([self.from_city_id, self.to_city_id, self.date.to_string(), self.seats])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusSearchResponse {
    pub from_city: String,
    pub to_city: String,
    pub date: time::Date,
    #[serde(default)]
    pub buses: Vec<BusSearchResult>,
}

/// Departure/arrival times are kept as the server's `HH:MM[:SS]` strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusSearchResult {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub bus_type: String,
    pub route: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub available_seats: i32,
    pub price: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusDetails {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub bus_type: String,
    pub route: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub total_seats: i32,
    pub price: i32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub stops: Vec<StopInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StopInfo {
    pub id: i64,
    pub name: String,
    pub sequence: i32,
    pub arrival_time: Option<String>,
}

/// Seat availability for one bus between two stops on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatQuery {
    pub bus_id: i64,
    pub from_stop_id: i64,
    pub to_stop_id: i64,
    pub date: time::Date,
}

impl SeatQuery {
    pub fn path(&self) -> String {
        with_query(
            &format!("/api/buses/{}/seats", self.bus_id),
            [
                ("fromStopId", self.from_stop_id.to_string()),
                ("toStopId", self.to_stop_id.to_string()),
                ("date", self.date.to_string()),
            ],
        )
    }

    pub fn dependency_key(&self) -> serde_json::Value {
        json!([self.bus_id, self.from_stop_id, self.to_stop_id, self.date.to_string()])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailability {
    pub bus_id: i64,
    pub date: time::Date,
    pub from_stop_id: i64,
    pub to_stop_id: i64,
    #[serde(default)]
    pub seats: Vec<SeatInfo>,
}

impl SeatAvailability {
    pub fn free_seats(&self) -> Vec<i32> {
        self.seats
            .iter()
            .filter(|s| !s.booked)
            .map(|s| s.seat_no)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatInfo {
    pub seat_no: i32,
    pub booked: bool,
}
