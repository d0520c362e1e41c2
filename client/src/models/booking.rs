use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::common::non_blank;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "one_passenger_per_seat"))]
pub struct BookingRequest {
    pub bus_id: i64,
    pub trip_date: time::Date,
    pub from_stop_id: i64,
    pub to_stop_id: i64,
    #[validate(length(min = 1, message = "select at least one seat"))]
    pub seat_ids: Vec<i32>,
    #[validate(nested)]
    pub passengers: Vec<PassengerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PassengerInfo {
    #[validate(custom(function = "non_blank"))]
    pub name: String,
    #[validate(range(min = 1, max = 120, message = "must be between 1 and 120"))]
    pub age: i32,
    pub gender: String,
    pub seat_no: i32,
}

fn one_passenger_per_seat(req: &BookingRequest) -> Result<(), ValidationError> {
    if req.passengers.len() != req.seat_ids.len() {
        let mut err = ValidationError::new("passenger_count");
        err.message = Some("each selected seat needs exactly one passenger".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub booking_id: i64,
    pub pnr: String,
    pub status: String,
    pub booking_time: Option<String>,
}

/// One row of the signed-in user's booking history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingHistory {
    pub id: i64,
    pub pnr: String,
    pub bus_name: String,
    pub trip_date: time::Date,
    pub from_stop: String,
    pub to_stop: String,
    pub status: String,
    pub booking_time: Option<String>,
    #[serde(default)]
    pub seats: Vec<i32>,
    #[serde(default)]
    pub passengers: Vec<PassengerInfo>,
}
