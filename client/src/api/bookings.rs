use serde_json::json;
use validator::Validate;

use super::{BOOKINGS_PATH, USER_BOOKINGS_PATH};
use crate::{
    error::{ClientError, Result},
    fetch::{FetchHook, RequestConfig},
    models::booking::{BookingHistory, BookingRequest, BookingResponse},
    ClientContext,
};

pub fn create(ctx: &ClientContext) -> FetchHook<BookingResponse> {
    FetchHook::mount(ctx, RequestConfig::post(BOOKINGS_PATH).with_auth().manual())
}

/// Validate the checkout form and send it through a [`create`] hook.
pub async fn submit(hook: &FetchHook<BookingResponse>, req: &BookingRequest) -> Result<BookingResponse> {
    req.validate()?;
    let resp = hook
        .trigger(Some(serde_json::to_value(req)?))
        .await?
        .ok_or(ClientError::Superseded)?;
    tracing::info!(pnr = %resp.pnr, booking_id = resp.booking_id, "Booking confirmed");
    Ok(resp)
}

pub fn mine(ctx: &ClientContext) -> FetchHook<Vec<BookingHistory>> {
    FetchHook::mount(ctx, RequestConfig::get(USER_BOOKINGS_PATH).with_auth())
}

pub fn by_pnr(ctx: &ClientContext, pnr: &str) -> FetchHook<BookingResponse> {
    let path = format!("{}/{}", BOOKINGS_PATH, pnr_segment(pnr));
    FetchHook::mount(ctx, RequestConfig::get(path).with_auth().depends_on(json!(pnr)))
}

/// PNRs are alphanumeric; anything else is percent-encoded so it cannot
/// escape the path segment.
fn pnr_segment(pnr: &str) -> String {
    url::form_urlencoded::byte_serialize(pnr.trim().as_bytes()).collect()
}
