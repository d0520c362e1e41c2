use serde_json::json;

use crate::{
    fetch::{FetchHook, Method, RequestConfig},
    models::bus::{BusDetails, BusSearchResponse, SeatAvailability, SeatQuery, SearchQuery},
    ClientContext,
};

fn details_path(bus_id: i64) -> String {
    format!("/api/buses/{}", bus_id)
}

pub fn search(ctx: &ClientContext, query: &SearchQuery) -> FetchHook<BusSearchResponse> {
    FetchHook::mount(
        ctx,
        RequestConfig::get(query.path()).depends_on(query.dependency_key()),
    )
}

/// Point an existing search hook at a new query; fires only when the query
/// actually changed.
pub fn update_search(hook: &FetchHook<BusSearchResponse>, query: &SearchQuery) -> bool {
    let path = query.path();
    let key = query.dependency_key();
    hook.reconfigure(|config| {
        config.url = path;
        config.dependency_key = key;
    })
}

pub fn details(ctx: &ClientContext, bus_id: i64) -> FetchHook<BusDetails> {
    FetchHook::mount(
        ctx,
        RequestConfig::get(details_path(bus_id)).depends_on(json!(bus_id)),
    )
}

pub fn show_bus(hook: &FetchHook<BusDetails>, bus_id: i64) -> bool {
    let path = details_path(bus_id);
    hook.reconfigure(|config| {
        config.method = Method::Get;
        config.url = path;
        config.dependency_key = json!(bus_id);
    })
}

/// Seat maps are only requested once both stops are chosen, so the hook
/// starts manual; call [`select_stops`] to fetch.
pub fn seats(ctx: &ClientContext, query: &SeatQuery) -> FetchHook<SeatAvailability> {
    FetchHook::mount(
        ctx,
        RequestConfig::get(query.path())
            .depends_on(query.dependency_key())
            .manual(),
    )
}

/// Re-point the seat hook and fetch the new map, superseding any pending one.
pub async fn select_stops(
    hook: &FetchHook<SeatAvailability>,
    query: &SeatQuery,
) -> Result<Option<SeatAvailability>, crate::error::FetchError> {
    let path = query.path();
    let key = query.dependency_key();
    hook.reconfigure(|config| {
        config.url = path;
        config.dependency_key = key;
    });
    hook.refetch().await
}
