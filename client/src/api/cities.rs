use super::CITIES_PATH;
use crate::{
    fetch::{FetchHook, RequestConfig},
    models::city::City,
    ClientContext,
};

pub fn list(ctx: &ClientContext) -> FetchHook<Vec<City>> {
    FetchHook::mount(ctx, RequestConfig::get(CITIES_PATH))
}
