//! Typed hooks for the bus reservation API.
//!
//! Each constructor mounts a [`FetchHook`](crate::fetch::FetchHook) with the
//! method, auth requirement and trigger mode the booking screens use.

pub mod auth;
pub mod bookings;
pub mod buses;
pub mod cities;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const CITIES_PATH: &str = "/api/cities";
pub const BOOKINGS_PATH: &str = "/api/bookings";
pub const USER_BOOKINGS_PATH: &str = "/api/user/bookings";
