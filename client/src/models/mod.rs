pub mod booking;
pub mod bus;
pub mod city;
pub mod common;
pub mod user;
