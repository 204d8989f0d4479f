pub mod ai;
pub mod calendar;
pub mod crypto;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
