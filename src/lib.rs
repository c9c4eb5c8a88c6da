pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod connections;
pub mod db;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod matching;
pub mod messaging;
pub mod models;
pub mod quiz;
pub mod realtime;
pub mod report;
pub mod routes;
pub mod schema;
pub mod state;
pub mod storage;
pub mod store;
pub mod uploads;
pub mod users;
