pub mod adapters;
pub mod casefold;
pub mod config;
pub mod error;
pub mod web;
