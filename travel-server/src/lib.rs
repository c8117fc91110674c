//! Travel planner server.
//!
//! A JSON API for building day-by-day itinerary plans: validated trip
//! windows, destinations that never double-book the same moment, and a
//! user profile with destination preferences.

pub mod auth;
pub mod config;
pub mod domain;
pub mod service;
pub mod store;
pub mod web;
