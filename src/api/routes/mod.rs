//! API Routes
//!
//! Route handlers grouped by portal.

pub mod admin;
pub mod applications;
pub mod auth;
pub mod calculator;
pub mod documents;
pub mod health;
pub mod investments;
pub mod wizard;
