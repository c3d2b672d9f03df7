//! Data models representing database entities.
//!
//! This module contains the types the authentication core loads from, and
//! writes to, the relational store.

/// API key value object
pub mod api_key;
/// Application aggregate
pub mod application;
/// Per-request audit context
pub mod audit;
/// OAuth2 provider linkage
pub mod auth;
/// Organization (tenant) model
pub mod organization;
/// Access request for role-based checks
pub mod rbac;
/// User model
pub mod user;
