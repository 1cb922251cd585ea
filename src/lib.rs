// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Campus-Compass: point at campus bars and earn achievements for visiting them
//!
//! This crate holds the destination list, the proximity-driven achievement
//! engine and the compass state, all owned by a single [`services::Session`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;
