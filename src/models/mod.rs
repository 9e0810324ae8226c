// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod channel;
pub mod user;
pub mod video;

pub use channel::{ChannelProfile, Subscription};
pub use user::{ProfileImage, User, UserResponse};
pub use video::{Video, VideoOwner, WatchHistoryEntry};
