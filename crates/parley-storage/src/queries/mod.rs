// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.

pub mod messages;
pub mod provider_keys;
pub mod rate_limits;
pub mod threads;
