// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles.

pub mod mock_provider;

pub use mock_provider::MockProvider;
