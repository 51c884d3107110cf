// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table group.

pub mod configurations;
pub mod conversations;
pub mod messages;
pub mod settings;
