// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the pipeline and its external collaborators.

pub mod kv;
pub mod store;

pub use kv::KvStore;
pub use store::{ConversationStore, SettingsStore};
