/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Infinite-canvas mind-map workspace core.
//!
//! The crate is host-agnostic: rendering, windowing and UI live outside it.
//! Hosts feed `CanvasIntent`s (usually produced by the `input` state
//! machines) into a `Workspace`, drive assistant exchanges through
//! `services::assistant`, and save projects with `persistence`.
//!
//! Module map:
//! - `app`: workspace aggregate, intents, selection
//! - `viewport`: pan/zoom transform engine
//! - `layout`: radial child placement
//! - `model`: graph store and conversation transcript
//! - `input`: pointer and keyboard state machines producing intents
//! - `services`: assistant exchange loop and media capture
//! - `persistence`: JSON project store

pub mod app;
pub mod input;
pub mod layout;
pub mod model;
pub mod persistence;
pub mod services;
pub mod viewport;

/// Crate version, exposed for hosts and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
