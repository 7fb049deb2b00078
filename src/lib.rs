//! lantern: deterministic command resolution and action execution for
//! interactive fiction worlds.
//!
//! A typed sentence goes through the `nl` pipeline (tokenize, tag, phrase,
//! grammar), is bound to entities by `validate` using `scope` and
//! `resolve`, and runs through an action's four phases in `action`. The
//! result of every turn is an ordered list of symbolic `events`; turning
//! those into prose is left to the host.

pub mod action;
pub mod actions;
pub mod config;
pub mod engine;
pub mod events;
pub mod line_editor;
pub mod nl;
pub mod resolve;
pub mod scope;
pub mod types;
pub mod ui;
pub mod validate;
pub mod world;

pub use engine::{Engine, TurnResult};
