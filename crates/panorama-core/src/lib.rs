//! Map session lifecycle controller for the Panorama map tour.
//!
//! This crate sits between the host's declarative configuration and an
//! imperative, asynchronously initialized map engine. It owns one session
//! per mounted map: loading the engine runtime, waiting for a measurable
//! mount target, constructing the engine, attaching terrain, controls and
//! markers, rotating the camera while idle, flying to selected points, and
//! releasing everything on teardown.
//!
//! # Modules
//!
//! - [`config`] -- Resolution of partial host option groups into a fully
//!   populated [`RuntimeConfig`](config::RuntimeConfig).
//! - [`geo`] -- Pan-range bounding box around the initial center.
//! - [`engine`] -- The map engine boundary ([`MapRuntime`], [`MapEngine`])
//!   and its request/event types.
//! - [`host`] -- The host page boundary ([`HostDocument`], [`MountTarget`]).
//! - [`loader`] -- One-shot loading of the engine script and stylesheet.
//! - [`bootstrap`] -- Bounded mount-target polling and engine construction.
//! - [`features`] -- Terrain, controls and marker/popup attachment.
//! - [`popup`] -- Popup markup rendering.
//! - [`rotation`] -- The idle rotation state machine.
//! - [`navigator`] -- Fly-to planning and delayed selection notices.
//! - [`session`] -- The lifecycle manager and its driver task.
//!
//! [`MapRuntime`]: engine::MapRuntime
//! [`MapEngine`]: engine::MapEngine
//! [`HostDocument`]: host::HostDocument
//! [`MountTarget`]: host::MountTarget

pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod features;
pub mod geo;
pub mod host;
pub mod loader;
pub mod navigator;
pub mod popup;
pub mod rotation;
pub mod session;
