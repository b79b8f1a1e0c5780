//! Core shiftplan library (session, navigation, planning-period cache, API client).

pub mod api;
pub mod app;
pub mod config;
pub mod events;
pub mod periods;
pub mod reactive;
pub mod routing;
pub mod session;
pub mod storage;
pub mod theme;
