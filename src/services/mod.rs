// Smartmarks services
// Authentication, the realtime change feed, snapshot caching and settings.

pub mod auth_service;
pub mod change_feed;
pub mod settings_engine;
pub mod snapshot_cache;
