// handlers/mod.rs - one module per resource
//
// Handlers extract input, call the matching service and shape the
// response. Authentication is decided per handler by extracting
// `AuthUser` (required) or `OptionalAuthUser`.
pub mod auth;
pub mod contacts;
pub mod directory;
pub mod health;
pub mod items;
pub mod profile;
pub mod tags;
pub mod users;
pub mod utils;
