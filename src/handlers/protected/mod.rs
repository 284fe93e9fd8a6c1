// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every handler receives the caller's AuthUser (with its Scope) and the
// per-request RequestContext from the middleware stack; authorization itself
// happens in the services.
pub mod branches;
pub mod departments;
pub mod me;
pub mod regions;
pub mod shops;
pub mod users;
