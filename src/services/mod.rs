//! Domain services used by the HTTP routes and the health task.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the routing, dispatch, registry, and health logic so
//! route handlers stay focused on request shapes and status mapping. Each
//! takes `&AppState` and owns its own error enum.

pub mod capability;
pub mod dispatcher;
pub mod health;
pub mod registry;
pub mod router;
pub mod validation;
