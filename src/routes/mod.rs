/// Router Module Index
///
/// Organizes routing into security-segregated modules. Access control is applied
/// at the module level through Axum layers in `create_router`, so a handler cannot
/// be exposed without the gate its module demands.

/// Routes accessible to anyone: health check, signup and login.
pub mod public;

/// Routes behind the Authentication Gate.
pub mod authenticated;

/// Routes behind the Authentication Gate and the admin Authorization Gate.
pub mod admin;
