/// Router Module Index
///
/// Routing is split by access level so the guard is applied at the module
/// boundary, never left to individual handlers to remember.

/// Routes open to anonymous callers: session entry points and read-only listings.
pub mod public;

/// Routes behind the `AuthUser` middleware. Requires a valid session for an
/// account that still exists.
pub mod authenticated;

/// Routes whose handlers all take `AdminUser`: the stored role must be admin.
pub mod admin;
