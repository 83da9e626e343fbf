//! Security policy shared by both ends of the bridge.
//!
//! The worker enforces these rules at its boundary regardless of what the
//! client sent; the client applies the same checks before sending as
//! defense-in-depth.

/// Names that must never reach the worker's reflection layer.
pub const FORBIDDEN_NAMES: [&str; 4] = ["eval", "exec", "globals", "locals"];

/// Is `name` in the forbidden-call set?
pub fn forbidden_name(name: &str) -> bool {
    FORBIDDEN_NAMES.contains(&name)
}

/// Does the final segment of a dotted target resolve to a forbidden name?
///
/// `"builtins.eval"` is as forbidden as `"eval"`.
pub fn forbidden_target(target: &str) -> bool {
    let tail = target.rsplit('.').next().unwrap_or(target);
    forbidden_name(tail)
}

/// Leading-underscore attributes are private and refused.
pub fn private_attribute(name: &str) -> bool {
    name.starts_with('_')
}
