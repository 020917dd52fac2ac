/// Default maximum call-stack depth (§3.5), guarding against unbounded
/// recursion overflowing the host stack (§5, §9 "Depth bound").
pub const DEFAULT_MAX_DEPTH: usize = 1024;
