pub(crate) const MAX_CALL_DEPTH: usize = 256;
pub(crate) const MAX_ALIAS_DEPTH: usize = 16;
pub(crate) const MAX_NESTING_DEPTH: usize = 64;
// Native stack an evaluation may use before calls are refused, sized to leave room on a
// 2 MiB thread.
pub(crate) const STACK_BUDGET: usize = 1024 * 1024;
pub(crate) const SOURCE_EXTENSIONS: [&str; 2] = ["rmc", "renzmc"];
