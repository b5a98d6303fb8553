//! Stable exit codes for `gemini-agent` commands.

/// Command succeeded; for `run`, the branch was pushed and the pull request
/// was created, already existed, or was disabled.
pub const OK: i32 = 0;
/// Invalid config or input, or an unexpected error.
pub const INVALID: i32 = 1;
/// Generation failed; nothing was written or pushed.
pub const NOT_PUBLISHED: i32 = 2;
/// A required version-control step failed.
pub const PUBLISH_FAILED: i32 = 3;
/// The branch was pushed but pull-request creation failed.
pub const PR_FAILED: i32 = 4;
