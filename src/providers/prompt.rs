/// System prompt for ingredient extraction.
///
/// Loaded from `extraction_prompt.txt` at compile time so the wording can be
/// edited without dealing with Rust string syntax.
pub const EXTRACTION_PROMPT: &str = include_str!("extraction_prompt.txt");

/// System prompt for catalog canonicalization.
pub const CANONICALIZE_PROMPT: &str = include_str!("canonicalize_prompt.txt");
