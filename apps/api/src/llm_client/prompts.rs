// Shared prompt fragments. Each stage that calls the LLM keeps its own
// templates in a prompts.rs alongside it.

/// System prompt fragment for free-text output that must start with the content itself.
pub const NO_PREAMBLE_SYSTEM: &str = "You write finished text that is sent as-is. \
    Do NOT add a preamble, a title, or commentary about what you wrote. \
    Start directly with the requested content.";
