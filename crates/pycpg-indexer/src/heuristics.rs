//! Name-based heuristics applied while building a file graph

/// Secret-indicating substrings used when no configuration overrides them.
pub const DEFAULT_SENSITIVE_NAMES: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "apikey",
    "api_key",
    "credential",
    "private_key",
];

/// Flags variable names that likely hold secret material.
#[derive(Debug, Clone)]
pub struct SensitivityHeuristic {
    needles: Vec<String>,
}

impl Default for SensitivityHeuristic {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_NAMES.iter().copied())
    }
}

impl SensitivityHeuristic {
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let needles = needles
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        SensitivityHeuristic { needles }
    }

    /// Case-insensitive substring match. The name is also tried with `_` and
    /// `-` removed, so `API_KEY`, `apiKey` and `api-key` all match `apikey`.
    pub fn is_sensitive(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        let squashed: String = lowered.chars().filter(|c| *c != '_' && *c != '-').collect();
        self.needles
            .iter()
            .any(|needle| lowered.contains(needle.as_str()) || squashed.contains(needle.as_str()))
    }
}

/// Names that conventionally hold untrusted input.
pub const DEFAULT_USER_INPUT_NAMES: &[&str] = &["input", "request", "payload", "body", "event"];

/// Flags variables whose whole name marks them as user-controlled.
#[derive(Debug, Clone)]
pub struct UserInputHeuristic {
    names: Vec<String>,
}

impl Default for UserInputHeuristic {
    fn default() -> Self {
        Self::new(DEFAULT_USER_INPUT_NAMES.iter().copied())
    }
}

impl UserInputHeuristic {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        UserInputHeuristic { names }
    }

    /// Case-insensitive whole-name match: `Request` qualifies, `request_id`
    /// does not.
    pub fn is_user_input(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.names.iter().any(|n| *n == lowered)
    }
}

/// Double-underscore names such as `__init__` or `__repr__`.
pub fn is_magic(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

/// Whether an `if` condition is the conventional `__name__ == "__main__"`
/// script guard, in either operand order and with either quote style.
pub fn is_main_guard(condition: &str) -> bool {
    let normalized: String = condition
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        .map(|c| if c == '\'' { '"' } else { c })
        .collect();
    normalized == "__name__==\"__main__\"" || normalized == "\"__main__\"==__name__"
}
