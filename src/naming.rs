//! Project name normalization

/// Used when no name was requested.
pub const DEFAULT_NAME: &str = "native-app";

/// A requested app name in its two canonical forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectName {
    /// PascalCase name handed to the generator, e.g. `NativeApp`.
    pub display: String,
    /// Lower kebab-case directory name, e.g. `native-app`.
    pub directory: String,
}

impl ProjectName {
    pub fn new(requested: Option<&str>) -> Self {
        let mut words = split_words(requested.unwrap_or(DEFAULT_NAME));
        if words.is_empty() {
            words = split_words(DEFAULT_NAME);
        }

        let display = words.iter().map(|w| capitalize(w)).collect::<String>();
        let directory = words
            .iter()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join("-");

        Self { display, directory }
    }
}

/// `appsLocation`, `apps_location` and `apps-location` all become `APPS_LOCATION`.
pub fn constant_case(key: &str) -> String {
    split_words(key)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Split on separators and on lower-to-upper case boundaries.
///
/// Runs of capitals stay together as one word (`HTTPServer` is `HTTP`, `Server`).
pub fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
