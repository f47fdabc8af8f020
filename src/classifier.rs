//! Routing of development server output lines

/// Marker printed inside the Metro startup banner.
pub const READY_BANNER_MARKER: &str = "▒▒▓▓▓▓▒▒";

/// Prefix React Native puts in front of forwarded `console.log` calls.
pub const BRIDGE_LOG_PREFIX: &str = "(NOBRIDGE) LOG";

const INFORMATIONAL_MARKERS: [&str; 3] = [BRIDGE_LOG_PREFIX, "Welcome to", "Starting dev server"];

/// Where a line of server output should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Informational record for the structured log.
    Log(String),
    /// Unrecognized output for the raw display channel.
    Raw(String),
}

/// Classify one line of development server output.
///
/// Returns `None` for blank lines. Lines that match nothing are never dropped,
/// they fall through to [`Classified::Raw`].
pub fn classify_line(line: &str) -> Option<Classified> {
    if line.trim().is_empty() {
        return None;
    }

    if line.contains(READY_BANNER_MARKER) {
        return Some(Classified::Log(line.to_string()));
    }

    if INFORMATIONAL_MARKERS
        .iter()
        .any(|marker| line.contains(marker))
    {
        let message = line.replacen(BRIDGE_LOG_PREFIX, "", 1);
        return Some(Classified::Log(message.trim().to_string()));
    }

    Some(Classified::Raw(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_log_is_stripped() {
        assert_eq!(
            classify_line("(NOBRIDGE) LOG Welcome to Metro"),
            Some(Classified::Log("Welcome to Metro".to_string()))
        );
        assert_eq!(
            classify_line(" (NOBRIDGE) LOG  Running \"App\" "),
            Some(Classified::Log("Running \"App\"".to_string()))
        );
    }

    #[test]
    fn test_known_markers_are_logged() {
        assert_eq!(
            classify_line("Welcome to Metro v0.81.0"),
            Some(Classified::Log("Welcome to Metro v0.81.0".to_string()))
        );
        assert_eq!(
            classify_line("Starting dev server on port 8081...  "),
            Some(Classified::Log(
                "Starting dev server on port 8081...".to_string()
            ))
        );
    }

    #[test]
    fn test_banner_is_logged_verbatim() {
        let banner = "               ▒▒▓▓▓▓▒▒               ";
        assert_eq!(
            classify_line(banner),
            Some(Classified::Log(banner.to_string()))
        );
    }

    #[test]
    fn test_unknown_lines_are_raw() {
        assert_eq!(
            classify_line("Random noise"),
            Some(Classified::Raw("Random noise".to_string()))
        );
        assert_eq!(
            classify_line("  BUNDLE  ./index.js  \t"),
            Some(Classified::Raw("BUNDLE  ./index.js".to_string()))
        );
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        assert_eq!(classify_line(""), None);
        assert_eq!(classify_line("   \t "), None);
    }
}
