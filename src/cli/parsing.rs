//! Value parsers for CLI arguments.

/// Validate a configuration name given on the command line.
///
/// Names are used as property suffixes, so they must be a single word of
/// ASCII letters, digits or underscores.
pub(super) fn parse_config(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("configuration name must not be empty".to_owned());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(format!(
            "invalid configuration name '{s}': use ASCII letters, digits or '_'"
        ));
    }
    Ok(trimmed.to_owned())
}

/// Validate a target name given on the command line.
pub(super) fn parse_target(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.contains(';') {
        return Err(format!("invalid target name '{s}'"));
    }
    Ok(trimmed.to_owned())
}
