//! Time formatting helpers.

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Describe a deadline relative to `now_secs`: time left, or "elapsed".
pub fn format_deadline(now_secs: u64, deadline_secs: u64) -> String {
    if now_secs >= deadline_secs {
        "elapsed".to_string()
    } else {
        format!("in {}", format_duration(deadline_secs - now_secs))
    }
}
