use chrono::{DateTime, Local};

/// Resolves the local machine's hostname.
#[cfg(unix)]
pub fn local_hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
}

#[cfg(not(unix))]
pub fn local_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

/// Turns an endpoint URL into a metric key by replacing `:`, `/` and `.` with `_`.
pub fn sanitize_endpoint(endpoint: &str) -> String {
    endpoint
        .chars()
        .map(|c| if matches!(c, ':' | '/' | '.') { '_' } else { c })
        .collect()
}

/// Timestamp used in alert messages, e.g. `2026.10.18-14.03.07:512`.
pub fn alert_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y.%m.%d-%H.%M.%S:%3f").to_string()
}

/// Flattens an error and its sources into one line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
