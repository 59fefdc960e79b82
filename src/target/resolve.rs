use super::{ChannelTarget, CHANNEL_HOSTS};
use crate::TargetError;
use url::Url;

/// Path segments on channel hosts that are never channel handles
const RESERVED_SEGMENTS: &[&str] = &["joinchat", "addstickers", "share", "proxy", "socks"];

const MAX_HANDLE_LEN: usize = 64;

/// Resolves a user-supplied target into a channel handle
///
/// # Accepted forms
///
/// - `handle` and `@handle`
/// - `t.me/handle`, `telegram.me/handle` (scheme optional)
/// - `https://t.me/s/handle` (the scrollable feed)
/// - `https://t.me/handle/123` (a single post; the post number is dropped)
///
/// # Arguments
///
/// * `input` - The target as typed by the caller
///
/// # Returns
///
/// * `Ok(ChannelTarget)` - The resolved handle
/// * `Err(TargetError)` - Empty input, a foreign host, or no usable handle
///
/// # Examples
///
/// ```
/// use telescroll::target::resolve_target;
///
/// let target = resolve_target("https://t.me/s/durov").unwrap();
/// assert_eq!(target.handle(), "durov");
/// ```
pub fn resolve_target(input: &str) -> Result<ChannelTarget, TargetError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TargetError::Empty);
    }

    if !input.contains('/') && !input.contains('.') {
        let handle = input.strip_prefix('@').unwrap_or(input);
        return validated(handle);
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let url = Url::parse(&with_scheme).map_err(|e| TargetError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TargetError::Parse(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| TargetError::Parse(format!("no host in {}", input)))?;
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if !CHANNEL_HOSTS.contains(&host) {
        return Err(TargetError::ForeignHost(host.to_string()));
    }

    let mut segments = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default();
    if segments.first() == Some(&"s") {
        segments.remove(0);
    }

    let handle = segments
        .first()
        .ok_or_else(|| TargetError::MissingHandle(input.to_string()))?;
    validated(handle)
}

fn validated(handle: &str) -> Result<ChannelTarget, TargetError> {
    let valid = !handle.is_empty()
        && handle.len() <= MAX_HANDLE_LEN
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_SEGMENTS.contains(&handle.to_lowercase().as_str());
    if !valid {
        return Err(TargetError::InvalidHandle(handle.to_string()));
    }
    Ok(ChannelTarget::new(handle.to_string()))
}
