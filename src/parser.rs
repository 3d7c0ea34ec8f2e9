//! Parsing helpers for portal replies and platform command output

use regex::Regex;

/// Extract the `<message>` text from a Cyberoam `requestresponse` XML reply.
///
/// The portal wraps it in CDATA; both forms are accepted.
pub fn parse_portal_message(xml: &str) -> Option<String> {
    let caps = Regex::new(r"(?s)<message>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</message>")
        .ok()?
        .captures(xml)?;
    let message = caps.get(1)?.as_str().trim();
    (!message.is_empty()).then(|| message.to_string())
}

/// Active SSID from `nmcli -t -f active,ssid dev wifi`
pub fn parse_nmcli_ssid(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("yes:"))
        .map(|ssid| ssid.replace("\\:", ":"))
        .find(|ssid| !ssid.is_empty())
}

/// Connected SSID from `netsh wlan show interfaces`
pub fn parse_netsh_ssid(stdout: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^\s*SSID\s*:\s*(.+?)\s*$").ok()?;
    re.captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|ssid| !ssid.is_empty())
}
