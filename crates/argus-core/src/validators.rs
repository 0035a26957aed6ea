//! Field validator registry.
//!
//! One pure function per semantically distinct column. Registry keys are
//! either a bare column name (applies to that column on any entity) or a
//! `table.column` qualified name (applies only to that entity's column);
//! [`resolve`] tries the qualified key first.
//!
//! Validators never mutate shared state and are idempotent: feeding a
//! validator its own output yields the same value. They return a new,
//! possibly normalized value (case folding, dotted-ASN expansion, JSON
//! objects serialized into bytes for binary columns) or a human-readable
//! cause; validation dispatch turns the cause into a field-tagged error.

use std::net::Ipv4Addr;

use chrono::NaiveTime;

use crate::value::Value;

/// A pure validator: normalizes the value or reports a cause.
pub type Validator = fn(Value) -> Result<Value, String>;

/// Resolve the validator for `table`.`column`; qualified keys take
/// precedence over bare ones.
pub fn resolve(table: &str, column: &str) -> Option<Validator> {
    qualified(table, column).or_else(|| bare(column))
}

fn qualified(table: &str, column: &str) -> Option<Validator> {
    match (table, column) {
        ("user", "login") => Some(user_login),
        ("component", "login") => Some(component_login),
        ("system_group", "name") => Some(system_group_name),
        ("criteria_category", "category") => Some(criteria_category),
        ("criteria_name", "name") => Some(criteria_name),
        _ => None,
    }
}

fn bare(column: &str) -> Option<Validator> {
    match column {
        "org_id" => Some(org_id),
        "org_group_id" => Some(org_group_id),
        "label" => Some(label),
        "ca_label" => Some(ca_label),
        "name" => Some(name),
        "source_id" | "anonymized_source_id" => Some(source_id),
        "email" => Some(email),
        "notification_time" => Some(notification_time),
        "asn" => Some(asn),
        "cc" => Some(cc),
        "fqdn" => Some(fqdn),
        "ip_network" => Some(ip_network),
        "url" => Some(url),
        "serial_hex" => Some(serial_hex),
        "creator_details" => Some(json_object_blob),
        "revocation_comment" => Some(comment),
        "email_notifications_language" => Some(language),
        "inside_request_parameters"
        | "search_request_parameters"
        | "threats_request_parameters" => Some(request_parameters),
        _ => None,
    }
}

// -----------------------------------------------------------------------
// String helpers
// -----------------------------------------------------------------------

fn clean(value: Value, what: &str, max_len: usize) -> Result<String, String> {
    let s = value.into_str()?;
    let s = s.trim().to_string();
    if s.is_empty() {
        return Err(format!("{what} must not be empty"));
    }
    if s.chars().count() > max_len {
        return Err(format!("{what} is longer than {max_len} characters"));
    }
    if s.chars().any(char::is_control) {
        return Err(format!("{what} contains control characters"));
    }
    Ok(s)
}

fn id_chars(s: &str, what: &str) -> Result<(), String> {
    let legal =
        |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' || c == '.';
    if !s.chars().all(legal) {
        return Err(format!("illegal character in {what} {s:?}"));
    }
    if s.starts_with(['-', '.']) || s.ends_with(['-', '.']) {
        return Err(format!("{what} {s:?} starts or ends with a separator"));
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Identifier validators
// -----------------------------------------------------------------------

fn org_id(value: Value) -> Result<Value, String> {
    let s = clean(value, "organization id", 32)?.to_ascii_lowercase();
    id_chars(&s, "organization id")?;
    Ok(Value::Str(s))
}

fn org_group_id(value: Value) -> Result<Value, String> {
    clean(value, "organization group id", 255).map(Value::Str)
}

fn label(value: Value) -> Result<Value, String> {
    clean(value, "label", 255).map(Value::Str)
}

fn ca_label(value: Value) -> Result<Value, String> {
    let s = clean(value, "CA label", 100)?.to_ascii_lowercase();
    id_chars(&s, "CA label")?;
    Ok(Value::Str(s))
}

fn name(value: Value) -> Result<Value, String> {
    clean(value, "name", 255).map(Value::Str)
}

/// Source ids take the `provider.channel` form.
fn source_id(value: Value) -> Result<Value, String> {
    let s = clean(value, "source id", 32)?.to_ascii_lowercase();
    let Some((provider, channel)) = s.split_once('.') else {
        return Err(format!("source id {s:?} is not of the form provider.channel"));
    };
    for part in [provider, channel] {
        if part.is_empty()
            || !part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(format!("source id {s:?} is not of the form provider.channel"));
        }
    }
    Ok(Value::Str(s))
}

fn user_login(value: Value) -> Result<Value, String> {
    // User logins are e-mail addresses.
    email(value)
}

fn component_login(value: Value) -> Result<Value, String> {
    let s = clean(value, "component login", 255)?;
    if s.chars().any(char::is_whitespace) {
        return Err(format!("component login {s:?} contains whitespace"));
    }
    Ok(Value::Str(s))
}

fn system_group_name(value: Value) -> Result<Value, String> {
    clean(value, "system group name", 100).map(Value::Str)
}

fn criteria_category(value: Value) -> Result<Value, String> {
    let s = clean(value, "category", 255)?.to_ascii_lowercase();
    if !s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!("illegal character in category {s:?}"));
    }
    Ok(Value::Str(s))
}

fn criteria_name(value: Value) -> Result<Value, String> {
    let s = clean(value, "criteria name", 255)?.to_lowercase();
    Ok(Value::Str(s))
}

// -----------------------------------------------------------------------
// Network-shaped validators
// -----------------------------------------------------------------------

fn email(value: Value) -> Result<Value, String> {
    let s = clean(value, "e-mail address", 255)?.to_ascii_lowercase();
    if s.chars().any(char::is_whitespace) {
        return Err(format!("e-mail address {s:?} contains whitespace"));
    }
    let Some((local, domain)) = s.split_once('@') else {
        return Err(format!("e-mail address {s:?} has no @"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || s.matches('@').count() > 1
    {
        return Err(format!("{s:?} is not a valid e-mail address"));
    }
    Ok(Value::Str(s))
}

/// Autonomous system number: a plain integer, a decimal string, or the
/// dotted `high.low` notation; normalized to an integer.
fn asn(value: Value) -> Result<Value, String> {
    let n: u64 = match value {
        Value::Str(s) => parse_asn(s.trim())?,
        other => {
            let i = other.into_int()?;
            if i < 0 {
                return Err(format!("ASN must not be negative, got {i}"));
            }
            i as u64
        }
    };
    if n > u32::MAX as u64 {
        return Err(format!("ASN {n} is out of the 32-bit range"));
    }
    Ok(Value::Int(n as i64))
}

fn parse_asn(s: &str) -> Result<u64, String> {
    if let Some((high, low)) = s.split_once('.') {
        let high: u64 = high
            .parse()
            .map_err(|_| format!("{s:?} is not a valid dotted ASN"))?;
        let low: u64 = low
            .parse()
            .map_err(|_| format!("{s:?} is not a valid dotted ASN"))?;
        if high > 0xFFFF || low > 0xFFFF {
            return Err(format!("{s:?} is not a valid dotted ASN"));
        }
        Ok(high << 16 | low)
    } else {
        s.parse().map_err(|_| format!("{s:?} is not a valid ASN"))
    }
}

fn cc(value: Value) -> Result<Value, String> {
    let s = value.into_str()?.trim().to_ascii_uppercase();
    if s.len() != 2 || !s.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(format!("{s:?} is not a two-letter country code"));
    }
    Ok(Value::Str(s))
}

fn fqdn(value: Value) -> Result<Value, String> {
    let s = clean(value, "domain name", 255)?.to_ascii_lowercase();
    let s = s.strip_suffix('.').unwrap_or(&s).to_string();
    for part in s.split('.') {
        let ok = !part.is_empty()
            && part.len() <= 63
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !part.starts_with('-')
            && !part.ends_with('-');
        if !ok {
            return Err(format!("{s:?} is not a valid domain name"));
        }
    }
    Ok(Value::Str(s))
}

fn ip_network(value: Value) -> Result<Value, String> {
    let s = value.into_str()?.trim().to_string();
    let Some((addr, prefix)) = s.split_once('/') else {
        return Err(format!("{s:?} is not in address/prefix notation"));
    };
    if addr.parse::<Ipv4Addr>().is_err() {
        return Err(format!("{addr:?} is not a valid IPv4 address"));
    }
    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => Ok(Value::Str(s)),
        _ => Err(format!("{prefix:?} is not a valid network prefix length")),
    }
}

fn url(value: Value) -> Result<Value, String> {
    let s = clean(value, "URL", 2048)?;
    let Some((scheme, rest)) = s.split_once("://") else {
        return Err(format!("URL {s:?} has no scheme"));
    };
    let scheme_ok = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
    if !scheme_ok || rest.is_empty() {
        return Err(format!("{s:?} is not a valid URL"));
    }
    Ok(Value::Str(s))
}

// -----------------------------------------------------------------------
// Certificate-related validators
// -----------------------------------------------------------------------

fn serial_hex(value: Value) -> Result<Value, String> {
    let s = value.into_str()?.trim().to_ascii_lowercase();
    if s.is_empty() || s.len() > 20 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("{s:?} is not a valid hexadecimal serial number"));
    }
    Ok(Value::Str(s))
}

/// A nullable free-text comment; surrounding whitespace is stripped and an
/// all-whitespace comment collapses to null.
fn comment(value: Value) -> Result<Value, String> {
    match value {
        Value::Null => Ok(Value::Null),
        other => {
            let s = other.into_str()?.trim().to_string();
            if s.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(Value::Str(s))
            }
        }
    }
}

// -----------------------------------------------------------------------
// JSON-bearing binary columns
// -----------------------------------------------------------------------

fn json_object(value: Value) -> Result<Option<serde_json::Map<String, serde_json::Value>>, String> {
    let json: serde_json::Value = match value {
        Value::Null => return Ok(None),
        Value::Json(json) => json,
        Value::Bytes(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| format!("stored blob is not valid JSON: {e}"))?,
        _ => return Err("expected a JSON object or its serialized bytes".to_string()),
    };
    match json {
        serde_json::Value::Object(map) => Ok(Some(map)),
        _ => Err("expected a JSON object".to_string()),
    }
}

/// An arbitrary JSON object serialized into the binary column.
fn json_object_blob(value: Value) -> Result<Value, String> {
    match json_object(value)? {
        None => Ok(Value::Null),
        Some(map) => serde_json::to_vec(&map)
            .map(Value::Bytes)
            .map_err(|e| format!("cannot serialize JSON object: {e}")),
    }
}

/// Per-zone request parameters: a JSON `{parameter: required?}` mapping
/// with boolean values only; null or empty means "all legal".
fn request_parameters(value: Value) -> Result<Value, String> {
    let Some(map) = json_object(value)? else {
        return Ok(Value::Null);
    };
    for (key, val) in &map {
        if !val.is_boolean() {
            return Err(format!("request parameter {key:?} must map to a boolean"));
        }
    }
    serde_json::to_vec(&map)
        .map(Value::Bytes)
        .map_err(|e| format!("cannot serialize request parameters: {e}"))
}

// -----------------------------------------------------------------------
// Notification settings
// -----------------------------------------------------------------------

fn notification_time(value: Value) -> Result<Value, String> {
    let s = value.into_str()?;
    let s = s.trim();
    let parsed = NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| format!("{s:?} is not a valid time of day"))?;
    Ok(Value::Str(parsed.format("%H:%M:%S").to_string()))
}

fn language(value: Value) -> Result<Value, String> {
    match value {
        Value::Null => Ok(Value::Null),
        other => {
            let s = other.into_str()?.trim().to_ascii_lowercase();
            if s.len() != 2 || !s.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(format!("{s:?} is not a two-letter language code"));
            }
            Ok(Value::Str(s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asn_accepts_plain_and_dotted_forms() {
        assert_eq!(asn(Value::Int(64512)).unwrap(), Value::Int(64512));
        assert_eq!(asn(Value::from("64512")).unwrap(), Value::Int(64512));
        assert_eq!(asn(Value::from("1.10")).unwrap(), Value::Int(65546));
    }

    #[test]
    fn asn_rejects_out_of_range_values() {
        assert!(asn(Value::Int(-1)).is_err());
        assert!(asn(Value::Int(1 << 33)).is_err());
        assert!(asn(Value::from("70000.1")).is_err());
        assert!(asn(Value::from("not-a-number")).is_err());
    }

    #[test]
    fn ca_label_lowercases_like_org_id() {
        assert_eq!(
            ca_label(Value::from("Root-CA")).unwrap(),
            Value::from("root-ca")
        );
        assert!(ca_label(Value::from("root ca")).is_err());
    }

    #[test]
    fn length_limits_count_characters_not_bytes() {
        // 255 two-byte characters stay within a 255-character limit.
        assert!(label(Value::Str("ż".repeat(255))).is_ok());
        assert!(label(Value::Str("x".repeat(256))).is_err());
    }

    #[test]
    fn cc_normalizes_case() {
        assert_eq!(cc(Value::from("pl")).unwrap(), Value::from("PL"));
        assert!(cc(Value::from("POL")).is_err());
        assert!(cc(Value::from("1A")).is_err());
    }

    #[test]
    fn ip_network_requires_prefix_notation() {
        assert!(ip_network(Value::from("10.0.0.0/8")).is_ok());
        assert!(ip_network(Value::from("10.0.0.0")).is_err());
        assert!(ip_network(Value::from("10.0.0.0/33")).is_err());
        assert!(ip_network(Value::from("300.0.0.0/8")).is_err());
    }

    #[test]
    fn fqdn_normalizes_and_rejects_bad_labels() {
        assert_eq!(
            fqdn(Value::from("WWW.Example.COM.")).unwrap(),
            Value::from("www.example.com")
        );
        assert!(fqdn(Value::from("bad-.example.com")).is_err());
        assert!(fqdn(Value::from("exa mple.com")).is_err());
    }

    #[test]
    fn serial_hex_lowercases() {
        assert_eq!(
            serial_hex(Value::from("00ABCDEF")).unwrap(),
            Value::from("00abcdef")
        );
        assert!(serial_hex(Value::from("xyz")).is_err());
        assert!(serial_hex(Value::from("0123456789012345678901")).is_err());
    }

    #[test]
    fn source_id_requires_provider_channel_form() {
        assert_eq!(
            source_id(Value::from("Cert-PL.Honeypot")).unwrap(),
            Value::from("cert-pl.honeypot")
        );
        assert!(source_id(Value::from("nodot")).is_err());
        assert!(source_id(Value::from("a.b.c")).is_err());
    }

    #[test]
    fn request_parameters_normalize_to_bytes_idempotently() {
        let mapping = serde_json::json!({"time.min": true, "ip": false});
        let once = request_parameters(Value::Json(mapping.clone())).unwrap();
        let bytes = match &once {
            Value::Bytes(b) => b.clone(),
            other => panic!("expected bytes, got {other:?}"),
        };
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(),
            mapping
        );
        // Feeding the output back in yields the same value.
        assert_eq!(request_parameters(once.clone()).unwrap(), once);
    }

    #[test]
    fn request_parameters_reject_non_boolean_values() {
        let mapping = serde_json::json!({"ip": "yes"});
        assert!(request_parameters(Value::Json(mapping)).is_err());
        assert_eq!(request_parameters(Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn comment_collapses_whitespace_to_null() {
        assert_eq!(comment(Value::from("  ok  ")).unwrap(), Value::from("ok"));
        assert_eq!(comment(Value::from("   ")).unwrap(), Value::Null);
        assert_eq!(comment(Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn notification_time_normalizes_to_seconds_precision() {
        assert_eq!(
            notification_time(Value::from("9:30")).unwrap(),
            Value::from("09:30:00")
        );
        assert!(notification_time(Value::from("25:00")).is_err());
    }

    #[test]
    fn qualified_keys_take_precedence_over_bare_ones() {
        // `criteria_name.name` lowercases; the bare `name` validator does not.
        let qualified = resolve("criteria_name", "name").unwrap();
        assert_eq!(qualified(Value::from("Foo")).unwrap(), Value::from("foo"));

        let bare = resolve("some_other_table", "name").unwrap();
        assert_eq!(bare(Value::from("Foo")).unwrap(), Value::from("Foo"));
    }

    #[test]
    fn user_login_is_an_email_address() {
        let login = resolve("user", "login").unwrap();
        assert_eq!(
            login(Value::from("Alice@Example.COM")).unwrap(),
            Value::from("alice@example.com")
        );
        assert!(login(Value::from("not-an-address")).is_err());
    }
}
