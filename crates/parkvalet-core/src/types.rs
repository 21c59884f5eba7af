use uuid::Uuid;

/// New row id. UUIDv7 is time-sortable, so ids order like their insert time.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Random opaque id (spot ids, session tokens).
pub fn random_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time as an RFC3339 string, the format every table stores.
///
/// Fixed microsecond precision with a `Z` suffix keeps stored values sortable
/// as plain text.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_parse_back() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert!(Uuid::parse_str(&random_id()).is_ok());
    }

    #[test]
    fn now_is_rfc3339() {
        let now = now_rfc3339();
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
        assert!(now.ends_with('Z'));
    }
}
