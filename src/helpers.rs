use crate::Error;

pub(crate) fn percent_decode_request_path(path: &str) -> crate::Result<String> {
    percent_encoding::percent_decode_str(path)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| Error::PathDecode(err.to_string()).into())
}

/// Extracts a single value from a raw query string, decoding `+` and
/// percent escapes.
pub(crate) fn query_value(query: &str, name: &str) -> Option<String> {
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or("");
        if decode_component(key) == name {
            return Some(decode_component(parts.next().unwrap_or("")));
        }
    }
    None
}

fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_encoding::percent_decode_str(&spaced)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_request_path() {
        assert_eq!(
            percent_decode_request_path("/users/jo%20hn").unwrap(),
            "/users/jo hn"
        );
        assert_eq!(percent_decode_request_path("/plain").unwrap(), "/plain");
    }

    #[test]
    fn rejects_invalid_utf8_path() {
        assert!(percent_decode_request_path("/%ff%fe").is_err());
    }

    #[test]
    fn extracts_query_values() {
        assert_eq!(query_value("a=1&b=2", "b").as_deref(), Some("2"));
        assert_eq!(query_value("q=hello+world", "q").as_deref(), Some("hello world"));
        assert_eq!(query_value("q=%2Fpath", "q").as_deref(), Some("/path"));
        assert_eq!(query_value("flag", "flag").as_deref(), Some(""));
        assert_eq!(query_value("a=1", "b"), None);
    }
}
