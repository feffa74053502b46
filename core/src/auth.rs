//! Query-string authentication.
//!
//! The remote service takes credentials in the query string rather than in
//! a header. The parameter name depends on the credential kind.

use std::fmt;

use url::form_urlencoded;
use url::Url;

/// Credential used to authenticate every request of a connection.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Portal API key, sent as `hapikey`.
    ApiKey(String),
    /// OAuth access token, sent as `access_token`.
    OAuth(String),
}

impl Credential {
    /// Query-string parameter carrying this credential.
    pub fn key_name(&self) -> &'static str {
        match self {
            Credential::ApiKey(_) => "hapikey",
            Credential::OAuth(_) => "access_token",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Credential::ApiKey(value) | Credential::OAuth(value) => value,
        }
    }

    /// Set the credential parameter on `url`, replacing any existing value
    /// for the same key. Every other query pair is kept exactly as it was
    /// encoded, as are scheme, host, path and fragment.
    pub fn attach(&self, mut url: Url) -> Url {
        let name = self.key_name();
        let mut pairs: Vec<String> = url
            .query()
            .unwrap_or("")
            .split('&')
            .filter(|segment| !segment.is_empty() && !segment_has_key(segment, name))
            .map(str::to_owned)
            .collect();

        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair(name, self.value())
            .finish();
        pairs.push(encoded);

        url.set_query(Some(&pairs.join("&")));
        url
    }
}

// Keep credential values out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(..)"),
            Credential::OAuth(_) => f.write_str("OAuth(..)"),
        }
    }
}

fn segment_has_key(segment: &str, name: &str) -> bool {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| key == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn key_names_per_kind() {
        assert_eq!(Credential::ApiKey("k".to_string()).key_name(), "hapikey");
        assert_eq!(Credential::OAuth("t".to_string()).key_name(), "access_token");
    }

    #[test]
    fn attach_to_url_without_query() {
        let attached = Credential::ApiKey("abc".to_string()).attach(url("https://api.example.com/foo"));
        assert_eq!(attached.as_str(), "https://api.example.com/foo?hapikey=abc");
    }

    #[test]
    fn attach_keeps_other_pairs_and_fragment() {
        let original = "https://api.example.com/foo?b=x%20y&a=1#frag";
        let attached = Credential::OAuth("tok".to_string()).attach(url(original));
        assert_eq!(
            attached.as_str(),
            "https://api.example.com/foo?b=x%20y&a=1&access_token=tok#frag"
        );
        assert_eq!(attached.fragment(), Some("frag"));
        assert_eq!(attached.path(), "/foo");
    }

    #[test]
    fn attach_overwrites_existing_value() {
        let attached = Credential::ApiKey("new".to_string())
            .attach(url("https://api.example.com/foo?hapikey=old&hapikey=older&x=1"));
        let values: Vec<_> = attached
            .query_pairs()
            .filter(|(key, _)| key == "hapikey")
            .map(|(_, value)| value.into_owned())
            .collect();
        assert_eq!(values, vec!["new".to_string()]);
        assert!(attached.query_pairs().any(|(key, value)| key == "x" && value == "1"));
    }

    #[test]
    fn attach_encodes_value() {
        let attached = Credential::ApiKey("a b&c".to_string()).attach(url("https://api.example.com/"));
        let (_, value) = attached.query_pairs().next().unwrap();
        assert_eq!(value, "a b&c");
    }

    #[test]
    fn debug_hides_value() {
        let rendered = format!("{:?}", Credential::ApiKey("secret".to_string()));
        assert!(!rendered.contains("secret"));
    }
}
