//! Request header parsing and response header construction

use super::error::{LdpError, LdpResult};
use crate::rdf::namespace::ldp;
use crate::rdf::RdfFormat;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, LINK};
use mime::Mime;
use tracing::debug;

pub const SLUG: HeaderName = HeaderName::from_static("slug");
pub const PREFER: HeaderName = HeaderName::from_static("prefer");
pub const PREFERENCE_APPLIED: HeaderName = HeaderName::from_static("preference-applied");
pub const ACCEPT_POST: HeaderName = HeaderName::from_static("accept-post");

/// First value of a header as text
pub fn header_str(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Insert a header, skipping values that are not valid header text
pub fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => debug!("Dropping invalid {} header value {:?}", name, value),
    }
}

/// Append a header value, keeping earlier ones
pub fn append(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.append(name, v);
        }
        Err(_) => debug!("Dropping invalid {} header value {:?}", name, value),
    }
}

/// Body format from `Content-Type`; Turtle when absent
pub fn request_format(headers: &HeaderMap) -> LdpResult<RdfFormat> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(RdfFormat::Turtle);
    };
    let text = value
        .to_str()
        .map_err(|_| LdpError::UnsupportedMediaType("<binary>".to_string()))?;
    let mime: Mime = text
        .parse()
        .map_err(|_| LdpError::UnsupportedMediaType(text.to_string()))?;
    RdfFormat::from_media_type(mime.essence_str())
        .ok_or_else(|| LdpError::UnsupportedMediaType(text.to_string()))
}

/// Pick a response format from `Accept`, honoring q-values.
///
/// Ties go to the more specific range, then to the earlier entry. No
/// `Accept` header means Turtle.
pub fn negotiate(headers: &HeaderMap) -> LdpResult<RdfFormat> {
    let accept: Vec<&str> = headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if accept.iter().all(|v| v.trim().is_empty()) {
        return Ok(RdfFormat::Turtle);
    }

    let mut best: Option<(f32, u8, RdfFormat)> = None;
    for range in accept.iter().flat_map(|v| v.split(',')) {
        let Ok(mime) = range.trim().parse::<Mime>() else {
            continue;
        };
        let quality = mime
            .get_param("q")
            .and_then(|q| q.as_str().parse::<f32>().ok())
            .unwrap_or(1.0);
        if quality <= 0.0 {
            continue;
        }

        let (format, specificity) = if mime.type_() == mime::STAR {
            (Some(RdfFormat::Turtle), 0)
        } else if mime.subtype() == mime::STAR {
            let format = if mime.type_() == mime::TEXT {
                Some(RdfFormat::Turtle)
            } else if mime.type_() == mime::APPLICATION {
                Some(RdfFormat::JsonLd)
            } else {
                None
            };
            (format, 1)
        } else {
            (RdfFormat::from_media_type(mime.essence_str()), 2)
        };

        let Some(format) = format else { continue };
        let better = match best {
            None => true,
            Some((q, s, _)) => quality > q || (quality == q && specificity > s),
        };
        if better {
            best = Some((quality, specificity, format));
        }
    }

    best.map(|(_, _, format)| format).ok_or(LdpError::NotAcceptable)
}

/// Client sent `Link: <ldp:Resource>; rel="type"`
pub fn resource_type_override(headers: &HeaderMap) -> bool {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|link| {
            let mut parts = link.split(';').map(str::trim);
            let target = parts
                .next()
                .and_then(|t| t.strip_prefix('<'))
                .and_then(|t| t.strip_suffix('>'));
            target == Some(ldp::RESOURCE)
                && parts.any(|param| {
                    param
                        .split_once('=')
                        .filter(|(k, _)| k.trim().eq_ignore_ascii_case("rel"))
                        .map_or(false, |(_, v)| {
                            v.trim().trim_matches('"').split_whitespace().any(|r| r == "type")
                        })
                })
        })
}

/// `Prefer: return=representation` include/omit hints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    include: Vec<String>,
    omit: Vec<String>,
}

impl Preferences {
    /// Lenient parse; unknown preferences and malformed parts are ignored
    pub fn parse(headers: &HeaderMap) -> Self {
        let mut prefs = Preferences::default();
        for value in headers.get_all(PREFER).iter().filter_map(|v| v.to_str().ok()) {
            for preference in value.split(',') {
                let mut parts = preference.split(';').map(str::trim);
                let is_representation = parts
                    .next()
                    .and_then(|p| p.split_once('='))
                    .map_or(false, |(k, v)| {
                        k.trim().eq_ignore_ascii_case("return")
                            && v.trim().trim_matches('"').eq_ignore_ascii_case("representation")
                    });
                if !is_representation {
                    continue;
                }
                for param in parts {
                    let Some((key, uris)) = param.split_once('=') else { continue };
                    let uris = uris.trim().trim_matches('"').split_whitespace().map(str::to_string);
                    match key.trim().to_ascii_lowercase().as_str() {
                        "include" => prefs.include.extend(uris),
                        "omit" => prefs.omit.extend(uris),
                        _ => {}
                    }
                }
            }
        }
        prefs
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.omit.is_empty()
    }

    /// At least one include/omit URI is an LDP preference this server shapes
    /// representations by
    pub fn is_recognized(&self) -> bool {
        const KNOWN: [&str; 4] = [
            ldp::PREFER_MINIMAL_CONTAINER,
            ldp::PREFER_EMPTY_CONTAINER,
            ldp::PREFER_CONTAINMENT,
            ldp::PREFER_MEMBERSHIP,
        ];
        self.include
            .iter()
            .chain(&self.omit)
            .any(|uri| KNOWN.contains(&uri.as_str()))
    }

    fn includes(&self, uri: &str) -> bool {
        self.include.iter().any(|u| u == uri)
    }

    fn omits(&self, uri: &str) -> bool {
        self.omit.iter().any(|u| u == uri)
    }

    fn minimal(&self) -> bool {
        self.includes(ldp::PREFER_MINIMAL_CONTAINER) || self.includes(ldp::PREFER_EMPTY_CONTAINER)
    }

    fn wants(&self, uri: &str) -> bool {
        if self.omits(uri) {
            return false;
        }
        !self.minimal() || self.includes(uri)
    }

    pub fn include_containment(&self) -> bool {
        self.wants(ldp::PREFER_CONTAINMENT)
    }

    pub fn include_membership(&self) -> bool {
        self.wants(ldp::PREFER_MEMBERSHIP)
    }
}

/// `Link` header value listing `rel="type"` targets and the constraints
/// document
pub fn link_value(types: &[&str], constraints: Option<&str>) -> String {
    let mut links: Vec<String> = types.iter().map(|t| format!("<{}>; rel=\"type\"", t)).collect();
    if let Some(uri) = constraints {
        links.push(format!("<{}>; rel=\"describedby\"", uri));
    }
    links.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_request_format() {
        assert_eq!(request_format(&HeaderMap::new()).unwrap(), RdfFormat::Turtle);
        assert_eq!(
            request_format(&headers(&[(CONTENT_TYPE, "application/ld+json; charset=utf-8")])).unwrap(),
            RdfFormat::JsonLd
        );
        assert!(matches!(
            request_format(&headers(&[(CONTENT_TYPE, "text/plain")])),
            Err(LdpError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_negotiate() {
        assert_eq!(negotiate(&HeaderMap::new()).unwrap(), RdfFormat::Turtle);
        assert_eq!(negotiate(&headers(&[(ACCEPT, "*/*")])).unwrap(), RdfFormat::Turtle);
        assert_eq!(
            negotiate(&headers(&[(ACCEPT, "text/turtle;q=0.5, application/ld+json")])).unwrap(),
            RdfFormat::JsonLd
        );
        assert_eq!(
            negotiate(&headers(&[(ACCEPT, "*/*;q=0.9, application/n-triples;q=0.9")])).unwrap(),
            RdfFormat::NTriples
        );
        assert_eq!(negotiate(&headers(&[(ACCEPT, "application/json")])).unwrap(), RdfFormat::JsonLd);
        assert!(matches!(
            negotiate(&headers(&[(ACCEPT, "text/html, image/png")])),
            Err(LdpError::NotAcceptable)
        ));
        assert!(matches!(
            negotiate(&headers(&[(ACCEPT, "text/turtle;q=0")])),
            Err(LdpError::NotAcceptable)
        ));
    }

    #[test]
    fn test_resource_type_override() {
        assert!(resource_type_override(&headers(&[(
            LINK,
            "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\""
        )])));
        assert!(resource_type_override(&headers(&[(
            LINK,
            "<http://example.org/x>; rel=\"next\", <http://www.w3.org/ns/ldp#Resource>;rel=type"
        )])));
        assert!(!resource_type_override(&headers(&[(
            LINK,
            "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\""
        )])));
        assert!(!resource_type_override(&HeaderMap::new()));
    }

    #[test]
    fn test_preferences() {
        let none = Preferences::parse(&HeaderMap::new());
        assert!(none.is_empty());
        assert!(none.include_containment());
        assert!(none.include_membership());

        let minimal = Preferences::parse(&headers(&[(
            PREFER,
            "return=representation; include=\"http://www.w3.org/ns/ldp#PreferMinimalContainer\"",
        )]));
        assert!(!minimal.include_containment());
        assert!(!minimal.include_membership());

        let minimal_plus = Preferences::parse(&headers(&[(
            PREFER,
            "return=representation; include=\"http://www.w3.org/ns/ldp#PreferEmptyContainer http://www.w3.org/ns/ldp#PreferMembership\"",
        )]));
        assert!(!minimal_plus.include_containment());
        assert!(minimal_plus.include_membership());

        let omit = Preferences::parse(&headers(&[(
            PREFER,
            "return=representation; omit=\"http://www.w3.org/ns/ldp#PreferContainment\"",
        )]));
        assert!(!omit.include_containment());
        assert!(omit.include_membership());

        assert!(minimal.is_recognized());
        assert!(omit.is_recognized());

        let ignored = Preferences::parse(&headers(&[(PREFER, "respond-async, wait=10")]));
        assert!(ignored.is_empty());
        assert!(!ignored.is_recognized());

        let unknown = Preferences::parse(&headers(&[(
            PREFER,
            "return=representation; include=\"http://example.org/ns#PreferSomething\"",
        )]));
        assert!(!unknown.is_empty());
        assert!(!unknown.is_recognized());
        assert!(unknown.include_containment());
    }

    #[test]
    fn test_link_value() {
        let value = link_value(&[ldp::RESOURCE], Some("http://example.org/constraints"));
        assert_eq!(
            value,
            "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\", <http://example.org/constraints>; rel=\"describedby\""
        );
    }
}
