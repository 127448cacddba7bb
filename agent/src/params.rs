use std::time::Duration;

use pillow::form_urlencode;
use serde_json::Value;

use crate::error::ParamError;
use crate::proxy::Proxy;

/// Output format asked for by `contentType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentKind {
    #[default]
    Html,
    Image,
    Pdf,
}

impl ContentKind {
    pub fn parse(s: &str) -> ContentKind {
        match s {
            "img" => ContentKind::Image,
            "pdf" => ContentKind::Pdf,
            _ => ContentKind::Html,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ContentKind::Html => "text/html;charset=utf-8",
            ContentKind::Image => "image/png",
            ContentKind::Pdf => "application/pdf",
        }
    }
}

/// Everything a `/doload` request asks for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadParams {
    pub url: String,
    /// Wait after the load finished, before the snapshot.
    pub render_time: Duration,
    pub proxy: Option<Proxy>,
    pub content_kind: ContentKind,
    pub image_size: Option<(u32, u32)>,
    pub user_agent: Option<String>,
    pub script: Option<String>,
    /// Form encoded body to POST to `url` instead of a GET.
    pub post_data: Option<Vec<u8>>,
    pub use_cookie: bool,
    pub resource_timeout: Option<Duration>,
}

impl LoadParams {
    pub fn from_params(params: &[(String, String)]) -> Result<LoadParams, ParamError> {
        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
                .filter(|v| !v.is_empty())
        };

        let url = get("url").ok_or(ParamError::MissingUrl)?.to_string();

        let resource_timeout = match to_int(get("resourceTimeout")) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(LoadParams {
            url,
            render_time: Duration::from_millis(to_int(get("renderTime"))),
            proxy: get("proxy").and_then(Proxy::parse),
            content_kind: get("contentType").map(ContentKind::parse).unwrap_or_default(),
            image_size: get("outImgSize").and_then(parse_image_size),
            user_agent: get("ua").map(str::to_string),
            script: get("script").map(str::to_string),
            post_data: get("postParam").and_then(post_param_to_form),
            use_cookie: to_int(get("useCookie")) == 1,
            resource_timeout,
        })
    }
}

/// Lenient integer, 0 when absent or malformed.
fn to_int(v: Option<&str>) -> u64 {
    v.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// First `<width>x<height>` in `s`, either case of x.
pub fn parse_image_size(s: &str) -> Option<(u32, u32)> {
    let b = s.as_bytes();

    for (i, c) in b.iter().enumerate() {
        if *c != b'x' && *c != b'X' {
            continue;
        }

        let before = b[..i].iter().rev().take_while(|c| c.is_ascii_digit()).count();
        let after = b[i + 1..].iter().take_while(|c| c.is_ascii_digit()).count();

        if before == 0 || after == 0 {
            continue;
        }

        let w = s[i - before..i].parse().ok()?;
        let h = s[i + 1..i + 1 + after].parse().ok()?;
        return Some((w, h));
    }

    None
}

/// Turn a JSON object into a form body, `k=v&` per key.
///
/// Anything but a non-empty object is ignored with a warning.
pub fn post_param_to_form(json: &str) -> Option<Vec<u8>> {
    let obj = match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(v)) if !v.is_empty() => v,
        Ok(_) => {
            warn!("postParam is not a JSON object: {}", json);
            return None;
        }
        Err(e) => {
            warn!("postParam is invalid: {}", e);
            return None;
        }
    };

    let mut out = String::new();
    for (k, v) in &obj {
        form_urlencode(k, &mut out);
        out.push('=');
        match v {
            Value::String(s) => form_urlencode(s, &mut out),
            Value::Null => {}
            other => form_urlencode(&other.to_string(), &mut out),
        }
        out.push('&');
    }

    Some(out.into_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(v: &[(&str, &str)]) -> Vec<(String, String)> {
        v.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn minimal() {
        let p = LoadParams::from_params(&params(&[("url", "http://a.test")])).unwrap();
        assert_eq!(p.url, "http://a.test");
        assert_eq!(p.content_kind, ContentKind::Html);
        assert_eq!(p.render_time, Duration::ZERO);
        assert_eq!(p.resource_timeout, None);
        assert!(!p.use_cookie);
        assert_eq!(p.post_data, None);
    }

    #[test]
    fn missing_url() {
        assert_eq!(
            LoadParams::from_params(&params(&[("url", ""), ("renderTime", "10")])),
            Err(ParamError::MissingUrl)
        );
    }

    #[test]
    fn everything() {
        let p = LoadParams::from_params(&params(&[
            ("URL", "http://a.test/p"),
            ("renderTime", "1500"),
            ("proxy", "http://p.test:3128"),
            ("contentType", "img"),
            ("outImgSize", "1024X768"),
            ("ua", "bot/1.0"),
            ("script", "document.title"),
            ("postParam", r#"{"q":"a b","n":3}"#),
            ("useCookie", "1"),
            ("resourceTimeout", "nonsense"),
        ]))
        .unwrap();

        assert_eq!(p.render_time, Duration::from_millis(1500));
        assert_eq!(p.proxy.unwrap().port, 3128);
        assert_eq!(p.content_kind, ContentKind::Image);
        assert_eq!(p.image_size, Some((1024, 768)));
        assert_eq!(p.user_agent.as_deref(), Some("bot/1.0"));
        assert_eq!(p.script.as_deref(), Some("document.title"));
        assert!(p.use_cookie);
        assert_eq!(p.resource_timeout, None);

        let body = String::from_utf8(p.post_data.unwrap()).unwrap();
        assert!(body.contains("q=a+b&"), "{}", body);
        assert!(body.contains("n=3&"), "{}", body);
    }

    #[test]
    fn image_size() {
        assert_eq!(parse_image_size("100x50"), Some((100, 50)));
        assert_eq!(parse_image_size("size: 800X600px"), Some((800, 600)));
        assert_eq!(parse_image_size("x100"), None);
        assert_eq!(parse_image_size("box 3x"), None);
        assert_eq!(parse_image_size("wide"), None);
    }

    #[test]
    fn post_param_rejects_non_objects() {
        assert_eq!(post_param_to_form("not json"), None);
        assert_eq!(post_param_to_form("[1,2]"), None);
        assert_eq!(post_param_to_form("{}"), None);
    }

    #[test]
    fn content_kinds() {
        assert_eq!(ContentKind::parse("pdf").mime_type(), "application/pdf");
        assert_eq!(ContentKind::parse("html").mime_type(), "text/html;charset=utf-8");
        assert_eq!(ContentKind::parse("whatever"), ContentKind::Html);
    }
}
