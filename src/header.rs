use std::borrow::Cow;
use std::fmt;
use std::str;

use crate::util::ascii_eq_ignore_case;

/// A single header field/value pair.
///
/// The field keeps the case it was given, but is always compared case
/// insensitively.
#[derive(Clone, PartialEq, Eq)]
pub struct Header<'a> {
    field: Cow<'a, [u8]>,
    value: Cow<'a, [u8]>,
}

impl<'a> Header<'a> {
    pub fn new(field: impl Into<Cow<'a, [u8]>>, value: impl Into<Cow<'a, [u8]>>) -> Self {
        Header {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &[u8] {
        &self.field
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn try_value(&self) -> Option<&str> {
        str::from_utf8(&self.value).ok()
    }

    pub fn is(&self, field: &str) -> bool {
        ascii_eq_ignore_case(&self.field, field.as_bytes())
    }

    pub fn into_owned(self) -> Header<'static> {
        Header {
            field: Cow::Owned(self.field.into_owned()),
            value: Cow::Owned(self.value.into_owned()),
        }
    }
}

impl fmt::Debug for Header<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("Header");
        f.field("field", &String::from_utf8_lossy(&self.field));
        if let Some(value) = self.try_value() {
            f.field("value", &value);
        } else {
            f.field("value", &self.value);
        }
        f.finish()
    }
}

/// Ordered list of headers. Duplicated fields are legal and kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCollection<'a> {
    headers: Vec<Header<'a>>,
}

impl<'a> HeaderCollection<'a> {
    pub fn new() -> Self {
        HeaderCollection { headers: vec![] }
    }

    pub fn with_capacity(n: usize) -> Self {
        HeaderCollection {
            headers: Vec::with_capacity(n),
        }
    }

    /// Builder style [`HeaderCollection::push`].
    pub fn with<F, V>(mut self, field: F, value: V) -> Self
    where
        F: Into<HeaderBytes<'a>>,
        V: Into<HeaderBytes<'a>>,
    {
        self.push(field, value);
        self
    }

    pub fn push<F, V>(&mut self, field: F, value: V)
    where
        F: Into<HeaderBytes<'a>>,
        V: Into<HeaderBytes<'a>>,
    {
        self.headers
            .push(Header::new(field.into().0, value.into().0));
    }

    /// Replace all values of `field` with a single value.
    pub fn set<F, V>(&mut self, field: F, value: V)
    where
        F: Into<HeaderBytes<'a>>,
        V: Into<HeaderBytes<'a>>,
    {
        let field = field.into().0;
        self.headers
            .retain(|h| !ascii_eq_ignore_case(h.field(), &field));
        self.headers.push(Header::new(field, value.into().0));
    }

    pub fn remove(&mut self, field: &str) {
        self.headers.retain(|h| !h.is(field));
    }

    /// First value of `field`.
    pub fn get(&self, field: &str) -> Option<&[u8]> {
        self.headers.iter().find(|h| h.is(field)).map(|h| h.value())
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(|v| str::from_utf8(v).ok())
    }

    /// All values of `field`, in order.
    pub fn get_all<'b>(&'b self, field: &'b str) -> impl Iterator<Item = &'b [u8]> + 'b {
        self.headers
            .iter()
            .filter(move |h| h.is(field))
            .map(|h| h.value())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.headers.iter().any(|h| h.is(field))
    }

    /// Whether any `field` header has a value equal to `value`, ignoring case.
    pub fn test(&self, field: &str, value: &str) -> bool {
        self.get_all(field)
            .any(|v| ascii_eq_ignore_case(v, value.as_bytes()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header<'a>> {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn clear(&mut self) {
        self.headers.clear();
    }

    pub fn into_owned(self) -> HeaderCollection<'static> {
        HeaderCollection {
            headers: self.headers.into_iter().map(Header::into_owned).collect(),
        }
    }
}

impl<'a> FromIterator<Header<'a>> for HeaderCollection<'a> {
    fn from_iter<I: IntoIterator<Item = Header<'a>>>(iter: I) -> Self {
        HeaderCollection {
            headers: iter.into_iter().collect(),
        }
    }
}

impl<'a> Extend<Header<'a>> for HeaderCollection<'a> {
    fn extend<I: IntoIterator<Item = Header<'a>>>(&mut self, iter: I) {
        self.headers.extend(iter)
    }
}

impl<'a> IntoIterator for HeaderCollection<'a> {
    type Item = Header<'a>;
    type IntoIter = std::vec::IntoIter<Header<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.into_iter()
    }
}

/// Anything that can be used as a header field or value.
pub struct HeaderBytes<'a>(Cow<'a, [u8]>);

impl<'a> From<&'a str> for HeaderBytes<'a> {
    fn from(v: &'a str) -> Self {
        HeaderBytes(Cow::Borrowed(v.as_bytes()))
    }
}

impl<'a> From<&'a [u8]> for HeaderBytes<'a> {
    fn from(v: &'a [u8]) -> Self {
        HeaderBytes(Cow::Borrowed(v))
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for HeaderBytes<'a> {
    fn from(v: &'a [u8; N]) -> Self {
        HeaderBytes(Cow::Borrowed(&v[..]))
    }
}

impl From<String> for HeaderBytes<'_> {
    fn from(v: String) -> Self {
        HeaderBytes(Cow::Owned(v.into_bytes()))
    }
}

impl From<Vec<u8>> for HeaderBytes<'_> {
    fn from(v: Vec<u8>) -> Self {
        HeaderBytes(Cow::Owned(v))
    }
}
