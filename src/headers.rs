use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum_extra::headers::Header;

/// Ordered list of response headers.
///
/// Unlike [`HeaderMap`], insertion order is kept exactly, which is the order
/// the headers are written in. The list is assembled in full before it is
/// handed to a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderList {
    pub fn new() -> Self {
        HeaderList::default()
    }

    /// Appends a header, keeping any existing header with the same name.
    pub fn push(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.entries.push((name, value));
        self
    }

    /// Builder form of [`HeaderList::push`].
    pub fn with(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.push(name, value);
        self
    }

    /// Appends the encoded form of a typed header.
    pub fn push_typed<H: Header>(&mut self, header: H) -> &mut Self {
        let mut values = Vec::with_capacity(1);
        header.encode(&mut values);
        for value in values {
            self.entries.push((H::name().clone(), value));
        }
        self
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(name, value)| (name, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders each header as a `name: value` line, in order.
    pub fn lines(&self) -> Vec<String> {
        self.iter()
            .map(|(name, value)| format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())))
            .collect()
    }

    /// Appends every header to `map`, preserving order within each name.
    pub fn write_to(&self, map: &mut HeaderMap) {
        for (name, value) in &self.entries {
            map.append(name.clone(), value.clone());
        }
    }
}

impl Extend<(HeaderName, HeaderValue)> for HeaderList {
    fn extend<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        HeaderList { entries: iter.into_iter().collect() }
    }
}

impl IntoIterator for HeaderList {
    type Item = (HeaderName, HeaderValue);
    type IntoIter = std::vec::IntoIter<(HeaderName, HeaderValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
