use tracing::debug;

/// A contiguous run of resource bytes: `length` bytes starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWindow {
    pub offset: u64,
    pub length: u64,
}

impl ByteWindow {
    pub fn new(offset: u64, length: u64) -> Self {
        ByteWindow { offset, length }
    }

    /// The window covering a whole resource of `size` bytes.
    pub fn full(size: u64) -> Self {
        ByteWindow { offset: 0, length: size }
    }

    /// The window for the inclusive byte positions `start..=end`.
    ///
    /// `start` must not exceed `end`.
    pub fn inclusive(start: u64, end: u64) -> Self {
        ByteWindow { offset: start, length: end - start + 1 }
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Offset one past the last byte of the window.
    pub fn end_exclusive(&self) -> u64 {
        self.offset + self.length
    }
}

/// Outcome of checking a `Range` header against a resource size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeResult {
    /// No `Range` header; the full body is served.
    NoRange,
    /// Serve bytes `start..=end`, where `start <= end < size`.
    Satisfiable { start: u64, end: u64 },
    /// The header was malformed or out of bounds.
    Unsatisfiable,
}

impl RangeResult {
    /// Bytes selected by a satisfiable range.
    pub fn window(&self) -> Option<ByteWindow> {
        match *self {
            RangeResult::Satisfiable { start, end } if start <= end => Some(ByteWindow::inclusive(start, end)),
            _ => None,
        }
    }
}

/// Single byte-range-spec as written in the header, before it is checked
/// against the resource size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    /// `bytes=<first>-<last>`
    Bounded { first: u64, last: u64 },
    /// `bytes=<first>-`
    From { first: u64 },
    /// `bytes=-<length>`
    Suffix { length: u64 },
}

/// Checks a raw `Range` header value against a resource of `size` bytes.
///
/// Only a single `bytes` range is accepted. Both bounds must lie inside the
/// resource: unlike the lenient reading in RFC 9110, a last position past the
/// end is not clamped but rejected. A suffix range (`bytes=-N`) selects the
/// last `N` bytes, clamped to the resource size.
///
/// ```
/// use axum_stream_sender::{parse_range, RangeResult};
///
/// assert_eq!(RangeResult::Satisfiable { start: 4, end: 9 }, parse_range(Some("bytes=4-9"), 66));
/// assert_eq!(RangeResult::Unsatisfiable, parse_range(Some("bytes=fkjdsfs-"), 66));
/// assert_eq!(RangeResult::NoRange, parse_range(None, 66));
/// ```
pub fn parse_range(header: Option<&str>, size: u64) -> RangeResult {
    let Some(header) = header else {
        return RangeResult::NoRange;
    };

    let Some(spec) = parse_spec(header) else {
        debug!(header, "malformed range header");
        return RangeResult::Unsatisfiable;
    };

    let result = resolve(spec, size);
    if result == RangeResult::Unsatisfiable {
        debug!(header, size, "range outside of resource");
    }
    result
}

fn parse_spec(header: &str) -> Option<RangeSpec> {
    let (unit, set) = header.trim().split_once('=')?;
    if !unit.eq_ignore_ascii_case("bytes") {
        return None;
    }

    // multipart/byteranges is not supported
    if set.contains(',') {
        return None;
    }

    let (first, last) = set.split_once('-')?;
    match (first.is_empty(), last.is_empty()) {
        (true, true) => None,
        (true, false) => Some(RangeSpec::Suffix { length: parse_position(last)? }),
        (false, true) => Some(RangeSpec::From { first: parse_position(first)? }),
        (false, false) => Some(RangeSpec::Bounded {
            first: parse_position(first)?,
            last: parse_position(last)?,
        }),
    }
}

/// A non-empty run of ASCII digits that fits in a `u64`.
fn parse_position(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn resolve(spec: RangeSpec, size: u64) -> RangeResult {
    // nothing in an empty resource can be selected
    let Some(last_index) = size.checked_sub(1) else {
        return RangeResult::Unsatisfiable;
    };

    match spec {
        RangeSpec::Bounded { first, last } if first <= last && last <= last_index => {
            RangeResult::Satisfiable { start: first, end: last }
        }
        RangeSpec::From { first } if first <= last_index => {
            RangeResult::Satisfiable { start: first, end: last_index }
        }
        RangeSpec::Suffix { length } if length > 0 => RangeResult::Satisfiable {
            start: size.saturating_sub(length),
            end: last_index,
        },
        _ => RangeResult::Unsatisfiable,
    }
}
