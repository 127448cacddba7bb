use std::fmt;

/// Compare `a` to an already lowercased ascii string.
pub(crate) fn compare_lowercase_ascii(a: &[u8], lowercased: &[u8]) -> bool {
    if a.len() != lowercased.len() {
        return false;
    }

    for (a, b) in a.iter().zip(lowercased.iter()) {
        if !a.is_ascii() {
            return false;
        }
        if a.to_ascii_lowercase() != *b {
            return false;
        }
    }

    true
}

/// Case insensitive ascii comparison of two byte strings.
pub fn ascii_eq_ignore_case(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

/// Whether a comma separated header value contains `token` (case insensitive).
pub(crate) fn contains_token(value: &[u8], token: &[u8]) -> bool {
    value
        .split(|c| *c == b',')
        .map(trim_ascii)
        .any(|v| ascii_eq_ignore_case(v, token))
}

pub(crate) fn trim_ascii(mut b: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = b {
        if first.is_ascii_whitespace() {
            b = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = b {
        if last.is_ascii_whitespace() {
            b = rest;
        } else {
            break;
        }
    }
    b
}

pub(crate) fn find_crlf(b: &[u8]) -> Option<usize> {
    let cr = b.iter().position(|c| *c == b'\r')?;
    let maybe_lf = b.get(cr + 1)?;
    if *maybe_lf == b'\n' {
        Some(cr)
    } else {
        None
    }
}

fn unhex(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode `%XX` escapes. Malformed escapes are kept verbatim.
///
/// With `plus_as_space`, `+` decodes to a space as in
/// `application/x-www-form-urlencoded`.
pub fn percent_decode(input: &[u8], plus_as_space: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let c = input[i];
        if c == b'%' && i + 2 < input.len() {
            if let (Some(h), Some(l)) = (unhex(input[i + 1]), unhex(input[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        if c == b'+' && plus_as_space {
            out.push(b' ');
        } else {
            out.push(c);
        }
        i += 1;
    }

    out
}

/// Percent decode into a `String`, replacing invalid utf-8.
pub fn percent_decode_str(input: &[u8], plus_as_space: bool) -> String {
    match String::from_utf8(percent_decode(input, plus_as_space)) {
        Ok(v) => v,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Encode for use as a key or value in `application/x-www-form-urlencoded`.
pub fn form_urlencode(input: &str, out: &mut String) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    for b in input.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'*' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(HEX[(b >> 4) as usize] as char);
                out.push(HEX[(b & 0xf) as usize] as char);
            }
        }
    }
}

pub(crate) fn append_number<N: itoa::Integer>(out: &mut Vec<u8>, n: N) {
    let mut b = itoa::Buffer::new();
    out.extend_from_slice(b.format(n).as_bytes());
}

pub(crate) fn append_hex(out: &mut Vec<u8>, mut n: usize) {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    if n == 0 {
        out.push(b'0');
        return;
    }

    let mut tmp = [0_u8; 16];
    let mut i = tmp.len();
    while n > 0 {
        i -= 1;
        tmp[i] = HEX[n & 0xf];
        n >>= 4;
    }
    out.extend_from_slice(&tmp[i..]);
}

pub(crate) struct LengthChecker {
    handled: u64,
    expected: u64,
}

impl LengthChecker {
    pub fn new(expected: u64) -> Self {
        LengthChecker {
            handled: 0,
            expected,
        }
    }

    /// Accept `amount` more bytes, unless that goes past the expected total.
    pub fn append(&mut self, amount: usize) -> bool {
        let new_total = self.handled + amount as u64;
        if new_total > self.expected {
            return false;
        }
        self.handled = new_total;
        true
    }

    pub fn handled(&self) -> u64 {
        self.handled
    }

    pub fn complete(&self) -> bool {
        self.handled == self.expected
    }
}

impl fmt::Debug for LengthChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LengthChecker")
            .field("handled", &self.handled)
            .field("expected", &self.expected)
            .finish()
    }
}
