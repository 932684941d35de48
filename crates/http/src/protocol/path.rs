/// The decoded path of a request target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    path: String,
    segments: Vec<String>,
}

impl Path {
    /// The whole path with percent escapes decoded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The non-empty segments between slashes, each decoded on its own so an
    /// escaped `%2F` stays inside its segment.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, unless the path ends with a slash.
    pub fn name(&self) -> Option<&str> {
        if self.path.ends_with('/') {
            return None;
        }
        self.segments.last().map(String::as_str)
    }

    /// The extension of [`Path::name`], without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(index) => Some(&name[index + 1..]),
        }
    }

    /// Everything up to and including the last slash.
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(index) => &self.path[..=index],
            None => "/",
        }
    }
}

impl From<&str> for Path {
    fn from(raw: &str) -> Self {
        let segments = raw.split('/').filter(|segment| !segment.is_empty()).map(percent_decode).collect();
        Self { path: percent_decode(raw), segments }
    }
}

/// Decodes `%XX` escapes, malformed escapes are kept as they are.
fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'%' {
            let high = bytes.get(index + 1).and_then(|byte| hex(*byte));
            let low = bytes.get(index + 2).and_then(|byte| hex(*byte));
            if let (Some(high), Some(low)) = (high, low) {
                decoded.push((high << 4) | low);
                index += 3;
                continue;
            }
        }
        decoded.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
