//! Archive manifest (`META-INF/MANIFEST.MF`) rendering and parsing
//!
//! Lines are at most 72 bytes, excluding the line break. Longer values are
//! continued on following lines that start with a single space.

/// Manifest path inside an archive
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Maximum line length in bytes, excluding CRLF
pub const MAX_LINE_BYTES: usize = 72;

/// Main attributes of an archive manifest, in insertion order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JarManifest {
    attributes: Vec<(String, String)>,
}

impl JarManifest {
    /// Manifest with `Manifest-Version` and `Created-By`
    pub fn new() -> Self {
        let mut manifest = Self::default();
        manifest.set("Manifest-Version", "1.0");
        manifest.set(
            "Created-By",
            format!("stitch {}", env!("CARGO_PKG_VERSION")),
        );
        manifest
    }

    /// Set an attribute, replacing an existing value with the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Attribute names are case-insensitive
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn main_class(&self) -> Option<&str> {
        self.get("Main-Class")
    }

    /// Entries of the `Class-Path` attribute
    pub fn class_path(&self) -> Vec<&str> {
        self.get("Class-Path")
            .map(|cp| cp.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Render to bytes with CRLF line breaks and a terminating blank line
    pub fn render(&self) -> Vec<u8> {
        let mut out = String::new();
        for (name, value) in &self.attributes {
            write_wrapped(&mut out, &format!("{}: {}", name, value));
        }
        out.push_str("\r\n");
        out.into_bytes()
    }

    /// Parse manifest text, joining continuation lines.
    ///
    /// Parsing stops at the first blank line; per-entry sections are ignored.
    pub fn parse(text: &str) -> Self {
        let mut logical: Vec<String> = Vec::new();
        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }
            match (line.strip_prefix(' '), logical.last_mut()) {
                (Some(rest), Some(last)) => last.push_str(rest),
                _ => logical.push(line.to_string()),
            }
        }

        let mut manifest = Self::default();
        for line in logical {
            if let Some((name, value)) = line.split_once(':') {
                manifest.set(name.trim(), value.strip_prefix(' ').unwrap_or(value));
            }
        }
        manifest
    }
}

/// Append one logical line, split into physical lines of at most 72 bytes
fn write_wrapped(out: &mut String, line: &str) {
    let mut rest = line;
    let mut limit = MAX_LINE_BYTES;
    loop {
        if rest.len() <= limit {
            out.push_str(rest);
            out.push_str("\r\n");
            return;
        }
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n ");
        rest = &rest[cut..];
        // continuation lines spend one byte on the leading space
        limit = MAX_LINE_BYTES - 1;
    }
}
