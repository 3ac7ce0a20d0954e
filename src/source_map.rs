/// Where an emitted line came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineOrigin {
    pub file: String,

    /// Line in `file`, starting at 1
    pub line: usize,
}

/// Emitted source text, along with the origin of every line in it.
///
/// A line's origin is that of the first text written onto it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedSource {
    text: String,
    origins: Vec<LineOrigin>,
    at_line_start: bool,
}

impl Default for EmittedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EmittedSource {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            origins: Vec::new(),
            at_line_start: true,
        }
    }

    pub fn push_str(&mut self, text: &str, file: &str, line: usize) {
        for piece in text.split_inclusive('\n') {
            self.push_piece(piece, || LineOrigin {
                file: file.to_owned(),
                line,
            });
        }
    }

    /// Appends another emitted source, keeping its line origins.
    pub fn append(&mut self, other: &EmittedSource) {
        for (piece, origin) in other.text.split_inclusive('\n').zip(&other.origins) {
            self.push_piece(piece, || origin.clone());
        }
    }

    fn push_piece(&mut self, piece: &str, origin: impl FnOnce() -> LineOrigin) {
        if self.at_line_start {
            self.origins.push(origin());
            self.at_line_start = false;
        }
        self.text.push_str(piece);
        if piece.ends_with('\n') {
            self.at_line_start = true;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Origin of the 1-based `line` of the emitted text.
    pub fn origin_of_line(&self, line: usize) -> Option<&LineOrigin> {
        line.checked_sub(1).and_then(|i| self.origins.get(i))
    }

    pub fn line_origins(&self) -> &[LineOrigin] {
        &self.origins
    }
}
