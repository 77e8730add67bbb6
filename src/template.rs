#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Placeholder { name: String, column: usize },
}

/// Splits display text or code into literal runs and `[name]` placeholders.
///
/// Only identifier-shaped names count as placeholders, so `list[0]` or an
/// unterminated `[` stay literal text.
pub struct TemplateScanner {
    chars: Vec<char>,
    index: usize,
}

impl TemplateScanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
        }
    }

    pub fn scan(&mut self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut text = String::new();
        while !self.at_end() {
            let ch = self.peek();
            if ch == '[' {
                let column = self.index + 1;
                if let Some(name) = self.read_placeholder() {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Placeholder { name, column });
                    continue;
                }
            }
            text.push(ch);
            self.advance();
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        segments
    }

    fn read_placeholder(&mut self) -> Option<String> {
        let start = self.index;
        let mut cursor = start + 1;
        let mut name = String::new();
        while let Some(&ch) = self.chars.get(cursor) {
            if ch == ']' {
                break;
            }
            if !is_ident_char(ch, name.is_empty()) {
                return None;
            }
            name.push(ch);
            cursor += 1;
        }
        if name.is_empty() || self.chars.get(cursor) != Some(&']') {
            return None;
        }
        self.index = cursor + 1;
        Some(name)
    }

    fn peek(&self) -> char {
        self.chars[self.index]
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }
}

fn is_ident_char(ch: char, first: bool) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$' || (!first && ch.is_ascii_digit())
}

pub fn scan(source: &str) -> Vec<Segment> {
    TemplateScanner::new(source).scan()
}
