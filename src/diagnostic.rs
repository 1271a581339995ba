use std::fmt;

/// A range of bytes in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A message anchored to a span of the offending source.
#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.notes.push(format!("help: {}", help.into()));
        self
    }
}

/// Computes a 1-based (line, column) from a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn line_content(source: &str, line_num: usize) -> &str {
    source.lines().nth(line_num - 1).unwrap_or("")
}

/// Renders diagnostics the way rustc presents errors: a severity header,
/// a `-->` location line, the offending source line with a caret underline,
/// and any notes.
pub struct DiagnosticRenderer<'a> {
    source: &'a str,
    file_name: &'a str,
    use_color: bool,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(source: &'a str, file_name: &'a str, use_color: bool) -> Self {
        Self {
            source,
            file_name,
            use_color,
        }
    }

    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();

        let severity = match diagnostic.severity {
            Severity::Error => self.paint("error", "1;31"),
            Severity::Warning => self.paint("warning", "1;33"),
        };
        match &diagnostic.code {
            Some(code) => output.push_str(&format!(
                "{}[{}]: {}\n",
                severity,
                code,
                self.paint(&diagnostic.message, "1")
            )),
            None => output.push_str(&format!(
                "{}: {}\n",
                severity,
                self.paint(&diagnostic.message, "1")
            )),
        }

        if let Some(label) = diagnostic.labels.first() {
            let (line, col) = line_col(self.source, label.span.start);
            let gutter_width = line.to_string().len();
            let gutter = " ".repeat(gutter_width);

            output.push_str(&format!(
                "{}{} {}:{}:{}\n",
                gutter,
                self.paint("-->", "34"),
                self.file_name,
                line,
                col
            ));
            output.push_str(&format!("{} {}\n", gutter, self.paint("|", "34")));

            let content = line_content(self.source, line);
            output.push_str(&format!(
                "{} {} {}\n",
                self.paint(&line.to_string(), "34"),
                self.paint("|", "34"),
                content
            ));

            let (end_line, end_col) =
                line_col(self.source, label.span.end.max(label.span.start));
            let underline_len = if end_line == line && end_col > col {
                end_col - col
            } else {
                1
            };
            let underline = format!(
                "{}{}",
                " ".repeat(col.saturating_sub(1)),
                "^".repeat(underline_len)
            );
            let mut marker = self.paint(&underline, "31");
            if !label.message.is_empty() {
                marker.push(' ');
                marker.push_str(&self.paint(&label.message, "31"));
            }
            output.push_str(&format!("{} {} {}\n", gutter, self.paint("|", "34"), marker));
            output.push_str(&format!("{} {}\n", gutter, self.paint("|", "34")));
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("  {} {}\n", self.paint("=", "34"), note));
        }

        output
    }

    fn paint(&self, text: &str, style: &str) -> String {
        if self.use_color {
            format!("\x1b[{}m{}\x1b[0m", style, text)
        } else {
            text.to_string()
        }
    }
}

pub fn render_diagnostic(
    source: &str,
    file_name: &str,
    diagnostic: &Diagnostic,
    use_color: bool,
) -> String {
    DiagnosticRenderer::new(source, file_name, use_color).render(diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let source = "x = 5\ny = 10";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 4), (1, 5));
        assert_eq!(line_col(source, 6), (2, 1));
        assert_eq!(line_col(source, 10), (2, 5));
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(5, 10).merge(Span::new(8, 15));
        assert_eq!(merged, Span::new(5, 15));
    }

    #[test]
    fn test_render_points_at_offending_token() {
        let source = "y + 2";
        let diagnostic = Diagnostic::error("undefined variable `y`")
            .with_code("E0201")
            .with_label(Label::primary(Span::new(0, 1), "not found in this scope"));

        let output = render_diagnostic(source, "repl", &diagnostic, false);
        assert!(output.contains("error[E0201]"));
        assert!(output.contains("undefined variable `y`"));
        assert!(output.contains("repl:1:1"));
        assert!(output.contains("^ not found in this scope"));
    }

    #[test]
    fn test_render_second_line() {
        let source = "1 + 1\n2 / 0";
        let diagnostic = Diagnostic::error("division by zero")
            .with_label(Label::primary(Span::new(6, 11), ""));

        let output = render_diagnostic(source, "script", &diagnostic, false);
        assert!(output.contains("script:2:1"));
        assert!(output.contains("2 / 0"));
        assert!(output.contains("^^^^^"));
    }

    #[test]
    fn test_render_without_color_has_no_escape_codes() {
        let diagnostic = Diagnostic::error("boom").with_label(Label::primary(Span::new(0, 1), ""));
        let output = render_diagnostic("x", "repl", &diagnostic, false);
        assert!(!output.contains('\x1b'));
    }
}
