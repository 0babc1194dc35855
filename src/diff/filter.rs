//! Record filters: `mime:<prefix>`, `name:<substring>`, `size:[op]<bytes>`.

use crate::types::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecordFilter {
    #[default]
    All,
    /// Unknown or malformed expressions match nothing.
    Nothing,
    MimePrefix(String),
    PathContains(String),
    Size(SizeOp, u64),
}

impl RecordFilter {
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if expr.is_empty() {
            return RecordFilter::All;
        }
        if let Some(prefix) = expr.strip_prefix("mime:") {
            return RecordFilter::MimePrefix(prefix.trim().to_string());
        }
        if let Some(needle) = expr.strip_prefix("name:") {
            return RecordFilter::PathContains(needle.trim().to_string());
        }
        if let Some(spec) = expr.strip_prefix("size:") {
            return parse_size(spec.trim()).unwrap_or(RecordFilter::Nothing);
        }
        RecordFilter::Nothing
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Nothing => false,
            RecordFilter::MimePrefix(prefix) => record
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.starts_with(prefix.as_str())),
            RecordFilter::PathContains(needle) => record.relative_path.contains(needle.as_str()),
            RecordFilter::Size(op, bytes) => match op {
                SizeOp::Eq => record.size == *bytes,
                SizeOp::Gt => record.size > *bytes,
                SizeOp::Ge => record.size >= *bytes,
                SizeOp::Lt => record.size < *bytes,
                SizeOp::Le => record.size <= *bytes,
            },
        }
    }
}

fn parse_size(spec: &str) -> Option<RecordFilter> {
    // Two-character operators first so ">=" is not read as ">".
    let (op, number) = [
        (">=", SizeOp::Ge),
        ("<=", SizeOp::Le),
        (">", SizeOp::Gt),
        ("<", SizeOp::Lt),
        ("=", SizeOp::Eq),
    ]
    .iter()
    .find_map(|(token, op)| spec.strip_prefix(token).map(|rest| (*op, rest)))
    .unwrap_or((SizeOp::Eq, spec));
    number.trim().parse().ok().map(|n| RecordFilter::Size(op, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(size: u64) -> Record {
        Record::new("h", "f", size, 0)
    }

    #[test]
    fn test_blank_matches_everything() {
        assert!(RecordFilter::parse("  ").matches(&sized(1)));
    }

    #[test]
    fn test_unknown_prefix_matches_nothing() {
        assert!(!RecordFilter::parse("unknown:x").matches(&sized(1)));
        assert!(!RecordFilter::parse("size:lots").matches(&sized(1)));
    }

    #[test]
    fn test_mime_prefix() {
        let filter = RecordFilter::parse("mime:text");
        let text = sized(1).with_mime_type(Some("text/plain".into()));
        let image = sized(1).with_mime_type(Some("image/png".into()));
        assert!(filter.matches(&text));
        assert!(!filter.matches(&image));
        assert!(!filter.matches(&sized(1)));
    }

    #[test]
    fn test_name_substring() {
        let filter = RecordFilter::parse("name:test");
        assert!(filter.matches(&Record::new("h", "dir/mytest.txt", 1, 0)));
        assert!(!filter.matches(&Record::new("h", "other.txt", 1, 0)));
    }

    #[test]
    fn test_expression_value_is_trimmed() {
        assert_eq!(
            RecordFilter::parse("name: test "),
            RecordFilter::PathContains("test".to_string())
        );
        assert_eq!(
            RecordFilter::parse("mime:  image/"),
            RecordFilter::MimePrefix("image/".to_string())
        );
    }

    #[test]
    fn test_size_operators() {
        assert!(RecordFilter::parse("size:100").matches(&sized(100)));
        assert!(RecordFilter::parse("size:=100").matches(&sized(100)));
        assert!(RecordFilter::parse("size:>100").matches(&sized(101)));
        assert!(!RecordFilter::parse("size:>100").matches(&sized(100)));
        assert!(RecordFilter::parse("size:>=100").matches(&sized(100)));
        assert!(RecordFilter::parse("size:<100").matches(&sized(99)));
        assert!(!RecordFilter::parse("size:<=100").matches(&sized(101)));
    }
}
