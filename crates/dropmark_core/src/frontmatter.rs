use std::collections::BTreeMap;

const FENCE: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrontMatter {
    pub fields: BTreeMap<String, String>,
    /// Text following the closing fence, leading blank lines removed.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrontMatterError {
    #[error("front matter opened on line 1 but never closed")]
    Unterminated,
    #[error("malformed front matter on line {line}: {text:?}")]
    MalformedLine { line: usize, text: String },
    #[error("{0}")]
    Other(String),
}

/// Splits an item body into front matter fields and the remaining text.
///
/// `Ok(None)` means the text carries no front matter at all.
pub trait FrontMatterParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Option<FrontMatter>, FrontMatterError>;
}

/// Minimal `key: value` front matter between two `---` fences.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyValueFrontMatter;

impl FrontMatterParser for KeyValueFrontMatter {
    fn parse(&self, text: &str) -> Result<Option<FrontMatter>, FrontMatterError> {
        let mut lines = text.lines().enumerate();
        match lines.next() {
            Some((_, first)) if first.trim_end() == FENCE => {}
            _ => return Ok(None),
        }

        let mut fields = BTreeMap::new();
        let mut closed = false;
        for (idx, line) in &mut lines {
            let trimmed = line.trim();
            if trimmed == FENCE {
                closed = true;
                break;
            }
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once(':') else {
                return Err(FrontMatterError::MalformedLine {
                    line: idx + 1,
                    text: line.to_string(),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(FrontMatterError::MalformedLine {
                    line: idx + 1,
                    text: line.to_string(),
                });
            }
            fields.insert(key.to_string(), unquote(value.trim()).to_string());
        }
        if !closed {
            return Err(FrontMatterError::Unterminated);
        }

        let body = lines.map(|(_, line)| line).collect::<Vec<_>>().join("\n");
        Ok(Some(FrontMatter {
            fields,
            body: body.trim_start_matches('\n').to_string(),
        }))
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
