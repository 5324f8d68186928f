//! Fixed-width record decoding driven by a packed Fortran edit descriptor such
//! as `F11.4,F7.3,1X,A10,2I5`.
//!
//! `X` fields are fillers: they take part in the column arithmetic but never
//! reach the decoded record.

use crate::domain::{GfallError, GfallResult};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Float,
    Integer,
    Blank,
    Text,
}

impl FieldKind {
    fn from_tag(tag: char) -> Option<Self> {
        match tag.to_ascii_uppercase() {
            'F' => Some(Self::Float),
            'I' => Some(Self::Integer),
            'X' => Some(Self::Blank),
            'A' => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub width: usize,
    pub decimals: Option<u32>,
}

/// Expands a packed descriptor into one [`FieldSpec`] per physical field.
pub fn parse_fortran_format(descriptor: &str) -> GfallResult<Vec<FieldSpec>> {
    let trimmed = descriptor
        .trim()
        .trim_start_matches("FORMAT")
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');

    let mut fields = Vec::new();
    for token in trimmed.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(descriptor_error(descriptor, "empty field descriptor"));
        }
        fields.extend(parse_token(descriptor, token)?);
    }
    Ok(fields)
}

fn parse_token(descriptor: &str, token: &str) -> GfallResult<Vec<FieldSpec>> {
    let tag_position = token
        .find(|character: char| character.is_ascii_alphabetic())
        .ok_or_else(|| descriptor_error(descriptor, &format!("'{token}' has no type tag")))?;
    let (leading, rest) = token.split_at(tag_position);
    let mut rest_chars = rest.chars();
    let tag = rest_chars.next().unwrap_or_default();
    let trailing = rest_chars.as_str();

    let kind = FieldKind::from_tag(tag).ok_or_else(|| {
        descriptor_error(descriptor, &format!("unsupported type tag '{tag}' in '{token}'"))
    })?;

    let leading = if leading.is_empty() {
        None
    } else {
        Some(parse_count(descriptor, token, leading)?)
    };

    if kind == FieldKind::Blank {
        if !trailing.is_empty() {
            return Err(descriptor_error(
                descriptor,
                &format!("filler '{token}' takes its width before the tag"),
            ));
        }
        let width = leading.unwrap_or(1);
        return Ok(vec![FieldSpec {
            kind,
            width,
            decimals: None,
        }]);
    }

    let repeat = leading.unwrap_or(1);
    let (width, decimals) = match trailing.split_once('.') {
        Some((width, decimals)) => {
            if kind != FieldKind::Float {
                return Err(descriptor_error(
                    descriptor,
                    &format!("only float fields carry decimals, got '{token}'"),
                ));
            }
            let decimals = parse_count(descriptor, token, decimals)?;
            (parse_count(descriptor, token, width)?, Some(decimals as u32))
        }
        None => (parse_count(descriptor, token, trailing)?, None),
    };

    if width == 0 || repeat == 0 {
        return Err(descriptor_error(
            descriptor,
            &format!("'{token}' declares a zero width or repeat"),
        ));
    }

    Ok(vec![
        FieldSpec {
            kind,
            width,
            decimals,
        };
        repeat
    ])
}

fn parse_count(descriptor: &str, token: &str, digits: &str) -> GfallResult<usize> {
    digits.parse::<usize>().map_err(|_| {
        descriptor_error(
            descriptor,
            &format!("'{token}' has a malformed count '{digits}'"),
        )
    })
}

fn descriptor_error(descriptor: &str, detail: &str) -> GfallError {
    GfallError::format(
        "FORMAT.DESCRIPTOR",
        format!("invalid format descriptor '{descriptor}': {detail}"),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(Option<f64>),
    Integer(Option<i64>),
    Text(Option<String>),
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            Self::Float(None) | Self::Integer(None) | Self::Text(None)
        )
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => *value,
            Self::Integer(value) => value.map(|value| value as f64),
            Self::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => *value,
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => value.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: FieldKind,
    pub start: usize,
    pub width: usize,
}

/// One decoded physical line. `values` follows [`FixedWidthLayout::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub line_number: usize,
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone)]
pub struct FixedWidthLayout {
    columns: Vec<ColumnSpec>,
    positions: HashMap<String, usize>,
    total_width: usize,
}

impl FixedWidthLayout {
    pub fn from_descriptor(descriptor: &str, names: &[&str]) -> GfallResult<Self> {
        let fields = parse_fortran_format(descriptor)?;
        if fields.len() != names.len() {
            return Err(GfallError::format(
                "FORMAT.COLUMN_COUNT",
                format!(
                    "format descriptor declares {} fields but {} column names were given",
                    fields.len(),
                    names.len()
                ),
            ));
        }

        let mut columns = Vec::with_capacity(fields.len());
        let mut positions = HashMap::new();
        let mut start = 0;
        for (field, name) in fields.iter().zip(names) {
            if field.kind != FieldKind::Blank {
                if positions.insert((*name).to_string(), columns.len()).is_some() {
                    return Err(GfallError::format(
                        "FORMAT.COLUMN_COUNT",
                        format!("column name '{name}' is declared twice"),
                    ));
                }
                columns.push(ColumnSpec {
                    name: (*name).to_string(),
                    kind: field.kind,
                    start,
                    width: field.width,
                });
            }
            start += field.width;
        }

        Ok(Self {
            columns,
            positions,
            total_width: start,
        })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn total_width(&self) -> usize {
        self.total_width
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Decodes one line; blank lines and lines without any value yield `None`.
    pub fn decode_line(&self, line_number: usize, line: &str) -> GfallResult<Option<RawRecord>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let characters = line.chars().collect::<Vec<_>>();
        if characters.len() > self.total_width
            && characters[self.total_width..]
                .iter()
                .any(|character| !character.is_whitespace())
        {
            return Err(GfallError::format(
                "FORMAT.LINE_WIDTH",
                format!(
                    "line {line_number} is {} characters wide but the format declares {}",
                    characters.len(),
                    self.total_width
                ),
            ));
        }

        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let end = (column.start + column.width).min(characters.len());
            let text = if column.start < end {
                characters[column.start..end].iter().collect::<String>()
            } else {
                String::new()
            };
            values.push(decode_field(line_number, column, text.trim())?);
        }

        if values.iter().all(FieldValue::is_missing) {
            return Ok(None);
        }

        Ok(Some(RawRecord {
            line_number,
            values,
        }))
    }

    pub fn decode_source(&self, source: &str) -> GfallResult<Vec<RawRecord>> {
        let mut records = Vec::new();
        for (index, line) in source.lines().enumerate() {
            if let Some(record) = self.decode_line(index + 1, line)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn decode_field(line_number: usize, column: &ColumnSpec, text: &str) -> GfallResult<FieldValue> {
    let field_error = || {
        GfallError::format(
            "FORMAT.FIELD",
            format!(
                "line {line_number}: field '{}' (columns {}-{}) has unparsable value '{text}'",
                column.name,
                column.start + 1,
                column.start + column.width
            ),
        )
    };

    match column.kind {
        FieldKind::Float => {
            if text.is_empty() {
                return Ok(FieldValue::Float(None));
            }
            let normalized = text.replace(['D', 'd'], "E");
            normalized
                .parse::<f64>()
                .map(|value| FieldValue::Float(Some(value)))
                .map_err(|_| field_error())
        }
        FieldKind::Integer => {
            if text.is_empty() {
                return Ok(FieldValue::Integer(None));
            }
            text.parse::<i64>()
                .map(|value| FieldValue::Integer(Some(value)))
                .map_err(|_| field_error())
        }
        FieldKind::Text => Ok(FieldValue::Text(
            (!text.is_empty()).then(|| text.to_string()),
        )),
        FieldKind::Blank => Err(GfallError::internal(
            "INTERNAL.BLANK_COLUMN",
            format!("filler column '{}' reached the decoder", column.name),
        )),
    }
}
