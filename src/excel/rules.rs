//! Declarative formatting rules
//!
//! Rules are plain data, deserialised from the `formatting` section of the
//! configuration and applied in order by [`super::SheetFormatter`].

use crate::types::CellValue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

//==============================================================================
// Styles
//==============================================================================

/// RGB colour parsed from a hex string ("366092" or "#366092")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub u32);

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return Err(format!("invalid colour '{}': expected RRGGBB", value));
        }
        u32::from_str_radix(hex, 16)
            .map(HexColor)
            .map_err(|_| format!("invalid colour '{}': expected RRGGBB", value))
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        format!("{:06X}", color.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

/// Visual style of a cell
///
/// Every field is optional; [`CellStyle::merge`] overlays the set fields of
/// a later style on top of an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CellStyle {
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub font_color: Option<HexColor>,
    pub fill_color: Option<HexColor>,
    pub horizontal: Option<HorizontalAlign>,
    pub vertical: Option<VerticalAlign>,
    pub wrap_text: Option<bool>,
    pub number_format: Option<String>,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    pub fn font(mut self, name: &str, size: f64) -> Self {
        self.font_name = Some(name.to_string());
        self.font_size = Some(size);
        self
    }

    pub fn font_color(mut self, rgb: u32) -> Self {
        self.font_color = Some(HexColor(rgb));
        self
    }

    pub fn fill_color(mut self, rgb: u32) -> Self {
        self.fill_color = Some(HexColor(rgb));
        self
    }

    pub fn align(mut self, horizontal: HorizontalAlign, vertical: VerticalAlign) -> Self {
        self.horizontal = Some(horizontal);
        self.vertical = Some(vertical);
        self
    }

    pub fn wrap_text(mut self, wrap: bool) -> Self {
        self.wrap_text = Some(wrap);
        self
    }

    pub fn number_format(mut self, format: &str) -> Self {
        self.number_format = Some(format.to_string());
        self
    }

    /// Overlay every field set in `other` onto `self`
    pub fn merge(&mut self, other: &CellStyle) {
        fn overlay<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        overlay(&mut self.font_name, &other.font_name);
        overlay(&mut self.font_size, &other.font_size);
        overlay(&mut self.bold, &other.bold);
        overlay(&mut self.italic, &other.italic);
        overlay(&mut self.font_color, &other.font_color);
        overlay(&mut self.fill_color, &other.fill_color);
        overlay(&mut self.horizontal, &other.horizontal);
        overlay(&mut self.vertical, &other.vertical);
        overlay(&mut self.wrap_text, &other.wrap_text);
        overlay(&mut self.number_format, &other.number_format);
    }

    pub fn is_empty(&self) -> bool {
        *self == CellStyle::default()
    }
}

/// Semantic column types and their Excel number formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Date,
    DateTime,
    Int,
    Float,
    Currency,
    Percentage,
    General,
}

impl DataType {
    pub fn number_format(&self) -> &'static str {
        match self {
            DataType::Date => "dd/mm/yyyy",
            DataType::DateTime => "dd/mm/yyyy hh:mm:ss",
            DataType::Int => "#,##0",
            DataType::Float => "#,##0.00",
            DataType::Currency => "\"$\"#,##0;[Red]-#,##0",
            DataType::Percentage => "0.00%",
            DataType::General => "General",
        }
    }
}

//==============================================================================
// Targets and Predicates
//==============================================================================

/// A column given by 0-based index, by letter ("C") or by header name
///
/// Names are matched against the header row first and fall back to
/// column letters, so a header literally named "A" wins over column A.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(u16),
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(index) => write!(f, "column #{}", index),
            ColumnRef::Name(name) => write!(f, "column '{}'", name),
        }
    }
}

/// Region a rule applies to, resolved against the used range at apply time
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The whole used range
    #[default]
    Sheet,
    /// One column of the used range
    Column(ColumnRef),
    /// Sheet rows `first..=last` (0-based) across the used columns
    Rows { first: u32, last: u32 },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Sheet => write!(f, "sheet"),
            Target::Column(column) => write!(f, "{}", column),
            Target::Rows { first, last } => write!(f, "rows {}..={}", first, last),
        }
    }
}

/// Regular expression compiled when the rule is built or deserialised
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Pattern)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl TryFrom<String> for Pattern {
    type Error = regex::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Pattern::new(&value)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.0.as_str().to_string()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

/// Per-cell condition gating a style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Equals(CellValue),
    NotEquals(CellValue),
    GreaterThan(f64),
    GreaterOrEqual(f64),
    LessThan(f64),
    LessOrEqual(f64),
    Between { min: f64, max: f64 },
    /// Substring test on the rendered value
    Contains(String),
    /// Regex test on the rendered value
    Matches(Pattern),
    Empty,
    NotEmpty,
}

impl Predicate {
    /// Evaluate against one cell; numeric comparisons never match non-numbers
    pub fn evaluate(&self, value: &CellValue) -> bool {
        match self {
            Predicate::Equals(expected) => value == expected,
            Predicate::NotEquals(expected) => value != expected,
            Predicate::GreaterThan(bound) => value.as_f64().is_some_and(|n| n > *bound),
            Predicate::GreaterOrEqual(bound) => value.as_f64().is_some_and(|n| n >= *bound),
            Predicate::LessThan(bound) => value.as_f64().is_some_and(|n| n < *bound),
            Predicate::LessOrEqual(bound) => value.as_f64().is_some_and(|n| n <= *bound),
            Predicate::Between { min, max } => {
                value.as_f64().is_some_and(|n| n >= *min && n <= *max)
            }
            Predicate::Contains(needle) => {
                !value.is_empty() && value.to_string().contains(needle.as_str())
            }
            Predicate::Matches(pattern) => !value.is_empty() && pattern.is_match(&value.to_string()),
            Predicate::Empty => value.is_empty(),
            Predicate::NotEmpty => !value.is_empty(),
        }
    }
}

//==============================================================================
// Rules
//==============================================================================

/// Auto-fit parameters: `width = min(longest rendered value + padding, max)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoFit {
    pub padding: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for AutoFit {
    fn default() -> Self {
        Self {
            padding: 2.0,
            min: 0.0,
            max: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnWidth {
    Fixed(f64),
    Auto(AutoFit),
}

impl Default for ColumnWidth {
    fn default() -> Self {
        ColumnWidth::Auto(AutoFit::default())
    }
}

fn default_skip_header() -> bool {
    true
}

/// One formatting instruction; tagged by `kind` in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormattingRule {
    /// Fixed or auto-fit width for every column of the target
    ColumnWidth {
        #[serde(default)]
        target: Target,
        #[serde(default)]
        width: ColumnWidth,
    },
    /// Style for the first row of the used range
    HeaderStyle { style: CellStyle },
    /// Style for cells of the target, optionally only where `when` holds
    #[serde(rename = "cell_style", alias = "conditional_style")]
    ConditionalStyle {
        #[serde(default)]
        target: Target,
        style: CellStyle,
        #[serde(default)]
        when: Option<Predicate>,
        #[serde(default = "default_skip_header")]
        skip_header: bool,
    },
    /// Number format for the data cells of one column
    ColumnType {
        column: ColumnRef,
        data_type: DataType,
    },
    /// Fill every other data row, starting with the second one
    AlternatingRows { fill_color: HexColor },
    /// Freeze rows above and columns left of the given A1 cell
    FreezePanes { cell: String },
    /// Auto-filter over the used range
    AutoFilter,
}

impl FormattingRule {
    pub fn kind(&self) -> &'static str {
        match self {
            FormattingRule::ColumnWidth { .. } => "column_width",
            FormattingRule::HeaderStyle { .. } => "header_style",
            FormattingRule::ConditionalStyle { .. } => "cell_style",
            FormattingRule::ColumnType { .. } => "column_type",
            FormattingRule::AlternatingRows { .. } => "alternating_rows",
            FormattingRule::FreezePanes { .. } => "freeze_panes",
            FormattingRule::AutoFilter => "auto_filter",
        }
    }
}

/// The house style: header band, body font, zebra rows, filter,
/// auto-fit widths and a frozen header row and first column.
pub fn standard_ruleset() -> Vec<FormattingRule> {
    vec![
        FormattingRule::HeaderStyle {
            style: CellStyle::new()
                .font("Calibri", 12.0)
                .bold(true)
                .font_color(0xFFFFFF)
                .fill_color(0x366092)
                .align(HorizontalAlign::Center, VerticalAlign::Center),
        },
        FormattingRule::ConditionalStyle {
            target: Target::Sheet,
            style: CellStyle::new()
                .font("Calibri", 11.0)
                .align(HorizontalAlign::Left, VerticalAlign::Top),
            when: None,
            skip_header: true,
        },
        FormattingRule::AlternatingRows {
            fill_color: HexColor(0xF8F9FA),
        },
        FormattingRule::AutoFilter,
        FormattingRule::ColumnWidth {
            target: Target::Sheet,
            width: ColumnWidth::Auto(AutoFit {
                padding: 8.0,
                min: 0.0,
                max: 60.0,
            }),
        },
        FormattingRule::FreezePanes {
            cell: "B2".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_parsing() {
        assert_eq!(HexColor::try_from("366092".to_string()), Ok(HexColor(0x366092)));
        assert_eq!(HexColor::try_from("#ffffff".to_string()), Ok(HexColor(0xFFFFFF)));
        assert!(HexColor::try_from("fff".to_string()).is_err());
        assert!(HexColor::try_from("GGGGGG".to_string()).is_err());
    }

    #[test]
    fn test_style_merge_overrides_set_fields_only() {
        let mut base = CellStyle::new().bold(true).fill_color(0x366092);
        base.merge(&CellStyle::new().fill_color(0xFF0000).italic(true));
        assert_eq!(base.bold, Some(true));
        assert_eq!(base.italic, Some(true));
        assert_eq!(base.fill_color, Some(HexColor(0xFF0000)));
    }

    #[test]
    fn test_predicates() {
        let thirty = CellValue::Number(30.0);
        assert!(Predicate::GreaterThan(25.0).evaluate(&thirty));
        assert!(!Predicate::LessThan(25.0).evaluate(&thirty));
        assert!(Predicate::Between { min: 30.0, max: 40.0 }.evaluate(&thirty));
        assert!(!Predicate::GreaterThan(0.0).evaluate(&CellValue::from("31")));
        assert!(Predicate::Equals(CellValue::from("ok")).evaluate(&CellValue::from("ok")));
        assert!(Predicate::Contains("li".to_string()).evaluate(&CellValue::from("Alice")));
        assert!(Predicate::Empty.evaluate(&CellValue::Empty));
        assert!(!Predicate::Contains(String::new()).evaluate(&CellValue::Empty));
    }

    #[test]
    fn test_matches_predicate() {
        let predicate = Predicate::Matches(Pattern::new(r"^\d{3}-\d{4}$").unwrap());
        assert!(predicate.evaluate(&CellValue::from("555-1234")));
        assert!(!predicate.evaluate(&CellValue::from("5551234")));
    }

    #[test]
    fn test_rules_from_yaml() {
        let yaml = r##"
- kind: header_style
  style:
    bold: true
    fill_color: "366092"
- kind: column_width
  target:
    column: B
  width:
    fixed: 20
- kind: cell_style
  target:
    column: Age
  when:
    greater_than: 28
  style:
    font_color: "#FF0000"
- kind: column_type
  column: 2
  data_type: currency
- kind: freeze_panes
  cell: B2
- kind: auto_filter
"##;
        let rules: Vec<FormattingRule> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules.len(), 6);
        assert_eq!(
            rules[1],
            FormattingRule::ColumnWidth {
                target: Target::Column(ColumnRef::Name("B".to_string())),
                width: ColumnWidth::Fixed(20.0),
            }
        );
        match &rules[2] {
            FormattingRule::ConditionalStyle {
                when, skip_header, ..
            } => {
                assert_eq!(when, &Some(Predicate::GreaterThan(28.0)));
                assert!(*skip_header);
            }
            other => panic!("unexpected rule {:?}", other),
        }
        assert_eq!(
            rules[3],
            FormattingRule::ColumnType {
                column: ColumnRef::Index(2),
                data_type: DataType::Currency,
            }
        );
        assert_eq!(rules[5], FormattingRule::AutoFilter);
    }

    #[test]
    fn test_invalid_regex_rejected_at_load() {
        let yaml = "- kind: cell_style\n  style: {bold: true}\n  when:\n    matches: \"(\"\n";
        assert!(serde_yaml::from_str::<Vec<FormattingRule>>(yaml).is_err());
    }

    #[test]
    fn test_standard_ruleset_order() {
        let kinds: Vec<&str> = standard_ruleset().iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "header_style",
                "cell_style",
                "alternating_rows",
                "auto_filter",
                "column_width",
                "freeze_panes"
            ]
        );
    }
}
