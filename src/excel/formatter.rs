//! Sheet formatter - applies [`FormattingRule`]s to a sheet of an open workbook

use super::address;
use super::rules::{standard_ruleset, CellStyle, ColumnRef, ColumnWidth, FormattingRule, Target};
use super::workbook::{Sheet, SheetLayout, UsedRange, Workbook};
use crate::error::{SheetsmithError, SheetsmithResult};
use tracing::{debug, error, info};
use unicode_width::UnicodeWidthStr;

/// Applies an ordered ruleset to one sheet at a time
///
/// Rules run strictly in order against a copy of the sheet layout; the copy
/// replaces the sheet's layout only when every rule succeeded. The formatter
/// never saves the workbook.
#[derive(Debug, Clone, Default)]
pub struct SheetFormatter {
    rules: Vec<FormattingRule>,
}

/// Rectangular region a rule resolved to (inclusive bounds)
#[derive(Debug, Clone, Copy)]
struct Region {
    first_row: u32,
    last_row: u32,
    first_col: u16,
    last_col: u16,
}

impl From<UsedRange> for Region {
    fn from(used: UsedRange) -> Self {
        Self {
            first_row: used.first_row,
            last_row: used.last_row,
            first_col: used.first_col,
            last_col: used.last_col,
        }
    }
}

impl SheetFormatter {
    pub fn new(rules: Vec<FormattingRule>) -> Self {
        Self { rules }
    }

    /// Formatter preloaded with [`standard_ruleset`]
    pub fn standard() -> Self {
        Self::new(standard_ruleset())
    }

    pub fn rules(&self) -> &[FormattingRule] {
        &self.rules
    }

    /// Apply every rule to `sheet_name`
    pub fn format(&self, workbook: &mut Workbook, sheet_name: &str) -> SheetsmithResult<()> {
        self.format_sheet(workbook, sheet_name).inspect_err(|err| {
            error!(
                sheet = %sheet_name,
                code = err.code(),
                error = %err,
                "formatting failed"
            );
        })
    }

    fn format_sheet(&self, workbook: &mut Workbook, sheet_name: &str) -> SheetsmithResult<()> {
        let names = workbook.sheet_names();
        let sheet = workbook
            .sheet_mut(sheet_name)
            .ok_or_else(|| SheetsmithError::sheet_not_found(sheet_name, &names))?;

        let mut layout = sheet.layout().clone();
        for (index, rule) in self.rules.iter().enumerate() {
            apply_rule(sheet, &mut layout, rule)?;
            info!(
                sheet = %sheet_name,
                rule = index,
                kind = rule.kind(),
                "applied formatting rule"
            );
        }
        sheet.replace_layout(layout);

        Ok(())
    }
}

fn apply_rule(sheet: &Sheet, layout: &mut SheetLayout, rule: &FormattingRule) -> SheetsmithResult<()> {
    let used = sheet.used_range();

    match rule {
        FormattingRule::ColumnWidth { target, width } => {
            let Some(region) = resolve(sheet, used, target)? else {
                return Ok(());
            };
            for col in region.first_col..=region.last_col {
                let value = match width {
                    ColumnWidth::Fixed(width) => *width,
                    ColumnWidth::Auto(fit) => {
                        let longest = (region.first_row..=region.last_row)
                            .map(|row| sheet.cell(row, col).to_string().width())
                            .max()
                            .unwrap_or(0);
                        (longest as f64 + fit.padding).max(fit.min).min(fit.max)
                    }
                };
                debug!(col = %address::column_letter(col), width = value, "column width");
                layout.column_widths.insert(col, value);
            }
        }

        FormattingRule::HeaderStyle { style } => {
            let Some(used) = used else {
                return Ok(());
            };
            for col in used.first_col..=used.last_col {
                merge_style(layout, used.first_row, col, style);
            }
        }

        FormattingRule::ConditionalStyle {
            target,
            style,
            when,
            skip_header,
        } => {
            let Some(region) = resolve(sheet, used, target)? else {
                return Ok(());
            };
            let header_row = used.map(|u| u.first_row);
            for row in region.first_row..=region.last_row {
                if *skip_header && Some(row) == header_row {
                    continue;
                }
                for col in region.first_col..=region.last_col {
                    let matches = when
                        .as_ref()
                        .map_or(true, |predicate| predicate.evaluate(sheet.cell(row, col)));
                    if matches {
                        merge_style(layout, row, col, style);
                    }
                }
            }
        }

        FormattingRule::ColumnType { column, data_type } => {
            let target = Target::Column(column.clone());
            let Some(region) = resolve(sheet, used, &target)? else {
                return Ok(());
            };
            let style = CellStyle::new().number_format(data_type.number_format());
            for row in (region.first_row + 1)..=region.last_row {
                if !sheet.cell(row, region.first_col).is_empty() {
                    merge_style(layout, row, region.first_col, &style);
                }
            }
        }

        FormattingRule::AlternatingRows { fill_color } => {
            let Some(used) = used else {
                return Ok(());
            };
            let style = CellStyle {
                fill_color: Some(*fill_color),
                ..CellStyle::default()
            };
            for row in (used.first_row + 1)..=used.last_row {
                if (row - used.first_row - 1) % 2 == 1 {
                    for col in used.first_col..=used.last_col {
                        merge_style(layout, row, col, &style);
                    }
                }
            }
        }

        FormattingRule::FreezePanes { cell } => {
            let position = address::parse_cell(cell).ok_or_else(|| {
                SheetsmithError::InvalidRuleTarget(format!("freeze panes cell '{}'", cell))
            })?;
            layout.freeze_panes = Some(position);
        }

        FormattingRule::AutoFilter => {
            if let Some(used) = used {
                debug!(range = %used.reference(), "auto-filter");
                layout.autofilter = Some(used);
            }
        }
    }

    Ok(())
}

fn merge_style(layout: &mut SheetLayout, row: u32, col: u16, style: &CellStyle) {
    layout.styles.entry((row, col)).or_default().merge(style);
}

/// Resolve a target against the current used range
///
/// A whole-sheet target on an empty sheet resolves to nothing; any explicit
/// column or row outside the used range is an error.
fn resolve(sheet: &Sheet, used: Option<UsedRange>, target: &Target) -> SheetsmithResult<Option<Region>> {
    let invalid = |detail: String| SheetsmithError::InvalidRuleTarget(detail);

    match target {
        Target::Sheet => Ok(used.map(Region::from)),

        Target::Column(column) => {
            let used = used.ok_or_else(|| invalid(format!("{} on an empty sheet", column)))?;
            let col = resolve_column(sheet, column)
                .filter(|col| used.contains_col(*col))
                .ok_or_else(|| {
                    invalid(format!("{} is outside the used range {}", column, used.reference()))
                })?;
            Ok(Some(Region {
                first_col: col,
                last_col: col,
                ..Region::from(used)
            }))
        }

        Target::Rows { first, last } => {
            let used =
                used.ok_or_else(|| invalid(format!("{} on an empty sheet", target)))?;
            if first > last || !used.contains_row(*first) || !used.contains_row(*last) {
                return Err(invalid(format!(
                    "{} is outside the used range {}",
                    target,
                    used.reference()
                )));
            }
            Ok(Some(Region {
                first_row: *first,
                last_row: *last,
                ..Region::from(used)
            }))
        }
    }
}

fn resolve_column(sheet: &Sheet, column: &ColumnRef) -> Option<u16> {
    match column {
        ColumnRef::Index(index) => Some(*index),
        ColumnRef::Name(name) => sheet
            .header()
            .into_iter()
            .find(|(_, header)| header == name)
            .map(|(col, _)| col)
            .or_else(|| address::column_index(name)),
    }
}
