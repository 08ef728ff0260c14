use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, Workbook};

use crate::config::{
    BorderStyle, CellAlignment, CellBorder, CellFill, CellFont, FillPattern, HorizontalAlign,
    ReportConfig, VerticalAlign, parse_color,
};
use crate::table::Row;

pub const WORKSHEET_NAME: &str = "Preference Report";
pub const ROW_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CellStyle {
    pub font: CellFont,
    pub border: CellBorder,
    pub alignment: CellAlignment,
    pub fill: Option<CellFill>,
}

/// Style for the cell at zero-based `row` / `column`; row 0 is the header row.
pub fn cell_style(config: &ReportConfig, header_columns: &[u16], row: u32, column: u16) -> CellStyle {
    let mut style = CellStyle {
        font: config.all_row_font.clone(),
        border: config.all_row_border.clone(),
        alignment: config.all_row_alignment.clone(),
        fill: None,
    };
    if header_columns.contains(&column) {
        style.alignment = config.pref_cell_alignment.clone();
        style.fill = Some(config.header_col_fill.clone());
    }
    if row == 0 {
        style.font = config.header_row_font.clone();
        style.fill = Some(config.header_row_fill.clone());
    }
    style
}

/// Write `rows` (header row first, which is replaced by the configured
/// `headerRow`) to a single-sheet workbook at `path`.
pub fn save_spreadsheet(path: &Path, rows: &[Row], config: &ReportConfig) -> Result<()> {
    let header_columns = config.header_column_indices()?;
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(WORKSHEET_NAME)?;

    for (column, spec) in config.header_row.iter().enumerate() {
        let column = u16::try_from(column).context("too many columns in headerRow")?;
        if let Some(width) = spec.width {
            worksheet.set_column_width(column, width)?;
        }
        let format = to_format(&cell_style(config, &header_columns, 0, column))?;
        worksheet.write_string_with_format(0, column, &spec.header, &format)?;
    }
    worksheet.set_row_height(0, ROW_HEIGHT)?;

    for (index, row) in rows.iter().skip(1).enumerate() {
        let row_number = u32::try_from(index + 1).context("too many rows for a worksheet")?;
        for (column, value) in row.iter().enumerate() {
            let column = u16::try_from(column).context("too many columns")?;
            let format = to_format(&cell_style(config, &header_columns, row_number, column))?;
            worksheet.write_string_with_format(row_number, column, value, &format)?;
        }
        worksheet.set_row_height(row_number, ROW_HEIGHT)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn to_format(style: &CellStyle) -> Result<Format> {
    let mut format = Format::new();

    if let Some(name) = &style.font.name {
        format = format.set_font_name(name.as_str());
    }
    if let Some(size) = style.font.size {
        format = format.set_font_size(size);
    }
    if style.font.bold {
        format = format.set_bold();
    }
    if style.font.italic {
        format = format.set_italic();
    }
    if let Some(color) = &style.font.color {
        format = format.set_font_color(Color::RGB(parse_color(color, "font.color")?));
    }

    if style.border.style != BorderStyle::None {
        format = format.set_border(border_style(style.border.style));
        if let Some(color) = &style.border.color {
            format = format.set_border_color(Color::RGB(parse_color(color, "border.color")?));
        }
    }

    if let Some(horizontal) = style.alignment.horizontal {
        format = format.set_align(horizontal_align(horizontal));
    }
    if let Some(vertical) = style.alignment.vertical {
        format = format.set_align(vertical_align(vertical));
    }
    if style.alignment.wrap_text {
        format = format.set_text_wrap();
    }

    if let Some(fill) = &style.fill
        && fill.pattern != FillPattern::None
    {
        format = format.set_pattern(fill_pattern(fill.pattern));
        if let Some(color) = &fill.color {
            let color = Color::RGB(parse_color(color, "fill.color")?);
            format = if fill.pattern == FillPattern::Solid {
                format.set_background_color(color)
            } else {
                format.set_foreground_color(color)
            };
        }
    }

    Ok(format)
}

fn horizontal_align(align: HorizontalAlign) -> FormatAlign {
    match align {
        HorizontalAlign::General => FormatAlign::General,
        HorizontalAlign::Left => FormatAlign::Left,
        HorizontalAlign::Center => FormatAlign::Center,
        HorizontalAlign::Right => FormatAlign::Right,
        HorizontalAlign::Fill => FormatAlign::Fill,
        HorizontalAlign::Justify => FormatAlign::Justify,
    }
}

fn vertical_align(align: VerticalAlign) -> FormatAlign {
    match align {
        VerticalAlign::Top => FormatAlign::Top,
        VerticalAlign::Middle => FormatAlign::VerticalCenter,
        VerticalAlign::Bottom => FormatAlign::Bottom,
    }
}

fn border_style(style: BorderStyle) -> FormatBorder {
    match style {
        BorderStyle::None => FormatBorder::None,
        BorderStyle::Thin => FormatBorder::Thin,
        BorderStyle::Medium => FormatBorder::Medium,
        BorderStyle::Thick => FormatBorder::Thick,
        BorderStyle::Dashed => FormatBorder::Dashed,
        BorderStyle::Dotted => FormatBorder::Dotted,
        BorderStyle::Double => FormatBorder::Double,
        BorderStyle::Hair => FormatBorder::Hair,
    }
}

fn fill_pattern(pattern: FillPattern) -> FormatPattern {
    match pattern {
        FillPattern::None => FormatPattern::None,
        FillPattern::Solid => FormatPattern::Solid,
        FillPattern::LightGray => FormatPattern::LightGray,
        FillPattern::MediumGray => FormatPattern::MediumGray,
        FillPattern::DarkGray => FormatPattern::DarkGray,
    }
}
