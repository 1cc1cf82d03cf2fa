use crate::{Scalar, TableResult, escape_html};

use egui::{TextStyle, Ui};
use egui_extras::{Column, TableBuilder, TableRow};

/// A query result turned into display cells: one header row and N body rows.
///
/// Built once from a [`TableResult`] and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedTable {
    header: Vec<String>,
    body: Vec<Vec<String>>,
}

impl RenderedTable {
    /// Converts a result into cells.
    ///
    /// The header is the column list, in order. Each body row has one cell per
    /// column: empty for null (or for a value the row does not carry), otherwise
    /// the value's canonical string. Rows keep their order.
    pub fn from_result(result: &TableResult) -> Self {
        let header = result.columns().to_vec();
        let body = result
            .rows()
            .iter()
            .map(|row| {
                header
                    .iter()
                    .map(|column| row.get(column).map(Scalar::to_string).unwrap_or_default())
                    .collect()
            })
            .collect();

        RenderedTable { header, body }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn body(&self) -> &[Vec<String>] {
        &self.body
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn height(&self) -> usize {
        self.body.len()
    }

    /// Serializes the table as an HTML `<table>` element.
    pub fn to_html(&self) -> String {
        let header_cells = self
            .header
            .iter()
            .map(|column| format!("<th>{}</th>", escape_html(column)))
            .collect::<Vec<_>>()
            .join("\n");

        let mut html = format!("<table>\n<thead><tr>{header_cells}</tr></thead>\n<tbody>\n");
        for row in &self.body {
            let cells = row
                .iter()
                .map(|cell| format!("<td>{}</td>", escape_html(cell)))
                .collect::<Vec<_>>()
                .join("\n");
            html.push_str(&format!("<tr>{cells}</tr>\n"));
        }
        html.push_str("</tbody>\n</table>\n");
        html
    }

    /// Renders the table with `egui_extras::TableBuilder`.
    pub fn render(&self, ui: &mut Ui) {
        let analyze_header = |mut table_row: TableRow<'_, '_>| {
            for column_name in &self.header {
                table_row.col(|ui| {
                    ui.strong(column_name.as_str());
                });
            }
        };

        let analyze_rows = |mut table_row: TableRow<'_, '_>| {
            let row_index = table_row.index();
            if let Some(row) = self.body.get(row_index) {
                for cell in row {
                    table_row.col(|ui| {
                        ui.label(cell.as_str());
                    });
                }
            }
        };

        let style = ui.style();
        let text_height = TextStyle::Body.resolve(style).size;
        let col_number = self.width().max(1) as f32;
        let available_space = ui.available_width()
            - col_number * style.spacing.item_spacing.x
            - style.spacing.scroll.bar_width;

        // Initial and minimal column widths, calculated based on available space and number of columns.
        let initial_col_width = available_space / col_number;
        let header_height = style.spacing.interact_size.y + 2.0 * style.spacing.item_spacing.y;
        let min_col_width = style.spacing.interact_size.x.max(initial_col_width / 4.0);

        let column = Column::initial(initial_col_width)
            .at_least(min_col_width)
            .resizable(true)
            .clip(true);

        TableBuilder::new(ui)
            .striped(true)
            .columns(column, self.width())
            .column(Column::remainder())
            .auto_shrink([false, false])
            .header(header_height, analyze_header)
            .body(|body| {
                body.rows(text_height, self.height(), analyze_rows);
            });
    }
}
