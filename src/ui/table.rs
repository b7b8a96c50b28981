use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Count")]
    pub value: String,
}

/// Two-column summary table for analysis and database counts.
#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_renders_nothing() {
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_rows_render_in_order() {
        let mut table = TableBuilder::new();
        table.add_row("Files", "3");
        table.add_row("Unresolved names", "0");
        let out = table.build();
        assert!(out.contains("Metric"));
        let files = out.find("Files").unwrap();
        let unresolved = out.find("Unresolved names").unwrap();
        assert!(files < unresolved);
    }
}
