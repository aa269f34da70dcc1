use std::fmt;

use rust_decimal::Decimal;

use crate::format::format_report_value;

const RULE_WIDTH: usize = 70;

/// One rendered holding. All figures are already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub symbol: String,
    pub amount: String,
    /// Six-decimal price, or `N/A`.
    pub price: String,
    pub total: String,
}

/// Tabular valuation of a portfolio in one settlement currency.
///
/// `Display` renders the fixed-width table shown to users.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Uppercase currency code.
    pub currency: String,
    pub rows: Vec<ReportRow>,
    pub total: Decimal,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_display(&self) -> String {
        format_report_value(self.total)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return writeln!(f, "Portfolio is empty.");
        }

        let rule = "-".repeat(RULE_WIDTH);
        let cur = &self.currency;

        writeln!(f, "Portfolio Value Summary")?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:<10}{:<18}{:<18}{:<18}",
            "Symbol",
            "Amount",
            format!("Price ({cur})"),
            format!("Total ({cur})")
        )?;
        writeln!(f, "{rule}")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<10}{:<18}{:<18}{:<18}",
                row.symbol, row.amount, row.price, row.total
            )?;
        }
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:<40}{} {cur}",
            "TOTAL PORTFOLIO VALUE:",
            self.total_display()
        )?;
        writeln!(f, "{rule}")
    }
}
