//! Outstanding-balance table generation.
//!
//! This module renders the monospace summary table, the summary field and
//! the top-debtors field from a list of balance records. Rendering is a
//! pure function of the input; nothing here touches the network.

use crate::models::{BalanceRecord, Embed, EmbedField, COLOR_ALERT};
use chrono::{DateTime, Utc};

/// Rows shown before the table collapses into an overflow line.
pub const MAX_TABLE_ROWS: usize = 25;

/// Number of top debtors called out separately.
pub const TOP_DEBTORS: usize = 3;

/// Width of the `=` separator lines.
const SEPARATOR_WIDTH: usize = 60;

const USERNAME_WIDTH: usize = 19;
const MAIN_CHARACTER_WIDTH: usize = 24;

/// Title of the corp summary embed.
pub const SUMMARY_TITLE: &str = "⚠️ Outstanding Mining Taxes Report";

/// Name the corp summary webhook posts as.
pub const SUMMARY_WEBHOOK_USERNAME: &str = "MiningTaxes Corp Summary";

/// A rendered corp summary, ready to be wrapped in an embed.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    /// Table wrapped in a code block.
    pub table: String,
    /// Value of the "Summary" field.
    pub summary: String,
    /// Value of the "Top Debtors" field, when there are enough debtors.
    pub top_debtors: Option<String>,
    /// Number of users with a positive balance.
    pub total_users: usize,
    /// Sum of all positive balances, in millions.
    pub total_outstanding: f64,
}

impl RenderedReport {
    /// Embed fields in display order.
    pub fn fields(&self) -> Vec<EmbedField> {
        let mut fields = vec![EmbedField {
            name: "📊 Summary".to_string(),
            value: self.summary.clone(),
            inline: false,
        }];

        if let Some(ref top) = self.top_debtors {
            fields.push(EmbedField {
                name: "🔥 Top Debtors".to_string(),
                value: top.clone(),
                inline: false,
            });
        }

        fields
    }

    /// Footer text shown under the summary.
    pub fn footer(&self) -> String {
        format!(
            "MiningTaxes Corp Summary • {} users with outstanding taxes",
            self.total_users
        )
    }

    /// Build the full rich message.
    pub fn to_embed(&self, timestamp: DateTime<Utc>) -> Embed {
        let embed = Embed::new(SUMMARY_TITLE)
            .with_description(self.table.clone())
            .with_color(COLOR_ALERT)
            .with_footer(self.footer())
            .with_timestamp(timestamp);

        self.fields().into_iter().fold(embed, Embed::with_field)
    }
}

/// Render the corp summary.
///
/// Returns `None` when no record has a positive balance. Records are sorted
/// by balance, highest first; equal balances keep their input order.
pub fn render_summary(balances: &[BalanceRecord], currency: &str) -> Option<RenderedReport> {
    let outstanding = outstanding_sorted(balances);
    if outstanding.is_empty() {
        return None;
    }

    let total_outstanding: f64 = outstanding.iter().map(|r| r.balance()).sum();
    let total_users = outstanding.len();

    let table = render_table(&outstanding, total_outstanding);

    let summary = format!(
        "**{}** users owe taxes\n**{} M {}** total outstanding",
        total_users,
        format_amount(total_outstanding),
        currency
    );

    let top_debtors = if total_users >= TOP_DEBTORS {
        Some(render_top_debtors(&outstanding, currency))
    } else {
        None
    };

    Some(RenderedReport {
        table,
        summary,
        top_debtors,
        total_users,
        total_outstanding,
    })
}

/// Records with a positive balance, highest balance first.
pub fn outstanding_sorted(balances: &[BalanceRecord]) -> Vec<&BalanceRecord> {
    let mut outstanding: Vec<&BalanceRecord> =
        balances.iter().filter(|r| r.is_outstanding()).collect();

    // sort_by is stable
    outstanding.sort_by(|a, b| b.balance().total_cmp(&a.balance()));
    outstanding
}

fn render_table(outstanding: &[&BalanceRecord], total: f64) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let mut table = String::from("```\n");

    table.push_str(&format!(
        "{:<20} {:<25} {:>15}\n",
        "User", "Main Character", "Balance"
    ));
    table.push_str(&separator);
    table.push('\n');

    for record in outstanding.iter().take(MAX_TABLE_ROWS) {
        let username = truncate_chars(record.display_username(), USERNAME_WIDTH);
        let main_character =
            truncate_chars(record.display_main_character(), MAIN_CHARACTER_WIDTH);

        table.push_str(&format!(
            "{:<20} {:<25} {:>13}M\n",
            username,
            main_character,
            format_amount(record.balance())
        ));
    }

    if outstanding.len() > MAX_TABLE_ROWS {
        table.push_str(&format!(
            "\n... and {} more users\n",
            outstanding.len() - MAX_TABLE_ROWS
        ));
    }

    table.push_str(&separator);
    table.push('\n');
    table.push_str(&format!("{:<45} {:>13}M\n", "TOTAL", format_amount(total)));
    table.push_str("```");

    table
}

fn render_top_debtors(outstanding: &[&BalanceRecord], currency: &str) -> String {
    outstanding
        .iter()
        .take(TOP_DEBTORS)
        .enumerate()
        .map(|(i, record)| {
            format!(
                "{}. **{}** - {}M {}",
                i + 1,
                record.display_username(),
                format_amount(record.balance()),
                currency
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format an amount with two decimals and comma thousands separators.
///
/// `1234567.891` becomes `"1,234,567.89"`.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if value < 0.0 {
        grouped.push('-');
    }

    let digits = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    grouped
}

/// Keep at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
