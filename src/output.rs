use libpantry::ledger::LedgerRow;

const LEDGER_HEADERS: [&str; 7] = [
    "Date",
    "Category",
    "Product",
    "Count Method",
    "Distributed",
    "Left",
    "Total",
];

fn ledger_cells(row: &LedgerRow) -> [String; 7] {
    [
        row.date.to_string(),
        row.category.to_string(),
        row.product.clone(),
        row.count_method
            .map(|method| method.to_string())
            .unwrap_or_default(),
        row.distributed.to_string(),
        row.remaining.to_string(),
        row.total_distributed.to_string(),
    ]
}

/// Print ledger rows as a left-aligned table.
pub fn print_rows(rows: &[LedgerRow]) {
    if rows.is_empty() {
        println!("No rows.");
        return;
    }

    let cells: Vec<[String; 7]> = rows.iter().map(ledger_cells).collect();
    let mut widths = LEDGER_HEADERS.map(str::len);
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    println!("{}", pad(LEDGER_HEADERS.iter().copied(), &widths));
    for line in &cells {
        println!("{}", pad(line.iter().map(String::as_str), &widths));
    }
}

pub fn print_list(items: &[String]) {
    for item in items {
        println!("{}", item);
    }
}

fn pad<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
