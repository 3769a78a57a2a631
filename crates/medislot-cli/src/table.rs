//! Aligned text table for visit listings.

use medislot_core::Visit;

const HEADERS: [&str; 4] = ["date", "specialty", "doctor", "clinic"];

/// Render visits as an aligned table with a header row and a dash rule.
pub fn render(visits: &[Visit]) -> String {
    let rows: Vec<[String; 4]> = visits
        .iter()
        .map(|v| {
            [
                v.date.format("%Y-%m-%d %H:%M").to_string(),
                v.specialty.clone(),
                v.doctor.clone(),
                v.clinic.clone(),
            ]
        })
        .collect();

    let mut widths: [usize; 4] = [0; 4];
    for (i, header) in HEADERS.iter().enumerate() {
        widths[i] = header.chars().count();
    }
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for (i, header) in HEADERS.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.push_str(header);
        out.extend(std::iter::repeat(' ').take(widths[i] - header.chars().count()));
    }
    out.push('\n');
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.extend(std::iter::repeat('-').take(*width));
    }
    for row in &rows {
        out.push('\n');
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            out.push_str(cell);
            if i < 3 {
                out.extend(std::iter::repeat(' ').take(widths[i] - cell.chars().count()));
            }
        }
    }
    out
}
