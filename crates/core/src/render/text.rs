use super::layout::wrap_text;
use super::{BillDocument, Block, DocumentBackend, DocumentFormat, RenderResult};
use rust_decimal::Decimal;
use std::str::FromStr;

const TOTAL_PREFIX: &str = "TOTAL AMOUNT: $";
const ENTRY_INDENT: usize = 2;
const NOTE_INDENT: usize = 4;
const WIDTH: usize = 80;

/// Flat UTF-8 text, wrapped to 80 columns.
#[derive(Debug, Clone, Default)]
pub struct TextBackend;

impl DocumentBackend for TextBackend {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Text
    }

    fn render(&self, document: &BillDocument) -> RenderResult<Vec<u8>> {
        let width = WIDTH;
        let mut out: Vec<String> = Vec::new();

        for (i, section) in document.sections.iter().enumerate() {
            if i > 0 {
                out.push(String::new());
            }
            if let Some(heading) = &section.heading {
                out.push(heading.clone());
                out.push("-".repeat(heading.chars().count().min(width)));
            }
            for block in &section.blocks {
                match block {
                    Block::Title(s) => {
                        out.extend(wrap_text(s, width).iter().map(|l| center(l, width)));
                        out.push("=".repeat(width));
                    }
                    Block::Text(s) => out.extend(wrap_text(s, width)),
                    Block::Entry(s) => out.extend(indented(s, ENTRY_INDENT, width)),
                    Block::Note(s) => out.extend(indented(s, NOTE_INDENT, width)),
                    Block::Total(s) => {
                        out.push("=".repeat(width));
                        out.push(format!("{:>width$}", s, width = width));
                    }
                    Block::Footer(s) => {
                        out.extend(wrap_text(s, width).iter().map(|l| center(l, width)))
                    }
                }
            }
        }

        let mut text = out
            .iter()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n");
        text.push('\n');
        Ok(text.into_bytes())
    }
}

fn indented(text: &str, indent: usize, width: usize) -> Vec<String> {
    let pad = " ".repeat(indent);
    wrap_text(text, width.saturating_sub(indent))
        .into_iter()
        .map(|l| format!("{pad}{l}"))
        .collect()
}

fn center(line: &str, width: usize) -> String {
    let len = line.chars().count();
    let left = width.saturating_sub(len) / 2;
    format!("{}{}", " ".repeat(left), line)
}

/// Reads the grand total back from a rendered text bill.
pub fn parse_total(text: &str) -> Option<Decimal> {
    text.lines().find_map(|line| {
        let amount = line.trim().strip_prefix(TOTAL_PREFIX)?;
        Decimal::from_str(amount.trim()).ok()
    })
}
