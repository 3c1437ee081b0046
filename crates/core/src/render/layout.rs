use super::BillSnapshot;
use crate::billing::format_money;
use crate::constants::{BILL_DISCLAIMER, BILL_TITLE};
use chrono::{DateTime, Utc};

/// One unit of content inside a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Centred document title.
    Title(String),
    /// Left-aligned line.
    Text(String),
    /// Indented line inside a section.
    Entry(String),
    /// Indented free text, set smaller in the PDF.
    Note(String),
    /// Right-aligned, emphasised amount.
    Total(String),
    /// Centred small print.
    Footer(String),
}

impl Block {
    pub fn text(&self) -> &str {
        match self {
            Block::Title(s)
            | Block::Text(s)
            | Block::Entry(s)
            | Block::Note(s)
            | Block::Total(s)
            | Block::Footer(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: Option<String>,
    pub blocks: Vec<Block>,
}

impl Section {
    fn untitled(blocks: Vec<Block>) -> Self {
        Self {
            heading: None,
            blocks,
        }
    }

    fn titled(heading: &str, blocks: Vec<Block>) -> Self {
        Self {
            heading: Some(heading.to_string()),
            blocks,
        }
    }
}

/// Backend-neutral bill layout. Section order is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillDocument {
    pub title: String,
    pub sections: Vec<Section>,
}

impl BillDocument {
    /// Every string that ends up on the page, headings included.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str()).chain(self.sections.iter().flat_map(|s| {
            s.heading
                .as_deref()
                .into_iter()
                .chain(s.blocks.iter().map(Block::text))
        }))
    }
}

/// Lays out a bill: header, patient information, charges, codes, recommendations, total.
pub fn layout_bill(snapshot: &BillSnapshot<'_>, generated_at: DateTime<Utc>) -> BillDocument {
    let encounter = snapshot.encounter;
    let summary = snapshot.summary;

    let header = Section::untitled(vec![
        Block::Title(BILL_TITLE.to_string()),
        Block::Text(format!("Date: {}", generated_at.format("%Y-%m-%d"))),
        Block::Text(format!("Encounter: {}", encounter.id())),
    ]);

    let patient = Section::titled(
        "PATIENT INFORMATION",
        vec![
            Block::Entry(format!("Name: {}", encounter.patient_name())),
            Block::Entry(format!(
                "Gender: {}",
                or_placeholder(encounter.gender(), "Not provided")
            )),
            Block::Entry(format!(
                "Clinical Notes: {}",
                or_placeholder(encounter.clinical_notes(), "Not provided")
            )),
            Block::Entry(format!(
                "Current Medications: {}",
                or_placeholder(encounter.current_medications(), "None")
            )),
        ],
    );

    let mut charges: Vec<Block> = if snapshot.items.is_empty() {
        vec![Block::Entry("No medications listed".into())]
    } else {
        snapshot
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Block::Entry(format!(
                    "{}. {} - ${}",
                    i + 1,
                    single_line(item.name()),
                    format_money(item.cost())
                ))
            })
            .collect()
    };
    charges.push(Block::Entry(format!(
        "Consultation Fee: ${}",
        format_money(summary.consultation_fee)
    )));
    if summary.code_count > 0 {
        charges.push(Block::Entry(format!(
            "Medical Coding ({} codes): ${}",
            summary.code_count,
            format_money(summary.coding_fee)
        )));
    }

    let codes = if snapshot.codes.is_empty() {
        vec![Block::Entry("No ICD-10 codes provided".into())]
    } else {
        snapshot
            .codes
            .iter()
            .enumerate()
            .map(|(i, code)| Block::Entry(format!("{}. {}", i + 1, code)))
            .collect()
    };

    let notes: Vec<Block> = snapshot
        .ai_notes
        .into_iter()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Block::Note(line.to_string()))
        .collect();
    let notes = if notes.is_empty() {
        vec![Block::Entry("No recommendations provided".into())]
    } else {
        notes
    };

    BillDocument {
        title: BILL_TITLE.to_string(),
        sections: vec![
            header,
            patient,
            Section::titled("MEDICATIONS & CHARGES", charges),
            Section::titled("ICD-10 CODES", codes),
            Section::titled("AI RECOMMENDATIONS", notes),
            Section::untitled(vec![Block::Total(format!(
                "TOTAL AMOUNT: ${}",
                format_money(summary.grand_total)
            ))]),
            Section::untitled(vec![
                Block::Footer(BILL_DISCLAIMER.to_string()),
                Block::Footer(format!(
                    "Generated {}",
                    generated_at.format("%Y-%m-%d %H:%M UTC")
                )),
            ]),
        ],
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        single_line(value)
    }
}

fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Greedy word wrap. Words longer than `width` are split so no line exceeds it.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for chunk in chars.chunks(width) {
            let piece: String = chunk.iter().collect();
            let piece_len = chunk.len();
            if current_len == 0 {
                current = piece;
                current_len = piece_len;
            } else if current_len + 1 + piece_len <= width {
                current.push(' ');
                current.push_str(&piece);
                current_len += 1 + piece_len;
            } else {
                lines.push(std::mem::take(&mut current));
                current = piece;
                current_len = piece_len;
            }
        }
    }
    if current_len > 0 {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
