//! Equality between what a message shows and what a view would render.
//!
//! The remote side normalizes whitespace, so every text field is compared
//! trimmed and an absent value reads the same as an empty one. Controls are
//! compared by shape only: ids are regenerated on every render and labels are
//! covered by the rest of the content.

use std::fmt;

use vellum_content::{Embed, EmbedField, EmbedMedia, MessageContent};

/// First difference found between live and rendered content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    Body,
    RowCount { live: usize, rendered: usize },
    RowShape { row: usize },
    EmbedCount { live: usize, rendered: usize },
    EmbedField { embed: usize, field: &'static str },
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Drift::Body => f.write_str("text body differs"),
            Drift::RowCount { live, rendered } => {
                write!(f, "row count differs (live {live}, rendered {rendered})")
            }
            Drift::RowShape { row } => write!(f, "controls in row {row} differ"),
            Drift::EmbedCount { live, rendered } => {
                write!(f, "embed count differs (live {live}, rendered {rendered})")
            }
            Drift::EmbedField { embed, field } => write!(f, "embed {embed} differs in `{field}`"),
        }
    }
}

pub fn content_matches(live: &MessageContent, rendered: &MessageContent) -> bool {
    diff(live, rendered).is_none()
}

pub fn diff(live: &MessageContent, rendered: &MessageContent) -> Option<Drift> {
    if live.body() != rendered.body() {
        return Some(Drift::Body);
    }

    if live.components.len() != rendered.components.len() {
        return Some(Drift::RowCount {
            live: live.components.len(),
            rendered: rendered.components.len(),
        });
    }
    for (row, (a, b)) in live.components.iter().zip(&rendered.components).enumerate() {
        let a = a.components.iter().map(|component| component.kind());
        let b = b.components.iter().map(|component| component.kind());
        if !Iterator::eq(a, b) {
            return Some(Drift::RowShape { row });
        }
    }

    if live.embeds.len() != rendered.embeds.len() {
        return Some(Drift::EmbedCount {
            live: live.embeds.len(),
            rendered: rendered.embeds.len(),
        });
    }
    live.embeds
        .iter()
        .zip(&rendered.embeds)
        .enumerate()
        .find_map(|(embed, (a, b))| {
            embed_drift(a, b).map(|field| Drift::EmbedField { embed, field })
        })
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

fn embed_drift(a: &Embed, b: &Embed) -> Option<&'static str> {
    if text(&a.title) != text(&b.title) {
        return Some("title");
    }
    if text(&a.description) != text(&b.description) {
        return Some("description");
    }
    if text(&a.url) != text(&b.url) {
        return Some("url");
    }
    if a.color != b.color {
        return Some("color");
    }

    let author = |embed: &Embed| {
        embed.author.as_ref().map(|author| {
            (
                author.name.trim().to_string(),
                text(&author.url).to_string(),
                text(&author.icon_url).to_string(),
            )
        })
    };
    if author(a) != author(b) {
        return Some("author");
    }

    let footer = |embed: &Embed| {
        embed
            .footer
            .as_ref()
            .map(|footer| (footer.text.trim().to_string(), text(&footer.icon_url).to_string()))
    };
    if footer(a) != footer(b) {
        return Some("footer");
    }

    let media = |media: &Option<EmbedMedia>| {
        media.as_ref().map(|media| media.url.trim().to_string())
    };
    if media(&a.image) != media(&b.image) {
        return Some("image");
    }
    if media(&a.thumbnail) != media(&b.thumbnail) {
        return Some("thumbnail");
    }

    if a.fields.len() != b.fields.len() || !a.fields.iter().zip(&b.fields).all(|(x, y)| field_eq(x, y)) {
        return Some("fields");
    }
    None
}

fn field_eq(a: &EmbedField, b: &EmbedField) -> bool {
    a.name.trim() == b.name.trim() && a.value.trim() == b.value.trim() && a.inline == b.inline
}
