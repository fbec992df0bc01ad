//! The field table appended to ticket notifications.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use super::markup::{TextRenderer, plain_to_html};
use crate::types::{Change, Field, Ticket};

/// Renders the comment of `change` (when `include_comment`) followed by a
/// table of its field edits.
///
/// Fields in `excluded` are dropped. Title, responsible and milestone are
/// always shown for context, taken from `ticket` when the change does not
/// carry them. Rows follow [`Field`] order and rows with an empty value are
/// skipped; with no rows the table is omitted.
pub fn render_fields(
    ticket: &Ticket,
    change: &Change,
    excluded: &BTreeSet<Field>,
    include_comment: bool,
    renderer: &dyn TextRenderer,
) -> String {
    let mut out = String::new();

    if include_comment
        && change.has_comment()
        && let Some(comment) = &change.comment
    {
        out.push_str("<br/>");
        out.push_str(&renderer.markdown(&comment.text, &ticket.repository));
    }

    let mut fields: BTreeMap<Field, &str> = change
        .fields
        .iter()
        .filter(|(field, _)| !excluded.contains(field))
        .map(|(field, value)| (*field, value.as_str()))
        .collect();

    fields.entry(Field::Title).or_insert(&ticket.title);
    if let Some(responsible) = ticket.responsible.as_deref().filter(|r| !r.is_empty()) {
        fields.entry(Field::Responsible).or_insert(responsible);
    }
    if let Some(milestone) = ticket.milestone.as_deref().filter(|m| !m.is_empty()) {
        fields.entry(Field::Milestone).or_insert(milestone);
    }

    let rows: Vec<(Field, String)> = fields
        .into_iter()
        .map(|(field, value)| (field, render_value(field, value, &ticket.repository, renderer)))
        .filter(|(_, value)| !value.is_empty())
        .collect();

    if rows.is_empty() {
        return out;
    }

    out.push_str("\n<table><tbody>\n");
    for (field, value) in rows {
        let _ = writeln!(out, "<tr><td><b>{}:</b></td><td>{}</td></tr>", field, value);
    }
    out.push_str("</tbody></table>");
    out
}

fn render_value(field: Field, value: &str, repository: &str, renderer: &dyn TextRenderer) -> String {
    match field {
        Field::Body => renderer.markdown(value, repository),
        Field::Topic => renderer.link_references(&plain_to_html(value), repository),
        _ => plain_to_html(value),
    }
}
