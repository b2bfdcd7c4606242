//! Castaway-table parser for wikitext.
//!
//! Parsing is split into three independent stages so that boundary finding
//! never leaks into classification:
//!
//! 1. [`section_bounds`] cuts the "Castaways" section out of the page,
//! 2. [`split_rows`] breaks it into `|-` delimited row blocks,
//! 3. [`extract_name`] / [`extract_template_payload`] pull the fields out of a
//!    single block, and [`clean_markup`] flattens the finish payload to text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::finish::{self, Day};
use crate::roster::{AliasTable, MemberKey};

/// Per-source grammar knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableGrammar {
    /// Heading text that introduces the castaway table.
    pub section_heading: String,
    /// Inline templates whose first argument carries the finish text.
    pub finish_templates: Vec<String>,
}

impl Default for TableGrammar {
    fn default() -> Self {
        Self {
            section_heading: "Castaways".to_owned(),
            finish_templates: vec!["nowrap".to_owned()],
        }
    }
}

/// The page has no section with the expected heading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no \"{heading}\" section in page")]
pub struct SectionMissing {
    pub heading: String,
}

/// One castaway row, keyed by canonical member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    pub member: MemberKey,
    /// Cleaned finish text; empty when the row carries no finish template.
    pub finish: String,
    pub day: Day,
}

/// A `[[Target|Label]]` wikilink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub target: String,
    pub label: Option<String>,
}

impl WikiLink {
    /// Text shown on the page.
    pub fn display(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.target)
    }
}

static BOLD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'''\s*\[\[([^\[\]|]+)(?:\|([^\[\]]+))?\]\]\s*'''").expect("valid bold link regex")
});

static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<ref[^>]*/>|<ref[^>]*>.*?</ref>").expect("valid ref regex")
});

static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid break regex"));

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static INNER_TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("valid template regex"));

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[(?:[^\[\]|]*\|)?([^\[\]]*)\]\]").expect("valid link regex")
});

/// Parse the castaway table into row records.
///
/// Rows whose name cannot be resolved are dropped with a warning. If a member
/// appears in more than one row, the first row wins.
pub fn parse(
    markup: &str,
    grammar: &TableGrammar,
    aliases: &AliasTable,
) -> Result<Vec<RowRecord>, SectionMissing> {
    let section =
        section_bounds(markup, &grammar.section_heading).ok_or_else(|| SectionMissing {
            heading: grammar.section_heading.clone(),
        })?;
    trace!(bytes = section.len(), "castaway section located");

    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for block in split_rows(section) {
        let Some(link) = extract_name(block) else {
            continue;
        };

        let resolved = aliases.resolve(link.display()).or_else(|| {
            link.label
                .is_some()
                .then(|| aliases.resolve(&link.target))
                .flatten()
        });
        let Some(member) = resolved else {
            warn!(name = link.display(), "Unresolved castaway name, dropping row");
            continue;
        };

        if !seen.insert(member.clone()) {
            debug!(member = %member, "Duplicate castaway row, keeping the first");
            continue;
        }

        let finish = extract_template_payload(block, &grammar.finish_templates)
            .map(clean_markup)
            .unwrap_or_default();
        let day = finish::extract_day(&finish);

        debug!(member = %member, finish = finish.as_str(), %day, "Parsed castaway row");
        rows.push(RowRecord {
            member,
            finish,
            day,
        });
    }

    Ok(rows)
}

/// Heading level and title of a `== Title ==` line.
fn heading(line: &str) -> Option<(usize, &str)> {
    let line = line.trim();
    let leading = line.bytes().take_while(|&b| b == b'=').count();
    let trailing = line.bytes().rev().take_while(|&b| b == b'=').count();
    if leading == 0 || trailing == 0 || leading + trailing >= line.len() {
        return None;
    }

    let level = leading.min(trailing);
    let title = line[level..line.len() - level].trim_matches('=').trim();
    Some((level, title))
}

/// Slice of `markup` belonging to the section titled `title`.
///
/// The section ends at the next heading of the same or a higher level, or at
/// the end of the text. Subheadings stay inside.
pub fn section_bounds<'a>(markup: &'a str, title: &str) -> Option<&'a str> {
    let mut offset = 0;
    let mut start: Option<(usize, usize)> = None;

    for line in markup.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let Some((level, heading_title)) = heading(line) else {
            continue;
        };

        match start {
            None if heading_title.eq_ignore_ascii_case(title.trim()) => {
                start = Some((offset, level));
            }
            Some((body_start, section_level)) if level <= section_level => {
                return Some(&markup[body_start..line_start]);
            }
            _ => {}
        }
    }

    start.map(|(body_start, _)| &markup[body_start..])
}

/// Split a section into row blocks on `|-` separator lines.
///
/// Text before the first separator (the table header) is returned as the
/// first block; callers skip blocks without a member name anyway.
pub fn split_rows(section: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut offset = 0;
    let mut block_start = 0;

    for line in section.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        if line.trim_start().starts_with("|-") {
            if line_start > block_start {
                blocks.push(&section[block_start..line_start]);
            }
            block_start = offset;
        }
    }

    if block_start < section.len() {
        blocks.push(&section[block_start..]);
    }

    blocks
}

/// First bold wikilink in a row block, entities decoded.
pub fn extract_name(block: &str) -> Option<WikiLink> {
    let caps = BOLD_LINK_RE.captures(block)?;
    let target = decode_entities(caps[1].trim());
    let label = caps
        .get(2)
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|label| !label.is_empty());

    Some(WikiLink { target, label })
}

/// Raw payload of the first invocation of any of `templates` in `block`.
///
/// Braces are balanced, so `{{nowrap|Voted Out {{small|Day 3}}}}` yields
/// `Voted Out {{small|Day 3}}`. Unterminated invocations are ignored.
pub fn extract_template_payload<'a>(block: &'a str, templates: &[String]) -> Option<&'a str> {
    let mut search_from = 0;

    while let Some(rel) = block[search_from..].find("{{") {
        let open = search_from + rel;
        let name_start = open + 2;
        search_from = name_start;

        let rest = &block[name_start..];
        let Some(pipe) = rest.find('|') else {
            return None;
        };
        let name = &rest[..pipe];
        if name.contains("{{") || name.contains("}}") {
            continue;
        }
        if !templates
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(name.trim()))
        {
            continue;
        }

        let payload_start = name_start + pipe + 1;
        if let Some(end) = matching_close(&block[payload_start..]) {
            return Some(&block[payload_start..payload_start + end]);
        }
    }

    None
}

/// Byte offset of the `}}` closing a template whose body starts at `s[0]`.
fn matching_close(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;

    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'{', b'{') => {
                depth += 1;
                i += 2;
            }
            (b'}', b'}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
                i += 2;
            }
            _ => i += 1,
        }
    }

    None
}

/// Flatten a finish payload to plain text.
pub fn clean_markup(raw: &str) -> String {
    let text = REF_RE.replace_all(raw, " ");
    let text = BREAK_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, "");
    // Links first so a piped link inside a template stays whole
    let mut text = LINK_RE.replace_all(&text, "$1").into_owned();

    // Innermost templates first, until none remain
    while INNER_TEMPLATE_RE.is_match(&text) {
        text = INNER_TEMPLATE_RE
            .replace_all(&text, |caps: &regex::Captures<'_>| {
                template_text(&caps[1]).to_owned()
            })
            .into_owned();
    }

    let text = text.replace("'''", "").replace("''", "");
    let text = decode_entities(&text);

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of a template body: its last positional argument.
fn template_text(body: &str) -> &str {
    let mut parts = body.split('|');
    parts.next();
    match parts.next_back() {
        Some(last) => last.split_once('=').map_or(last, |(_, value)| value),
        None => "",
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    htmlize::unescape(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "\
'''Survivor 50''' is the fiftieth season.

== Production ==
Filming took place in Fiji.

== Castaways ==
{| class=\"wikitable\"
! Castaway !! Original tribe !! Finish
|-
| '''[[Jenna Lewis-Dougherty|Jenna Lewis]]'''<br><small>47, Franklin, Tennessee</small>
| Vatu
| {{nowrap|1st Voted Out<br />Day 3}}
|-
| '''[[Rick Devens]]'''
| Cila
| {{nowrap|9th Voted Out<br />2nd Jury Member<br />Day 20}}
|-
| '''[[Aubry Bracco]]'''
| Kalo
|
|-
| '''[[Boston Rob]]'''
| Kalo
| {{nowrap|2nd Voted Out Day 5}}
|}

=== Notes ===
A subsection that still belongs to the castaways.

== Season summary ==
'''[[Q Burdette]]''' {{nowrap|3rd Voted Out Day 8}}
";

    fn aliases() -> AliasTable {
        AliasTable::new([
            ("Jenna Lewis", "Jenna"),
            ("Rick Devens", "Devens"),
            ("Aubry Bracco", "Aubrey"),
            ("Q Burdette", "Q"),
        ])
    }

    #[test]
    fn heading_levels() {
        assert_eq!(heading("== Castaways =="), Some((2, "Castaways")));
        assert_eq!(heading("===Notes==="), Some((3, "Notes")));
        assert_eq!(heading("= Top ="), Some((1, "Top")));
        assert_eq!(heading("==="), None);
        assert_eq!(heading("a == b"), None);
        assert_eq!(heading("|-"), None);
    }

    #[test]
    fn section_is_bounded_by_next_same_level_heading() {
        let section = section_bounds(PAGE, "Castaways").unwrap();
        assert!(section.contains("Rick Devens"));
        assert!(section.contains("=== Notes ==="));
        assert!(!section.contains("Season summary"));
        assert!(!section.contains("Q Burdette"));
    }

    #[test]
    fn section_heading_is_case_insensitive() {
        assert!(section_bounds(PAGE, "castaways").is_some());
        assert!(section_bounds(PAGE, "Contestants").is_none());
    }

    #[test]
    fn section_runs_to_end_of_text() {
        let section = section_bounds("intro\n==Castaways==\nrow one\nrow two", "Castaways").unwrap();
        assert_eq!(section, "row one\nrow two");
    }

    #[test]
    fn rows_split_on_separator() {
        let blocks = split_rows("header\n|-\nfirst\n|-\nsecond\nmore\n");
        assert_eq!(blocks, vec!["header\n", "first\n", "second\nmore\n"]);
    }

    #[test]
    fn name_prefers_label() {
        let link = extract_name("| '''[[Jenna Lewis-Dougherty|Jenna Lewis]]'''").unwrap();
        assert_eq!(link.target, "Jenna Lewis-Dougherty");
        assert_eq!(link.display(), "Jenna Lewis");
    }

    #[test]
    fn name_decodes_entities() {
        let link = extract_name("'''[[Stephenie LaGrossa Kendrick|Stephenie&#32;LaGrossa]]'''").unwrap();
        assert_eq!(link.display(), "Stephenie LaGrossa");
    }

    #[test]
    fn plain_links_are_not_names() {
        assert_eq!(extract_name("| [[Vatu]] tribe"), None);
        assert_eq!(extract_name("| '''Bold only'''"), None);
    }

    #[test]
    fn template_payload_with_nested_templates() {
        let templates = vec!["nowrap".to_owned()];
        assert_eq!(
            extract_template_payload("| {{nowrap|Voted Out {{small|Day 3}}}} |", &templates),
            Some("Voted Out {{small|Day 3}}")
        );
        assert_eq!(
            extract_template_payload("{{Color|red}} {{ Nowrap |Quit}}", &templates),
            Some("Quit")
        );
        assert_eq!(extract_template_payload("{{nowrap|unterminated", &templates), None);
        assert_eq!(extract_template_payload("no templates", &templates), None);
    }

    #[test]
    fn clean_strips_markup() {
        assert_eq!(
            clean_markup("9th Voted Out<br />2nd [[Jury]] Member<BR>Day&nbsp;20"),
            "9th Voted Out 2nd Jury Member Day 20"
        );
        assert_eq!(
            clean_markup("'''Sole Survivor'''<ref name=\"x\">citation</ref> {{small|Day 26}}"),
            "Sole Survivor Day 26"
        );
        assert_eq!(
            clean_markup("[[Medical evacuation|Medically Evacuated]] {{tooltip|text=Day 7}}"),
            "Medically Evacuated Day 7"
        );
        assert_eq!(clean_markup("{{dagger}} Quit"), "Quit");
    }

    #[test]
    fn clean_keeps_piped_links_inside_templates() {
        assert_eq!(
            clean_markup("8th Voted Out<br />{{small|[[Jury|1st Jury Member]]}}<br />Day 19"),
            "8th Voted Out 1st Jury Member Day 19"
        );
        assert_eq!(
            clean_markup("{{nowrap|{{small|[[Final Tribal Council|Runner-Up]]}}}} Day 26"),
            "Runner-Up Day 26"
        );
    }

    #[test]
    fn parses_rows_and_drops_unresolved() {
        let rows = parse(PAGE, &TableGrammar::default(), &aliases()).unwrap();
        let members: Vec<_> = rows.iter().map(|r| r.member.as_str()).collect();
        assert_eq!(members, vec!["Jenna", "Devens", "Aubrey"]);

        assert_eq!(rows[0].finish, "1st Voted Out Day 3");
        assert_eq!(rows[0].day, Day::Known(3));
        assert_eq!(rows[1].finish, "9th Voted Out 2nd Jury Member Day 20");
        assert_eq!(rows[1].day, Day::Known(20));
        assert_eq!(rows[2].finish, "");
        assert_eq!(rows[2].day, Day::Unknown);
    }

    #[test]
    fn label_falls_back_to_link_target() {
        let markup = "== Castaways ==\n|-\n| '''[[Rick Devens|Devens!]]''' {{nowrap|Quit Day 2}}\n";
        let rows = parse(markup, &TableGrammar::default(), &aliases()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].member.as_str(), "Devens");
    }

    #[test]
    fn duplicate_members_keep_first_row() {
        let markup = "\
== Castaways ==
|-
| '''[[Q Burdette]]''' {{nowrap|4th Voted Out Day 11}}
|-
| '''[[Q Burdette|Q]]''' {{nowrap|Sole Survivor}}
";
        let rows = parse(markup, &TableGrammar::default(), &aliases()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].finish, "4th Voted Out Day 11");
    }

    #[test]
    fn missing_section() {
        let err = parse("== Production ==\nnothing", &TableGrammar::default(), &aliases())
            .unwrap_err();
        assert_eq!(err.heading, "Castaways");
    }

    #[test]
    fn custom_grammar() {
        let grammar = TableGrammar {
            section_heading: "Contestants".to_owned(),
            finish_templates: vec!["sort".to_owned()],
        };
        let markup = "==Contestants==\n|-\n| '''[[Q Burdette]]''' || {{sort|Eliminated Day 12}}\n";
        let rows = parse(markup, &grammar, &aliases()).unwrap();
        assert_eq!(rows[0].finish, "Eliminated Day 12");
    }
}
