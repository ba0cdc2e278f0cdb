//! The sectioned keyword/filter document shared with the report pipeline.

use super::ExpandedKeywords;

/// Section marker for global exclusion terms.
pub const GLOBAL_FILTER_SECTION: &str = "[GLOBAL_FILTER]";

/// Section marker for keyword groups.
pub const WORD_GROUPS_SECTION: &str = "[WORD_GROUPS]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    GlobalFilter,
    WordGroups,
    Other,
}

/// Parsed filter document.
///
/// The document starts with an optional header of blank and `#` comment
/// lines, followed by a global exclusion section and a word-group section
/// whose groups are separated by blank lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDocument {
    header: Vec<String>,
    global_filters: Vec<String>,
    word_groups: Vec<Vec<String>>,
}

impl FilterDocument {
    /// Parses document text. Unknown sections are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let header = header_lines(text);
        let mut global_filters = Vec::new();
        let mut word_groups: Vec<Vec<String>> = Vec::new();
        let mut current_group: Vec<String> = Vec::new();
        let mut section = None;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                flush_group(&mut word_groups, &mut current_group);
                section = Some(match trimmed {
                    GLOBAL_FILTER_SECTION => Section::GlobalFilter,
                    WORD_GROUPS_SECTION => Section::WordGroups,
                    _ => Section::Other,
                });
                continue;
            }
            match section {
                Some(Section::GlobalFilter) if !trimmed.is_empty() => {
                    global_filters.push(trimmed.to_owned());
                }
                Some(Section::WordGroups) if trimmed.is_empty() => {
                    flush_group(&mut word_groups, &mut current_group);
                }
                Some(Section::WordGroups) => current_group.push(trimmed.to_owned()),
                _ => {}
            }
        }
        flush_group(&mut word_groups, &mut current_group);

        Self {
            header,
            global_filters,
            word_groups,
        }
    }

    /// Builds the document for one run, keeping the header of `existing`.
    #[must_use]
    pub fn for_run(existing: Option<&str>, expanded: &ExpandedKeywords, filters: &[String]) -> Self {
        Self {
            header: existing.map(header_lines).unwrap_or_default(),
            global_filters: filters.to_vec(),
            word_groups: expanded
                .word_group_lines()
                .into_iter()
                .map(|line| vec![line])
                .collect(),
        }
    }

    /// Returns the preserved header lines.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Returns the global exclusion terms.
    #[must_use]
    pub fn global_filters(&self) -> &[String] {
        &self.global_filters
    }

    /// Returns the keyword groups.
    #[must_use]
    pub fn word_groups(&self) -> &[Vec<String>] {
        &self.word_groups
    }

    /// Renders the document as text ending in a newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines: Vec<&str> = self.header.iter().map(String::as_str).collect();
        if lines.last().is_some_and(|line| !line.trim().is_empty()) {
            lines.push("");
        }
        lines.push(GLOBAL_FILTER_SECTION);
        lines.extend(self.global_filters.iter().map(String::as_str));
        lines.push("");
        lines.push(WORD_GROUPS_SECTION);
        for group in &self.word_groups {
            lines.extend(group.iter().map(String::as_str));
            lines.push("");
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

fn header_lines(text: &str) -> Vec<String> {
    text.lines()
        .take_while(|line| {
            let trimmed = line.trim_start();
            !trimmed.starts_with('[') && (trimmed.is_empty() || trimmed.starts_with('#'))
        })
        .map(str::to_owned)
        .collect()
}

fn flush_group(groups: &mut Vec<Vec<String>>, current: &mut Vec<String>) {
    if !current.is_empty() {
        groups.push(std::mem::take(current));
    }
}
