//! Scrubbing of captured compiler output.
//!
//! Output is processed line by line. Each line is handed to the first
//! [`NormalizeRule`] in [`RULES`] whose predicate accepts it; lines no rule
//! accepts are kept verbatim. Every rule covers one independent source of
//! non-determinism, so adding a new source means adding one row.

use std::borrow::Cow;

use tracing::debug;

/// Placeholder written where a wall-clock time of day was.
pub const FAKE_TIMESTAMP: &str = "HH:MM:SS AM";
/// Placeholder written where an elapsed duration was.
pub const FAKE_DURATION: &str = "d.ddds";
/// Placeholder written where the live tool version was.
pub const FAKE_VERSION: &str = "FakeTSVersion";

pub const BUILD_STARTING_AT: &str = "build starting at ";
pub const BUILD_FINISHED_IN: &str = "build finished in ";
/// `[` followed by the grey foreground escape used by pretty status lines.
pub const PRETTY_STATUS_PREFIX: &str = "[\u{1b}[90m";
/// Start of any terminal escape sequence.
pub const ESCAPE_START: &str = "\u{1b}[";
/// Marker of the emitted/listed file block.
pub const LIST_FILE_START: &str = "TSFILE:  ";

/// Whether output is being recorded into a baseline or compared between
/// two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizeMode {
    /// Keep volatile lines, with placeholders substituted.
    Record,
    /// Drop volatile lines that carry no stable information.
    Compare,
}

/// What a rule decided for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction<'a> {
    Emit(Cow<'a, str>),
    Drop,
    /// Drop this line and every following line through the next blank one.
    DropBlock,
}

/// One predicate/transform pair.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeRule {
    pub name: &'static str,
    pub matches: fn(&Normalizer, &str) -> bool,
    pub apply: for<'a> fn(&Normalizer, &'a str, NormalizeMode) -> LineAction<'a>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn owned<'a>(line: String) -> LineAction<'a> {
    LineAction::Emit(Cow::Owned(line))
}

fn version_matches(n: &Normalizer, line: &str) -> bool {
    !n.live_version.is_empty()
        && n.live_version != n.fake_version
        && line.contains(&n.live_marker())
}

fn version_apply<'a>(n: &Normalizer, line: &'a str, _mode: NormalizeMode) -> LineAction<'a> {
    let fake = format!("Version {}", n.fake_version);
    owned(line.replace(&n.live_marker(), &fake))
}

fn build_start_matches(_n: &Normalizer, line: &str) -> bool {
    line.starts_with(BUILD_STARTING_AT)
}

fn build_start_apply<'a>(_n: &Normalizer, _line: &'a str, mode: NormalizeMode) -> LineAction<'a> {
    match mode {
        NormalizeMode::Record => owned(format!("{BUILD_STARTING_AT}{FAKE_TIMESTAMP}")),
        NormalizeMode::Compare => LineAction::Drop,
    }
}

fn build_finish_matches(_n: &Normalizer, line: &str) -> bool {
    line.starts_with(BUILD_FINISHED_IN)
}

fn build_finish_apply<'a>(_n: &Normalizer, _line: &'a str, mode: NormalizeMode) -> LineAction<'a> {
    match mode {
        NormalizeMode::Record => owned(format!("{BUILD_FINISHED_IN}{FAKE_DURATION}")),
        NormalizeMode::Compare => LineAction::Drop,
    }
}

fn pretty_status_matches(_n: &Normalizer, line: &str) -> bool {
    line.starts_with(PRETTY_STATUS_PREFIX)
}

/// Byte offset where the text after the timestamp starts: the closing
/// escape, or past a placeholder-length run of characters when the line
/// has no further escape.
fn pretty_status_suffix_start(rest: &str) -> Option<usize> {
    if let Some(at) = rest.find(ESCAPE_START) {
        return Some(at);
    }
    rest.char_indices()
        .map(|(at, _)| at)
        .chain(std::iter::once(rest.len()))
        .nth(FAKE_TIMESTAMP.len())
}

fn pretty_status_apply<'a>(_n: &Normalizer, line: &'a str, mode: NormalizeMode) -> LineAction<'a> {
    let rest = &line[PRETTY_STATUS_PREFIX.len()..];
    match (pretty_status_suffix_start(rest), mode) {
        (Some(at), _) => {
            let suffix = &rest[at..];
            owned(format!("{PRETTY_STATUS_PREFIX}{FAKE_TIMESTAMP}{suffix}"))
        }
        (None, NormalizeMode::Record) => owned(format!("{PRETTY_STATUS_PREFIX}{FAKE_TIMESTAMP}")),
        (None, NormalizeMode::Compare) => LineAction::Drop,
    }
}

/// Fuzzy `hh:mm:ss AM - ...` detection: `" -"` right after a
/// placeholder-length prefix, and colons at offsets 2 and 5.
fn plain_timestamp_matches(_n: &Normalizer, line: &str) -> bool {
    line.find(" -") == Some(FAKE_TIMESTAMP.len())
        && line.find(':') == Some(2)
        && line.get(3..).and_then(|rest| rest.find(':')) == Some(2)
}

fn plain_timestamp_apply<'a>(
    _n: &Normalizer,
    line: &'a str,
    _mode: NormalizeMode,
) -> LineAction<'a> {
    let rest = &line[FAKE_TIMESTAMP.len()..];
    owned(format!("{FAKE_TIMESTAMP}{rest}"))
}

fn list_file_matches(_n: &Normalizer, line: &str) -> bool {
    line.starts_with(LIST_FILE_START)
}

fn list_file_apply<'a>(_n: &Normalizer, line: &'a str, mode: NormalizeMode) -> LineAction<'a> {
    match mode {
        NormalizeMode::Record => LineAction::Emit(Cow::Borrowed(line)),
        NormalizeMode::Compare => LineAction::DropBlock,
    }
}

/// Rule precedence, first match wins.
pub const RULES: [NormalizeRule; 6] = [
    NormalizeRule {
        name: "version",
        matches: version_matches,
        apply: version_apply,
    },
    NormalizeRule {
        name: "build_start",
        matches: build_start_matches,
        apply: build_start_apply,
    },
    NormalizeRule {
        name: "build_finish",
        matches: build_finish_matches,
        apply: build_finish_apply,
    },
    NormalizeRule {
        name: "pretty_status_timestamp",
        matches: pretty_status_matches,
        apply: pretty_status_apply,
    },
    NormalizeRule {
        name: "plain_timestamp",
        matches: plain_timestamp_matches,
        apply: plain_timestamp_apply,
    },
    NormalizeRule {
        name: "list_file_block",
        matches: list_file_matches,
        apply: list_file_apply,
    },
];

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Applies [`RULES`] to raw output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    live_version: String,
    fake_version: String,
}

impl Normalizer {
    pub fn new(live_version: impl Into<String>, fake_version: impl Into<String>) -> Self {
        Self {
            live_version: live_version.into(),
            fake_version: fake_version.into(),
        }
    }

    pub fn live_version(&self) -> &str {
        &self.live_version
    }

    fn live_marker(&self) -> String {
        format!("Version {}", self.live_version)
    }

    /// First rule accepting `line`, if any.
    pub fn matching_rule(&self, line: &str) -> Option<&'static NormalizeRule> {
        RULES.iter().find(|rule| (rule.matches)(self, line))
    }

    /// Normalize one line in isolation. Unmatched lines come back borrowed.
    pub fn normalize_line<'a>(&self, line: &'a str, mode: NormalizeMode) -> LineAction<'a> {
        match self.matching_rule(line) {
            Some(rule) => {
                debug!(rule = rule.name, ?mode, "output line normalized");
                (rule.apply)(self, line, mode)
            }
            None => LineAction::Emit(Cow::Borrowed(line)),
        }
    }

    /// Normalize a whole captured output stream.
    pub fn normalize(&self, raw: &str, mode: NormalizeMode) -> String {
        let lines: Vec<&str> = raw.split('\n').collect();
        let mut out: Vec<Cow<'_, str>> = Vec::with_capacity(lines.len());
        let mut i = 0;
        while i < lines.len() {
            match self.normalize_line(lines[i], mode) {
                LineAction::Emit(line) => out.push(line),
                LineAction::Drop => {}
                LineAction::DropBlock => {
                    let mut j = i + 1;
                    while j < lines.len() && !lines[j].is_empty() {
                        j += 1;
                    }
                    i = j;
                }
            }
            i += 1;
        }
        out.join("\n")
    }
}
