//! Plan and todo document grammar.
//!
//! Two markdown artefacts pass between Llemy and the external planner:
//!
//! - The **plan document** is rendered from an [`IssueRecord`] and handed to
//!   the planner. [`PlanDocument::parse`] reads it back.
//! - The **todo document** is produced by the planner and parsed into a
//!   [`TodoTicket`] by [`parse_todo_document`].
//!
//! ## Todo grammar
//!
//! | Field | Capture | Fallback |
//! |-------|---------|----------|
//! | title | `TITLE: <text>` line | caller-supplied fallback title |
//! | labels | `LABELS: a, b` line, blanks dropped | none |
//! | body | `BODY:` then a ```` ``` ```` or ```` ```md ```` fenced block | the whole text, trimmed |
//!
//! The required label is prepended when missing. A ticket without a title or
//! body after fallback is rejected.

use std::sync::LazyLock;

use regex::Regex;

use crate::{IssueNumber, IssueRecord, LabelName, LlemyError, RepositoryId, TodoTicket};

static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^TITLE:\s*(?P<title>.+)$").expect("valid TITLE pattern"));

static LABELS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^LABELS:\s*(?P<labels>.+)$").expect("valid LABELS pattern")
});

static BODY_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^BODY:\s*```(?:md)?\r?\n(?P<body>[\s\S]*?)\r?\n```")
        .expect("valid BODY pattern")
});

const UNTITLED: &str = "_Untitled_";
const NO_BODY: &str = "_No issue body_";

// ---------------------------------------------------------------------------
// Todo documents
// ---------------------------------------------------------------------------

/// Extracts a [`TodoTicket`] from todo document `text`.
///
/// # Errors
///
/// [`LlemyError::Validation`] when neither a `TITLE:` line nor
/// `fallback_title` yields a title, or when no body text can be derived.
pub fn parse_todo_document(
    text: &str,
    fallback_title: &str,
    required_label: &LabelName,
) -> Result<TodoTicket, LlemyError> {
    let title = TITLE_LINE
        .captures(text)
        .map(|c| c["title"].trim().to_string())
        .unwrap_or_else(|| fallback_title.trim().to_string());

    let mut labels: Vec<LabelName> = LABELS_LINE
        .captures(text)
        .map(|c| c["labels"].split(',').filter_map(LabelName::new).collect())
        .unwrap_or_default();

    let body = BODY_BLOCK
        .captures(text)
        .map(|c| c["body"].trim().to_string())
        .unwrap_or_else(|| text.trim().to_string());

    if !labels.contains(required_label) {
        labels.insert(0, required_label.clone());
    }

    if title.is_empty() {
        return Err(LlemyError::Validation {
            message: "Missing TITLE".to_string(),
        });
    }
    if body.is_empty() {
        return Err(LlemyError::Validation {
            message: "Missing BODY".to_string(),
        });
    }

    Ok(TodoTicket {
        title,
        labels,
        body,
    })
}

/// Renders `ticket` back into todo document form.
///
/// Parsing the output with the same required label yields `ticket` again.
pub fn render_todo_document(ticket: &TodoTicket) -> String {
    let labels: Vec<&str> = ticket.labels.iter().map(LabelName::as_str).collect();
    format!(
        "TITLE: {}\nLABELS: {}\nBODY:\n```md\n{}\n```\n",
        ticket.title,
        labels.join(", "),
        ticket.body
    )
}

// ---------------------------------------------------------------------------
// Plan documents
// ---------------------------------------------------------------------------

/// Renders the plan document for `issue`.
///
/// Blank titles and bodies are replaced by `_Untitled_` and `_No issue body_`.
pub fn render_plan_document(issue: &IssueRecord) -> String {
    let title = if issue.title.trim().is_empty() {
        UNTITLED
    } else {
        issue.title.as_str()
    };
    let body = if issue.body_text().trim().is_empty() {
        NO_BODY
    } else {
        issue.body_text()
    };

    let repo_line = format!("- Repo: {}", issue.repository);
    let number_line = format!("- Number: {}", issue.number);
    let url_line = format!("- URL: {}", issue.url);

    [
        "# Source Issue",
        "",
        repo_line.as_str(),
        number_line.as_str(),
        url_line.as_str(),
        "",
        "## Title",
        "",
        title,
        "",
        "## Body",
        "",
        body,
        "",
    ]
    .join("\n")
}

/// Source issue fields recovered from a plan document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDocument {
    /// Source repository.
    pub repository: RepositoryId,
    /// Source issue number.
    pub number: IssueNumber,
    /// Source issue URL.
    pub url: String,
    /// Source issue title (empty when the placeholder was rendered).
    pub title: String,
    /// Source issue body (empty when the placeholder was rendered).
    pub body: String,
}

impl PlanDocument {
    /// Parses a document produced by [`render_plan_document`].
    ///
    /// # Errors
    ///
    /// [`LlemyError::Validation`] when a header line or section is missing.
    pub fn parse(text: &str) -> Result<Self, LlemyError> {
        let missing = |what: &str| LlemyError::Validation {
            message: format!("plan document has no {what}"),
        };

        let header = |prefix: &str| {
            text.lines()
                .find_map(|line| line.strip_prefix(prefix))
                .map(str::trim)
        };
        let repository = header("- Repo: ")
            .and_then(RepositoryId::new)
            .ok_or_else(|| missing("repository"))?;
        let number = header("- Number: ")
            .and_then(|n| n.parse::<u64>().ok())
            .and_then(IssueNumber::new)
            .ok_or_else(|| missing("issue number"))?;
        let url = header("- URL:").ok_or_else(|| missing("URL"))?.to_string();

        let (_, after_title) = text
            .split_once("\n## Title\n\n")
            .ok_or_else(|| missing("title section"))?;
        let (title, body) = after_title
            .split_once("\n\n## Body\n\n")
            .ok_or_else(|| missing("body section"))?;
        let body = body.strip_suffix('\n').unwrap_or(body);

        Ok(Self {
            repository,
            number,
            url,
            title: placeholder_to_empty(title, UNTITLED),
            body: placeholder_to_empty(body, NO_BODY),
        })
    }
}

fn placeholder_to_empty(value: &str, placeholder: &str) -> String {
    if value == placeholder {
        String::new()
    } else {
        value.to_string()
    }
}
