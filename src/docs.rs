//! Reply-type lookup against the Redis command reference.
//!
//! Each command page carries a reply section headed by one of a few known
//! anchors. The element right after the heading comes in several shapes
//! (a list of alternatives, a paragraph with a link, a bare link, prose
//! followed by a list) and each one is read differently.

use std::time::Duration;

use anyhow::Context;
use scraper::{ElementRef, Html};
use url::Url;

use crate::error::TyperError;
use crate::label::{match_reply_phrase, LabelMatch, ReplyLabel};

pub const DEFAULT_DOCS_URL: &str = "https://redis.io/docs/latest/commands";

/// Reply section anchors, highest priority first.
const REPLY_MARKERS: [&str; 3] = ["resp2resp3-reply", "resp2resp3-replies", "resp2-reply"];

/// Redirect hops a command page may take before it counts as missing.
const MAX_REDIRECTS: usize = 1;

/// Path segment of a command page: `CLIENT LIST` -> `client-list`.
pub fn command_slug(command: &str) -> String {
    command.to_lowercase().replace(|c: char| c == '_' || c == ' ', "-")
}

/// Source of command documentation pages.
#[allow(async_fn_in_trait)]
pub trait DocsSource {
    /// Fetch the HTML page for `command`, on behalf of `function`.
    async fn fetch(&self, function: &str, command: &str) -> Result<String, TyperError>;
}

/// Operator confirmation for reply sections nobody knows how to read.
pub trait Confirm {
    /// `true` to move on to the next reply section, `false` to give up on the
    /// function.
    fn confirm(&mut self, function: &str, element: &str) -> bool;
}

/// Interactive y/n prompt on the terminal.
#[derive(Default)]
pub struct Prompt;

impl Confirm for Prompt {
    fn confirm(&mut self, function: &str, element: &str) -> bool {
        eprintln!("couldn't find type hint in response for Function: {function}");
        eprintln!("below element is {element}");
        let mut editor = match rustyline::DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot open prompt, treating as 'n'");
                return false;
            }
        };
        match editor.readline("y/n: ") {
            Ok(line) => line.trim() == "y",
            Err(_) => false,
        }
    }
}

/// Fixed answer for non-interactive runs.
pub struct AlwaysAnswer(pub bool);

impl Confirm for AlwaysAnswer {
    fn confirm(&mut self, function: &str, _element: &str) -> bool {
        tracing::info!(
            function,
            answer = self.0,
            "Unreadable reply section, answering without prompt"
        );
        self.0
    }
}

pub struct DocsClient {
    client: reqwest::Client,
    base: Url,
}

impl DocsClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)
            .with_context(|| format!("Invalid documentation URL '{base_url}'"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        // One canonicalizing hop is fine; unknown commands bounce further.
        let redirects = reqwest::redirect::Policy::custom(|attempt| {
            if attempt.previous().len() > MAX_REDIRECTS {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(redirects)
            .user_agent(concat!("redis-reply-typer/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Cannot build HTTP client")?;
        Ok(Self { client, base })
    }

    pub fn page_url(&self, command: &str) -> Result<Url, url::ParseError> {
        self.base.join(&format!("{}/", command_slug(command)))
    }
}

impl DocsSource for DocsClient {
    async fn fetch(&self, function: &str, command: &str) -> Result<String, TyperError> {
        let not_documented = || TyperError::NotDocumented(function.to_string());
        let url = self.page_url(command).map_err(|_| not_documented())?;
        tracing::info!(function, url = %url, "Checking function");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(function, error = %e, "Documentation request failed");
                return Err(not_documented());
            }
        };

        // A redirect chain cut short by the policy surfaces as a 3xx here.
        if !response.status().is_success() {
            tracing::warn!(
                function,
                status = response.status().as_u16(),
                landed = %response.url(),
                "Command page not found"
            );
            return Err(not_documented());
        }

        response.text().await.map_err(|e| {
            tracing::warn!(function, error = %e, "Cannot read documentation body");
            not_documented()
        })
    }
}

/// Read the reply types a command page declares.
///
/// Returns the raw matches, unrecognized phrases included; the caller decides
/// what to do with those. `NoReplySection` is returned when none of the
/// anchors exist and should abort the run.
pub fn extract_reply_labels(
    function: &str,
    html: &str,
    confirm: &mut dyn Confirm,
) -> Result<Vec<LabelMatch>, TyperError> {
    let doc = Html::parse_document(html);

    for (idx, marker) in REPLY_MARKERS.iter().enumerate() {
        let Some(header) = element_by_id(&doc, marker) else {
            if idx == REPLY_MARKERS.len() - 1 {
                return Err(TyperError::NoReplySection(function.to_string()));
            }
            continue;
        };

        let below = header
            .next_siblings()
            .find_map(ElementRef::wrap)
            .ok_or_else(|| TyperError::MissingSibling {
                function: function.to_string(),
                marker: marker.to_string(),
            })?;
        let text = element_text(below);
        let tag = below.value().name();

        if text.contains("One of the following:")
            || text.contains("Any of the following:")
            || tag == "ul"
        {
            let list = if tag == "ul" {
                Some(below)
            } else {
                find_next(&doc, below, "ul")
            };
            let list = list.ok_or_else(|| TyperError::MissingList(function.to_string()))?;
            return Ok(list_items(list));
        }

        match tag {
            "p" => {
                if let Some(link) = first_descendant(below, "a") {
                    return Ok(vec![match_reply_phrase(&element_text(link))]);
                }
            }
            "a" => {
                let mut phrase = text.clone();
                if let Some(code) = find_next(&doc, below, "code") {
                    phrase.push_str(": ");
                    phrase.push_str(&element_text(code));
                }
                return Ok(vec![match_reply_phrase(&phrase)]);
            }
            _ => {}
        }

        if let Some(list) = find_next(&doc, below, "ul") {
            return Ok(list_items(list));
        }

        if text.contains("Non-standard return value") {
            return Ok(vec![LabelMatch::Label(ReplyLabel::Any)]);
        }

        tracing::warn!(function, marker, element = %below.html(), "Unreadable reply section");
        if confirm.confirm(function, &below.html()) {
            continue;
        }
        return Err(TyperError::Declined(function.to_string()));
    }

    Err(TyperError::Unresolved(function.to_string()))
}

fn element_by_id<'a>(doc: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    doc.tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().id() == Some(id))
}

/// First element named `tag` after `from` in document order, `from`'s own
/// descendants included.
fn find_next<'a>(doc: &'a Html, from: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    doc.tree
        .root()
        .descendants()
        .skip_while(|node| node.id() != from.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == tag)
}

fn first_descendant<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == tag)
}

fn list_items(list: ElementRef<'_>) -> Vec<LabelMatch> {
    list.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li")
        .map(|li| match_reply_phrase(&element_text(li)))
        .collect()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}
