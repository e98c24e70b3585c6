//! Return-annotation splicing.
//!
//! Edits are byte-range replacements on the original text, so everything
//! outside the annotations (bodies, comments, formatting) is preserved.

use std::ops::Range;

use crate::label::ReplyLabel;
use crate::python::FunctionSite;

pub const RESPONSE_WRAPPER: &str = "ResponseT";
pub const PLACEHOLDER: &str = "TODO";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// `ResponseT[X]` or `ResponseT[Union[X, Y, ...]]`
    Response(Vec<ReplyLabel>),
    NoneType,
    Placeholder,
}

impl Annotation {
    /// Wrap the distinct labels, keeping first-seen order.
    pub fn response(labels: impl IntoIterator<Item = ReplyLabel>) -> Self {
        let mut distinct: Vec<ReplyLabel> = Vec::new();
        for label in labels {
            if !distinct.contains(&label) {
                distinct.push(label);
            }
        }
        Annotation::Response(distinct)
    }

    pub fn render(&self) -> String {
        match self {
            Annotation::Response(labels) => match labels.as_slice() {
                [] => PLACEHOLDER.to_string(),
                [single] => format!("{RESPONSE_WRAPPER}[{single}]"),
                many => {
                    let names: Vec<&str> = many.iter().map(|l| l.type_name()).collect();
                    format!("{RESPONSE_WRAPPER}[Union[{}]]", names.join(", "))
                }
            },
            Annotation::NoneType => "None".to_string(),
            Annotation::Placeholder => PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    range: Range<usize>,
    text: String,
}

/// Collects annotation edits and applies them in one pass.
#[derive(Debug, Default)]
pub struct Rewriter {
    edits: Vec<Edit>,
}

impl Rewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn annotate(&mut self, site: &FunctionSite, annotation: &Annotation) {
        let rendered = annotation.render();
        tracing::info!(function = %site.name, annotation = %rendered, "Changing return type");
        let edit = match &site.annotation {
            Some(range) => Edit {
                range: range.clone(),
                text: rendered,
            },
            None => Edit {
                range: site.insert_at..site.insert_at,
                text: format!(" -> {rendered}"),
            },
        };
        self.edits.retain(|e| e.range != edit.range);
        self.edits.push(edit);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn apply(mut self, source: &str) -> String {
        self.edits.sort_by_key(|e| std::cmp::Reverse(e.range.start));
        let mut out = source.to_string();
        for edit in self.edits {
            out.replace_range(edit.range, &edit.text);
        }
        out
    }
}
