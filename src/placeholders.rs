//! Placeholder substitution
//!
//! Replaces `{{token}}` literals in text blocks. The block's full visible
//! text is the matching unit, so tokens split across formatting runs are
//! still found. All tokens are applied in one left-to-right scan: a value
//! written by one replacement is never re-matched as another token.
//!
//! The producing tool sometimes rewrites the interior spaces of a token to
//! non-breaking spaces, or strips them; both variants are matched alongside
//! the canonical literal.

use crate::document::{DocumentModel, TextBlock};
use phf::phf_set;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// In-template correctness marker, stripped from option text by the
/// detector rather than substituted with a value.
pub const CHECKBOX_MARKER: &str = "{{checkbox}}";

pub const TOKEN_FIRST_NAME: &str = "{{prenom}}";
pub const TOKEN_LAST_NAME: &str = "{{nom}}";
pub const TOKEN_EMAIL: &str = "{{email}}";
pub const TOKEN_SESSION_REF: &str = "{{ref_session}}";
pub const TOKEN_EVALUATION_DATE: &str = "{{date_evaluation}}";
pub const TOKEN_SCORE_TOTAL: &str = "{{result_mod_total}}";
pub const TOKEN_TOTAL_QUESTIONS: &str = "{{total_questions}}";
pub const TOKEN_OUTCOME: &str = "{{result_evaluation}}";

/// Fixed token names (the part between the braces). The per-module tokens
/// `result_mod<N>` / `total_mod<N>` are recognized by prefix instead.
static FIXED_TOKEN_NAMES: phf::Set<&'static str> = phf_set! {
    "prenom",
    "nom",
    "email",
    "ref_session",
    "date_evaluation",
    "result_mod_total",
    "total_questions",
    "result_evaluation",
    "checkbox",
};

/// Per-module score token for module `N`
pub fn result_mod_token(module: &str) -> String {
    format!("{{{{result_mod{}}}}}", module)
}

/// Per-module total token for module `N`
pub fn total_mod_token(module: &str) -> String {
    format!("{{{{total_mod{}}}}}", module)
}

/// Ordered token -> value mapping applied in one pass
pub type Replacements = BTreeMap<String, String>;

/// The variants of a token the producing tool may have left in the text:
/// the literal itself, a spaced form, the spaced form with NBSP.
fn token_variants(token: &str) -> Vec<String> {
    let mut variants = vec![token.to_string()];
    if let Some(name) = token
        .strip_prefix("{{")
        .and_then(|t| t.strip_suffix("}}"))
    {
        let spaced = format!("{{{{ {} }}}}", name.trim());
        let nbsp = spaced.replace(' ', "\u{a0}");
        let stripped = spaced.replace(' ', "");
        for v in [spaced, nbsp, stripped] {
            if !variants.contains(&v) {
                variants.push(v);
            }
        }
    }
    variants
}

/// Replace every occurrence of every token in `text`.
///
/// Returns `None` when nothing matched, so callers can skip the block
/// rewrite (and keep its run structure) on a no-op.
pub fn substitute_text(text: &str, replacements: &Replacements) -> Option<String> {
    if text.is_empty() || replacements.is_empty() {
        return None;
    }

    let variants: Vec<(String, &str)> = replacements
        .iter()
        .flat_map(|(token, value)| {
            token_variants(token)
                .into_iter()
                .map(move |v| (v, value.as_str()))
        })
        .collect();

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    let mut changed = false;

    while pos < text.len() {
        // earliest match wins; on a tie the longest variant wins
        let mut best: Option<(usize, usize, &str)> = None;
        for (pattern, value) in &variants {
            if let Some(rel) = text[pos..].find(pattern.as_str()) {
                let start = pos + rel;
                let better = match best {
                    None => true,
                    Some((s, len, _)) => start < s || (start == s && pattern.len() > len),
                };
                if better {
                    best = Some((start, pattern.len(), value));
                }
            }
        }
        match best {
            Some((start, len, value)) => {
                out.push_str(&text[pos..start]);
                out.push_str(value);
                pos = start + len;
                changed = true;
            }
            None => {
                out.push_str(&text[pos..]);
                break;
            }
        }
    }

    changed.then_some(out)
}

/// Apply the replacements to one block, collapsing it to a single run when
/// anything matched. An empty block is a no-op.
pub fn substitute_block(block: &mut TextBlock, replacements: &Replacements) {
    if block.is_empty() {
        return;
    }
    if let Some(new_text) = substitute_text(&block.text(), replacements) {
        block.set_text(new_text);
    }
}

/// Apply the replacements to every block collection of the document:
/// body, table cells, headers and footers.
pub fn substitute_document(doc: &mut DocumentModel, replacements: &Replacements) {
    doc.for_each_block_mut(|block| substitute_block(block, replacements));
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{[\s\u{a0}]*([A-Za-z_][A-Za-z0-9_]*)[\s\u{a0}]*\}\}").unwrap())
}

/// Recognized tokens still present in the document after rendering.
///
/// Used for a post-render diagnostic: a non-empty result means a template
/// placeholder was never given a value (e.g. a module token for a module
/// the key does not know).
pub fn unresolved_tokens(doc: &DocumentModel) -> Vec<String> {
    let mut found = Vec::new();
    doc.for_each_block(|block| {
        let text = block.text();
        for cap in token_regex().captures_iter(&text) {
            let name = &cap[1];
            let recognized = FIXED_TOKEN_NAMES.contains(name)
                || name.starts_with("result_mod")
                || name.starts_with("total_mod");
            if recognized && !found.contains(&cap[0].to_string()) {
                found.push(cap[0].to_string());
            }
        }
    });
    found
}
