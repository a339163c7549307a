//! Three-way text reconciliation (`SPEC_FULL.md` §4.1).
//!
//! `reconcile` is total and deterministic: every triple of inputs produces a merged
//! token sequence, never an error. Consumers project that sequence down to plain
//! text (dropping removed tokens) or keep the full provenance for a conflict view.

mod align;
mod merge_text;

pub use merge_text::merge_text;

use crate::tokenize::{Token, Tokenizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    OriginalKept,
    OriginalRemovedByLeft,
    OriginalRemovedByRight,
    OriginalRemovedByBoth,
    AddedByLeft,
    AddedByRight,
    AddedByBoth,
}

impl Provenance {
    pub fn is_removed(&self) -> bool {
        matches!(
            self,
            Provenance::OriginalRemovedByLeft
                | Provenance::OriginalRemovedByRight
                | Provenance::OriginalRemovedByBoth
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedToken {
    pub text: String,
    pub provenance: Provenance,
}

/// Three-way merge of `original`, `left`, and `right` under `tokenizer`.
pub fn reconcile(original: &str, left: &str, right: &str, tokenizer: Tokenizer) -> Vec<MergedToken> {
    let orig_tokens = tokenizer.tokenize(original);
    let left_tokens = tokenizer.tokenize(left);
    let right_tokens = tokenizer.tokenize(right);

    let left_align = align::align(&orig_tokens, &left_tokens, &tokenizer);
    let right_align = align::align(&orig_tokens, &right_tokens, &tokenizer);

    let mut out = Vec::with_capacity(orig_tokens.len());
    let n = orig_tokens.len();

    for i in 0..=n {
        emit_inserts(
            &mut out,
            left_align.inserts.get(&i),
            right_align.inserts.get(&i),
            &tokenizer,
        );

        if i < n {
            let provenance = match (left_align.kept[i], right_align.kept[i]) {
                (true, true) => Provenance::OriginalKept,
                (true, false) => Provenance::OriginalRemovedByRight,
                (false, true) => Provenance::OriginalRemovedByLeft,
                (false, false) => Provenance::OriginalRemovedByBoth,
            };
            let text = kept_text(
                &orig_tokens[i].text,
                left_align.kept[i],
                left_align.matched_text[i].as_ref(),
                right_align.kept[i],
                right_align.matched_text[i].as_ref(),
            );
            out.push(MergedToken { text, provenance });
        }
    }

    out
}

/// Chooses the text to emit for a token both sides kept. Under case-insensitive
/// comparison the two sides can agree a token survives while disagreeing on its
/// casing; left's edit wins ties, original casing wins when neither side changed it.
fn kept_text(orig_text: &str, left_kept: bool, left_text: Option<&String>, right_kept: bool, right_text: Option<&String>) -> String {
    if left_kept {
        if let Some(lt) = left_text {
            if lt != orig_text {
                return lt.clone();
            }
        }
    }
    if right_kept {
        if let Some(rt) = right_text {
            if rt != orig_text {
                return rt.clone();
            }
        }
    }
    orig_text.to_string()
}

fn emit_inserts(
    out: &mut Vec<MergedToken>,
    left_run: Option<&Vec<Token>>,
    right_run: Option<&Vec<Token>>,
    tokenizer: &Tokenizer,
) {
    let empty = Vec::new();
    let left_run = left_run.unwrap_or(&empty);
    let right_run = right_run.unwrap_or(&empty);

    if left_run.is_empty() && right_run.is_empty() {
        return;
    }

    let identical = left_run.len() == right_run.len()
        && left_run.iter().zip(right_run.iter()).all(|(l, r)| tokenizer.tokens_equal(l, r));

    if identical {
        for t in left_run {
            out.push(MergedToken { text: t.text.clone(), provenance: Provenance::AddedByBoth });
        }
        return;
    }

    // Left before right: deterministic tie-break for conflicting concurrent inserts.
    for t in left_run {
        out.push(MergedToken { text: t.text.clone(), provenance: Provenance::AddedByLeft });
    }
    for t in right_run {
        out.push(MergedToken { text: t.text.clone(), provenance: Provenance::AddedByRight });
    }
}

/// Concatenates every non-removed token's text: the "plain merged text" view.
pub fn project(tokens: &[MergedToken]) -> String {
    tokens.iter().filter(|t| !t.provenance.is_removed()).map(|t| t.text.as_str()).collect()
}

/// `reconcile` followed by `project`, the shape most callers want.
pub fn reconcile_text(original: &str, left: &str, right: &str, tokenizer: Tokenizer) -> String {
    project(&reconcile(original, left, right, tokenizer))
}
