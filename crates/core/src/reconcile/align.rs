//! Pairwise LCS alignment between the original sequence and one modified side.

use std::collections::HashMap;

use similar::{capture_diff_slices, Algorithm, DiffOp};
use unicase::UniCase;

use crate::tokenize::{Token, TokenKind, Tokenizer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CmpKey {
    Sensitive(String),
    Insensitive(UniCase<String>),
}

fn cmp_key(token: &Token, tokenizer: &Tokenizer) -> CmpKey {
    match tokenizer {
        Tokenizer::WordsCaseInsensitive if token.kind == TokenKind::Word => {
            CmpKey::Insensitive(UniCase::new(token.text.clone()))
        }
        _ => CmpKey::Sensitive(token.text.clone()),
    }
}

/// Result of aligning `original` against one modified side.
pub struct Alignment {
    /// `kept[i]` is true when `original[i]` survives (unchanged or matched) in the
    /// modified side.
    pub kept: Vec<bool>,
    /// `matched_text[i]` is the text of the modified-side token matched to
    /// `original[i]` when `kept[i]` is true (under case-insensitive comparison this
    /// can differ from `original[i].text` in casing only).
    pub matched_text: Vec<Option<String>>,
    /// Runs of tokens this side inserted, keyed by the original-index anchor they
    /// precede (`original.len()` anchors a trailing run).
    pub inserts: HashMap<usize, Vec<Token>>,
}

pub fn align(original: &[Token], modified: &[Token], tokenizer: &Tokenizer) -> Alignment {
    let orig_keys: Vec<CmpKey> = original.iter().map(|t| cmp_key(t, tokenizer)).collect();
    let mod_keys: Vec<CmpKey> = modified.iter().map(|t| cmp_key(t, tokenizer)).collect();

    let ops = capture_diff_slices(Algorithm::Myers, &orig_keys, &mod_keys);

    let mut kept = vec![false; original.len()];
    let mut matched_text = vec![None; original.len()];
    let mut inserts: HashMap<usize, Vec<Token>> = HashMap::new();

    for op in ops {
        match op {
            DiffOp::Equal { old_index, new_index, len } => {
                for k in 0..len {
                    kept[old_index + k] = true;
                    matched_text[old_index + k] = Some(modified[new_index + k].text.clone());
                }
            }
            DiffOp::Insert { old_index, new_index, new_len } => {
                inserts
                    .entry(old_index)
                    .or_default()
                    .extend_from_slice(&modified[new_index..new_index + new_len]);
            }
            DiffOp::Replace { old_index, new_index, new_len, .. } => {
                inserts
                    .entry(old_index)
                    .or_default()
                    .extend_from_slice(&modified[new_index..new_index + new_len]);
            }
            DiffOp::Delete { .. } => {}
        }
    }

    Alignment { kept, matched_text, inserts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::tokenize_characters;

    #[test]
    fn identical_sequences_keep_everything() {
        let o = tokenize_characters("hello");
        let a = align(&o, &o.clone(), &Tokenizer::Characters);
        assert!(a.kept.iter().all(|&k| k));
        assert!(a.inserts.is_empty());
    }

    #[test]
    fn pure_insertion_anchors_correctly() {
        let o = tokenize_characters("ac");
        let m = tokenize_characters("abc");
        let a = align(&o, &m, &Tokenizer::Characters);
        assert_eq!(a.kept, vec![true, true]);
        assert!(a.inserts.contains_key(&1));
    }

    #[test]
    fn pure_deletion_marks_unkept() {
        let o = tokenize_characters("abc");
        let m = tokenize_characters("ac");
        let a = align(&o, &m, &Tokenizer::Characters);
        assert_eq!(a.kept, vec![true, false, true]);
        assert!(a.inserts.is_empty());
    }
}
