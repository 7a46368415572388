//! Collaborative plain text.
//!
//! The text is a [`Sequence<char>`] whose Pids are minted by the authority.
//! A local edit becomes a patch of `Delete`s for the replaced atoms plus
//! one `ClientInsert` naming the neighbouring Pids; the authority answers
//! with authoritative `Insert`s that every replica, including this one,
//! applies in the same global order.
//!
//! The rendered string and the selection are derived state, updated only
//! while applying patches. Positions and lengths are measured in
//! characters.

use cowrite_crdt::{decode_patch, encode_patch, Atom, Op, ParseError, Sequence};
use tracing::debug;

use super::compact::{Compactor, Replace};
use super::ValueCore;
use crate::error::{ClientError, ClientResult};
use crate::event::{SelectionChanged, TextReplaced, ValueEvent};

/// A replicated string with a local selection.
#[derive(Debug, Default)]
pub struct TextValue {
    atoms: Sequence<char>,
    text: String,
    char_len: usize,
    sel_start: usize,
    sel_end: usize,
    pub(crate) core: ValueCore,
}

impl TextValue {
    /// Creates an empty text value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a text value from existing atoms.
    pub fn from_atoms(atoms: Sequence<char>) -> Self {
        let text = atoms.as_string();
        Self {
            char_len: atoms.len(),
            atoms,
            text,
            ..Self::default()
        }
    }

    /// Decodes a snapshot: a JSON array of `{"Pid", "Value"}` atoms.
    pub fn decode(s: &str) -> ClientResult<Self> {
        let atoms: Vec<Atom<char>> = serde_json::from_str(s).map_err(ParseError::Json)?;
        Ok(Self::from_atoms(Sequence::from_atoms(atoms)))
    }

    /// Encodes the atoms in snapshot form.
    pub fn encode(&self) -> ClientResult<String> {
        Ok(serde_json::to_string(self.atoms.as_slice())?)
    }

    /// The current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the text in characters.
    pub fn len(&self) -> usize {
        self.char_len
    }

    /// Returns true if the text is empty.
    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// The underlying atoms.
    pub fn atoms(&self) -> &Sequence<char> {
        &self.atoms
    }

    /// The selection as `[start, end)`.
    pub fn selection_range(&self) -> (usize, usize) {
        (self.sel_start, self.sel_end)
    }

    /// Requests that `len` characters at `pos` be replaced with `value`.
    ///
    /// Emits one patch and takes the edit token; the text itself is only
    /// updated once the authority echoes the patch back.
    pub fn replace_text(&mut self, pos: usize, len: usize, value: &str) -> ClientResult<()> {
        self.core.ensure_idle()?;
        if len == 0 && value.is_empty() {
            return Ok(());
        }
        let end = self.check_range(pos, len)?;

        let mut ops: Vec<Op> = self.atoms.as_slice()[pos..end]
            .iter()
            .map(|atom| Op::Delete {
                pid: atom.pid.clone(),
            })
            .collect();
        if !value.is_empty() {
            let prev_pid = pos
                .checked_sub(1)
                .and_then(|i| self.atoms.pid_at(i))
                .cloned();
            let next_pid = self.atoms.pid_at(end).cloned();
            ops.push(Op::ClientInsert {
                prev_pid,
                next_pid,
                value: value.to_string(),
            });
        }
        self.core.begin_edit(encode_patch(&ops))
    }

    /// Applies an authoritative patch of `Insert`s and `Delete`s.
    ///
    /// A patch holding a `ClientInsert` is rejected before anything changes.
    pub fn apply_patch(&mut self, is_local: bool, patch: &str) -> ClientResult<()> {
        if is_local {
            self.core.acknowledge();
        }
        let ops = decode_patch(patch)?;
        if let Some(op) = ops.iter().find(|op| op.is_client_only()) {
            return Err(ClientError::Protocol(format!(
                "client-only op in authoritative patch: {op}"
            )));
        }

        let mut runs = Compactor::new();
        for op in ops {
            match op {
                Op::Insert { pid, value } => {
                    if let Some(index) = self.atoms.apply_insert(pid, value) {
                        runs.insert(index, value);
                    }
                }
                Op::Delete { pid } => {
                    if let Some(index) = self.atoms.apply_delete(&pid) {
                        runs.delete(index);
                    }
                }
                // Rejected above.
                Op::ClientInsert { .. } => {}
            }
        }
        for Replace { pos, len, value } in runs.finish() {
            self.apply_replace_text(is_local, pos, len, &value)?;
        }
        Ok(())
    }

    /// Moves the local selection. Never leaves this replica.
    ///
    /// The range must satisfy `start <= end <= len()`.
    pub fn set_selection_range(&mut self, start: usize, end: usize) -> ClientResult<()> {
        self.core.ensure_idle()?;
        if start > end || end > self.char_len {
            return Err(ClientError::OutOfBounds {
                pos: start,
                len: end.saturating_sub(start),
                size: self.char_len,
            });
        }
        if (start, end) == (self.sel_start, self.sel_end) {
            return Ok(());
        }
        self.sel_start = start;
        self.sel_end = end;
        self.core
            .emit(ValueEvent::SelectionChanged(SelectionChanged {
                is_local: true,
                start,
                end,
            }));
        Ok(())
    }

    /// Splices the rendered text and adjusts the selection.
    ///
    /// A local change collapses the selection to the end of the inserted
    /// text. A remote change shifts selection endpoints at or after `pos`.
    pub fn apply_replace_text(
        &mut self,
        is_local: bool,
        pos: usize,
        len: usize,
        value: &str,
    ) -> ClientResult<()> {
        if len == 0 && value.is_empty() {
            return Ok(());
        }
        self.check_range(pos, len)?;

        let start = byte_offset(&self.text, pos);
        let end = start + byte_offset(&self.text[start..], len);
        self.text.replace_range(start..end, value);
        let value_len = value.chars().count();
        self.char_len = self.char_len - len + value_len;

        if is_local {
            self.sel_start = pos + value_len;
            self.sel_end = self.sel_start;
        } else {
            let shift = |x: usize| {
                if x >= pos {
                    x.saturating_sub(len).max(pos) + value_len
                } else {
                    x
                }
            };
            self.sel_start = shift(self.sel_start);
            self.sel_end = shift(self.sel_end);
        }

        debug!(is_local, pos, len, value_len, "text replaced");
        self.core.emit(ValueEvent::TextReplaced(TextReplaced {
            is_local,
            pos,
            len,
            value: value.to_string(),
        }));
        Ok(())
    }

    fn check_range(&self, pos: usize, len: usize) -> ClientResult<usize> {
        match pos.checked_add(len) {
            Some(end) if end <= self.char_len => Ok(end),
            _ => Err(ClientError::OutOfBounds {
                pos,
                len,
                size: self.char_len,
            }),
        }
    }
}

/// Byte offset of the `chars`-th character, or the end of `s`.
fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}
