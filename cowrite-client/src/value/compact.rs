//! Coalescing of per-atom sequence changes into text replacements.
//!
//! A patch realizes as one sequence change per atom, but most patches are
//! runs: a word typed, a selection deleted. Splicing the text once per atom
//! is quadratic on long runs, so consecutive changes are folded into one
//! [`Replace`] before the text is touched.
//!
//! Indices fed in are sequence indices at the moment of each change: the
//! insertion index after an insert, the removal index before a delete.
//! Applying the emitted replacements in order to the text as it stood
//! before the patch yields the text after the patch.

/// Replace `len` characters at `pos` with `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    pub pos: usize,
    pub len: usize,
    pub value: String,
}

impl Replace {
    fn value_len(&self) -> usize {
        self.value.chars().count()
    }
}

/// Folds consecutive inserts and deletes into [`Replace`] runs.
#[derive(Debug, Default)]
pub struct Compactor {
    current: Option<Replace>,
    value_len: usize,
    done: Vec<Replace>,
}

impl Compactor {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a character inserted at sequence index `index`.
    pub fn insert(&mut self, index: usize, ch: char) {
        if let Some(run) = &mut self.current {
            if index == run.pos + self.value_len {
                run.value.push(ch);
                self.value_len += 1;
                return;
            }
        }
        self.restart(Replace {
            pos: index,
            len: 0,
            value: ch.to_string(),
        });
    }

    /// Records the character removed from sequence index `index`.
    ///
    /// A delete right after the run's inserted text consumes one more
    /// character of the text as it stood before the run.
    pub fn delete(&mut self, index: usize) {
        if let Some(run) = &mut self.current {
            if index == run.pos + self.value_len {
                run.len += 1;
                return;
            }
        }
        self.restart(Replace {
            pos: index,
            len: 1,
            value: String::new(),
        });
    }

    /// Flushes the open run and returns every replacement in order.
    pub fn finish(mut self) -> Vec<Replace> {
        self.flush();
        self.done
    }

    fn restart(&mut self, run: Replace) {
        self.flush();
        self.value_len = run.value_len();
        self.current = Some(run);
    }

    fn flush(&mut self) {
        if let Some(run) = self.current.take() {
            self.done.push(run);
        }
        self.value_len = 0;
    }
}
