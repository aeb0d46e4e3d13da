//! Conditional-compilation state tracking.
//!
//! Each `#if`/`#ifdef`/`#ifndef` pushes a frame; `#elif` and friends move
//! the frame between three states. `Awaiting` means no branch has been
//! taken yet, `Active` means the current branch emits tokens, `Done` means
//! a branch was already taken and everything up to `#endif` is skipped.
//! Directives inside skipped regions still push and pop frames, so nesting
//! stays balanced.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BranchState {
    Awaiting,
    Active,
    Done,
}

#[derive(Clone, Debug)]
struct Frame {
    state: BranchState,
    parent_active: bool,
}

/// Stack of open conditional blocks.
#[derive(Debug, Default)]
pub struct ConditionalStack {
    frames: Vec<Frame>,
}

impl ConditionalStack {
    /// Empty stack; tokens are emitted.
    pub fn new() -> Self {
        ConditionalStack::default()
    }

    /// Whether the current region emits tokens.
    pub fn is_active(&self) -> bool {
        self.frames
            .last()
            .is_none_or(|f| f.parent_active && f.state == BranchState::Active)
    }

    /// Number of open conditional blocks.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a new block. Inside a skipped region the frame starts `Done`
    /// so no branch of it can ever activate.
    pub fn push(&mut self, cond: bool) {
        let parent_active = self.is_active();
        let state = if !parent_active {
            BranchState::Done
        } else if cond {
            BranchState::Active
        } else {
            BranchState::Awaiting
        };
        self.frames.push(Frame {
            state,
            parent_active,
        });
    }

    /// True when the condition of an `#elif`-family directive must be
    /// evaluated: only while the innermost frame is still awaiting a
    /// branch. A frame that is `Active` or `Done` ignores the condition.
    pub fn needs_branch_eval(&self) -> bool {
        self.frames
            .last()
            .is_some_and(|f| f.parent_active && f.state == BranchState::Awaiting)
    }

    /// Apply an `#elif`/`#elifdef`/`#elifndef`. Returns `false` when no
    /// block is open.
    pub fn branch(&mut self, cond: bool) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };
        frame.state = match frame.state {
            BranchState::Active | BranchState::Done => BranchState::Done,
            BranchState::Awaiting if cond => BranchState::Active,
            BranchState::Awaiting => BranchState::Awaiting,
        };
        true
    }

    /// Apply an `#else`. Returns `false` when no block is open.
    pub fn else_branch(&mut self) -> bool {
        self.branch(true)
    }

    /// Close the innermost block. Returns `false` when none is open.
    pub fn pop(&mut self) -> bool {
        self.frames.pop().is_some()
    }

    /// Discard frames down to `depth`, used to resynchronize after a file
    /// ends with unbalanced conditionals.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }
}
