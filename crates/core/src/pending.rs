/// Records that a speech-start arrived while there was nothing to pause.
///
/// Lives inside the per-session slot, so `set` and `take_and_clear` are serialized with
/// the "generation begins" transition by the session lock.
#[derive(Debug, Default)]
pub struct PendingBargeIn {
    pending: bool,
}

impl PendingBargeIn {
    pub fn set(&mut self) {
        self.pending = true;
    }

    /// Returns whether a barge-in was pending and clears it.
    pub fn take_and_clear(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_set(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_the_flag() {
        let mut pending = PendingBargeIn::default();
        assert!(!pending.take_and_clear());
        pending.set();
        pending.set();
        assert!(pending.is_set());
        assert!(pending.take_and_clear());
        assert!(!pending.take_and_clear());
    }
}
