// libnfcee/src/ee/quirks/noop.rs

/// Chips without secure element errata
pub struct NoopQuirks;

impl NoopQuirks {
    pub fn new() -> Self {
        Self
    }
}

impl super::Quirks for NoopQuirks {
    fn name(&self) -> &'static str {
        "noop"
    }
}
