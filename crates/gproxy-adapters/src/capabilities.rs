use std::ops::{BitOr, BitOrAssign};

/// A bitset of optional behaviors an adapter supports, so the bridge pipeline can
/// reject or degrade requests (e.g. vision content sent to a text-only model) up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u16);

impl Capabilities {
    pub const STREAMING: Capabilities = Capabilities(1 << 0);
    pub const TOOLS: Capabilities = Capabilities(1 << 1);
    pub const VISION: Capabilities = Capabilities(1 << 2);
    pub const MULTIMODAL: Capabilities = Capabilities(1 << 3);
    pub const SYSTEM_PROMPT: Capabilities = Capabilities(1 << 4);
    pub const TOOL_CHOICE: Capabilities = Capabilities(1 << 5);
    pub const REASONING: Capabilities = Capabilities(1 << 6);
    pub const WEB_SEARCH: Capabilities = Capabilities(1 << 7);
    pub const JSON_MODE: Capabilities = Capabilities(1 << 8);
    pub const LOGPROBS: Capabilities = Capabilities(1 << 9);
    pub const SEED: Capabilities = Capabilities(1 << 10);

    pub const NONE: Capabilities = Capabilities(0);

    pub const fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Capabilities) -> Capabilities {
        Capabilities(self.0 | rhs.0)
    }
}

impl BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Capabilities) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_and_queries_flags() {
        let caps = Capabilities::STREAMING | Capabilities::TOOLS | Capabilities::VISION;
        assert!(caps.contains(Capabilities::STREAMING));
        assert!(caps.contains(Capabilities::TOOLS | Capabilities::VISION));
        assert!(!caps.contains(Capabilities::REASONING));
    }
}
