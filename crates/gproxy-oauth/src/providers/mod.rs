pub mod antigravity;
pub mod codex;
