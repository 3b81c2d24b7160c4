//! C3 — Variant Assigner: deterministic, stateless `userId -> {control,
//! treatment}` (spec §4.1).

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Control,
    Treatment,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Control => "control",
            Variant::Treatment => "treatment",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-256 of `user_id`'s UTF-8 bytes; the low bit of the first digest
/// byte selects the bucket. Empty or absent `userId` is `control`. The
/// digest family is fixed (not just "some hash") so the assignment is
/// reproducible across languages and processes.
pub fn assign_variant(user_id: &str) -> Variant {
    if user_id.is_empty() {
        return Variant::Control;
    }
    let digest = Sha256::digest(user_id.as_bytes());
    if digest[0] & 1 == 0 {
        Variant::Control
    } else {
        Variant::Treatment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_user_id_is_control() {
        assert_eq!(assign_variant(""), Variant::Control);
    }

    #[test]
    fn assignment_is_deterministic() {
        let a = assign_variant("user-42");
        let b = assign_variant("user-42");
        assert_eq!(a, b);
    }

    #[test]
    fn distributes_across_both_buckets() {
        let mut saw_control = false;
        let mut saw_treatment = false;
        for i in 0..200 {
            match assign_variant(&format!("user-{i}")) {
                Variant::Control => saw_control = true,
                Variant::Treatment => saw_treatment = true,
            }
        }
        assert!(saw_control && saw_treatment);
    }
}
