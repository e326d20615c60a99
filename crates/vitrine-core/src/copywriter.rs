//! Local marketing-blurb generator, used when no hosted text model is configured.
//!
//! Picks an adjective, verb and use-phrase at random. Production uses the
//! thread-local RNG; tests pass a seed.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

const ADJECTIVES: [&str; 10] = [
    "sleek",
    "modern",
    "cozy",
    "premium",
    "durable",
    "minimal",
    "versatile",
    "space-saving",
    "elegant",
    "eco-friendly",
];
const VERBS: [&str; 6] = ["elevates", "transforms", "refreshes", "warms", "completes", "anchors"];
const USES: [&str; 6] = [
    "living rooms",
    "bedrooms",
    "work nooks",
    "studio spaces",
    "small apartments",
    "reading corners",
];

/// Characters of the item description kept at the start of the blurb.
const DESCRIPTION_PREFIX: usize = 220;

/// Anything that can write a blurb for a catalog item. A hosted model can stand in
/// for [`CopyWriter`] behind this trait.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, title: &str, description: &str, categories: &str) -> String;
}

/// Template-based copywriter.
#[derive(Debug, Default)]
pub struct CopyWriter {
    seeded: Option<Mutex<StdRng>>,
}

impl CopyWriter {
    /// Non-deterministic copywriter backed by the thread-local RNG.
    pub fn new() -> Self {
        Self { seeded: None }
    }

    /// Deterministic copywriter; the same seed yields the same sequence of blurbs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    fn compose<R: Rng + ?Sized>(rng: &mut R, title: &str, description: &str) -> String {
        let adjective = ADJECTIVES.choose(&mut *rng).copied().unwrap_or("modern");
        let verb = VERBS.choose(&mut *rng).copied().unwrap_or("elevates");
        let usage = USES.choose(&mut *rng).copied().unwrap_or("living rooms");
        let extra = format!("Perfect for {usage}. Crafted with {adjective} details that {verb} your space.");
        let base: String = description.trim().chars().take(DESCRIPTION_PREFIX).collect();
        if base.is_empty() {
            format!("{title} — {extra}")
        } else {
            format!("{base} {extra}")
        }
    }
}

impl TextGenerator for CopyWriter {
    fn generate(&self, title: &str, description: &str, _categories: &str) -> String {
        match &self.seeded {
            Some(rng) => {
                // A poisoned lock still holds a usable RNG.
                let mut rng = rng.lock().unwrap_or_else(|e| e.into_inner());
                Self::compose(&mut *rng, title, description)
            }
            None => Self::compose(&mut rand::rng(), title, description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_description_prefix() {
        let w = CopyWriter::seeded(1);
        let out = w.generate("Chair", "  A solid oak chair.  ", "Furniture");
        assert!(out.starts_with("A solid oak chair. Perfect for "));
        assert!(out.ends_with(" your space."));
    }

    #[test]
    fn falls_back_to_title() {
        let w = CopyWriter::new();
        let out = w.generate("Oak Chair", "   ", "");
        assert!(out.starts_with("Oak Chair — Perfect for "));
    }

    #[test]
    fn truncates_long_descriptions_by_chars() {
        let long = "é".repeat(500);
        let out = CopyWriter::new().generate("t", &long, "");
        let prefix: String = out.chars().take_while(|c| *c == 'é').collect();
        assert_eq!(prefix.chars().count(), DESCRIPTION_PREFIX);
    }

    #[test]
    fn same_seed_same_output() {
        let a = CopyWriter::seeded(42);
        let b = CopyWriter::seeded(42);
        for _ in 0..5 {
            assert_eq!(a.generate("t", "d", "c"), b.generate("t", "d", "c"));
        }
    }
}
