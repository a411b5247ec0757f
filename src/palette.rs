//! Box color palettes.
//!
//! A palette file is a JSON array of `[r, g, b]` triples.

use anyhow::{anyhow, Context, Result};
use image::Rgb;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;

const DEFAULT_COLORS: [[u8; 3]; 12] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
    [210, 245, 60],
    [250, 190, 190],
    [0, 128, 128],
    [170, 110, 40],
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb<u8>>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb<u8>>) -> Result<Self> {
        if colors.is_empty() {
            return Err(anyhow!("palette must contain at least one color"));
        }
        Ok(Self { colors })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read palette file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid palette file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let triples: Vec<[u8; 3]> = serde_json::from_str(raw)?;
        Self::new(triples.into_iter().map(Rgb).collect())
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    /// Pick a color uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Rgb<u8> {
        // `new` rejects empty palettes, so the fallback is unreachable.
        self.colors
            .choose(rng)
            .copied()
            .unwrap_or(Rgb(DEFAULT_COLORS[0]))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.iter().copied().map(Rgb).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn parse_reads_rgb_triples() -> Result<()> {
        let palette = Palette::parse("[[1,2,3],[255,0,128]]")?;
        assert_eq!(palette.colors(), &[Rgb([1, 2, 3]), Rgb([255, 0, 128])]);
        Ok(())
    }

    #[test]
    fn empty_or_malformed_palettes_are_rejected() {
        assert!(Palette::parse("[]").is_err());
        assert!(Palette::parse("[[1,2]]").is_err());
        assert!(Palette::parse("[[256,0,0]]").is_err());
    }

    #[test]
    fn seeded_choice_is_reproducible() {
        let palette = Palette::default();
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..8).map(|_| palette.choose(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(pick(42), pick(42));
        assert!(pick(42).iter().all(|c| palette.colors().contains(c)));
    }
}
