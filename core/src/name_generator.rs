//! Deterministic display-name generation for seeded users.
//!
//! Same RNG stream position = same name, so a re-run with the same seed
//! rewrites every user with identical names.

use crate::rng::StreamRng;

/// Given/family name pair for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub first: &'static str,
    pub last: &'static str,
}

impl PersonName {
    pub fn display(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

pub struct NameGenerator;

impl NameGenerator {
    pub fn generate(rng: &mut StreamRng) -> PersonName {
        PersonName {
            first: Self::pick(rng, FIRST_NAMES),
            last: Self::pick(rng, LAST_NAMES),
        }
    }

    fn pick(rng: &mut StreamRng, names: &'static [&'static str]) -> &'static str {
        names[rng.next_u64_below(names.len() as u64) as usize]
    }
}

const FIRST_NAMES: &[&str] = &[
    "Haruto", "Sota", "Yuto", "Riku", "Minato", "Ren", "Daiki", "Kaito", "Takumi", "Hiroshi",
    "Kenji", "Takeshi", "Satoshi", "Kazuya", "Shota", "Yusuke", "Ryo", "Taro", "Ichiro", "Makoto",
    "Yui", "Hina", "Aoi", "Sakura", "Mei", "Yuna", "Rin", "Akari", "Emi", "Haruka",
    "Yoko", "Keiko", "Naomi", "Ayaka", "Misaki", "Nanami", "Kana", "Saki", "Yuka", "Tomoko",
];

const LAST_NAMES: &[&str] = &[
    "Sato", "Suzuki", "Takahashi", "Tanaka", "Watanabe", "Ito", "Yamamoto", "Nakamura",
    "Kobayashi", "Kato", "Yoshida", "Yamada", "Sasaki", "Yamaguchi", "Matsumoto", "Inoue",
    "Kimura", "Hayashi", "Shimizu", "Yamazaki", "Mori", "Abe", "Ikeda", "Hashimoto",
    "Ishikawa", "Ogawa", "Okada", "Goto", "Hasegawa", "Murakami",
];
