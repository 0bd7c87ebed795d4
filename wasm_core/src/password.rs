//! Random password generation. Every selected character class is guaranteed
//! to appear, sampling is free of modulo bias, and the final sequence is
//! shuffled so the guaranteed picks do not sit at fixed positions.
use log::warn;
use serde::{Deserialize, Serialize};

use crate::fill_random;

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()-_=+[]{};:,.<>/?";
// Characters that are easy to misread in most fonts.
const AMBIGUOUS: &[char] = &['I', 'l', '1', 'O', '0'];

pub const MAX_BATCH: usize = 100;
pub const MAX_LENGTH: usize = 1024;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CharClass {
    Uppercase,
    Lowercase,
    Digits,
    Symbols,
}

impl CharClass {
    pub const ALL: [CharClass; 4] = [
        CharClass::Uppercase,
        CharClass::Lowercase,
        CharClass::Digits,
        CharClass::Symbols,
    ];

    fn alphabet(self) -> &'static str {
        match self {
            CharClass::Uppercase => UPPERCASE,
            CharClass::Lowercase => LOWERCASE,
            CharClass::Digits => DIGITS,
            CharClass::Symbols => SYMBOLS,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordRequest {
    pub length: usize,
    pub classes: Vec<CharClass>,
    pub exclude_ambiguous: bool,
}

impl Default for PasswordRequest {
    fn default() -> Self {
        Self {
            length: 16,
            classes: CharClass::ALL.to_vec(),
            exclude_ambiguous: false,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPassword {
    /// Empty when the request selects no usable characters.
    pub password: String,
    pub entropy_bits: u32,
}

/// Character pools for the selected classes, in fixed class order.
fn active_pools(request: &PasswordRequest) -> Vec<Vec<char>> {
    CharClass::ALL
        .iter()
        .filter(|class| request.classes.contains(class))
        .map(|class| {
            class
                .alphabet()
                .chars()
                .filter(|ch| !(request.exclude_ambiguous && AMBIGUOUS.contains(ch)))
                .collect::<Vec<char>>()
        })
        .filter(|pool| !pool.is_empty())
        .collect()
}

/// Requested length, capped at [`MAX_LENGTH`].
fn effective_length(request: &PasswordRequest) -> usize {
    request.length.min(MAX_LENGTH)
}

/// Uniform integer in `0..max` from the system CSPRNG.
///
/// Raw values at or above the largest multiple of `max` that fits in a u32
/// are rejected and redrawn before reducing.
pub(crate) fn random_below(max: u32) -> u32 {
    assert!(max > 0, "random_below needs a non-empty range");
    let range = u64::from(u32::MAX) + 1;
    let limit = range - range % u64::from(max);
    loop {
        let mut buf = [0u8; 4];
        fill_random(&mut buf);
        let value = u64::from(u32::from_le_bytes(buf));
        if value < limit {
            return (value % u64::from(max)) as u32;
        }
    }
}

fn pick(pool: &[char]) -> char {
    pool[random_below(pool.len() as u32) as usize]
}

/// Fisher-Yates shuffle.
fn shuffle<T>(items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = random_below(i as u32 + 1) as usize;
        items.swap(i, j);
    }
}

/// Generates one password, or an empty string for an unusable request.
///
/// The output is never shorter than the number of selected classes.
pub fn generate(request: &PasswordRequest) -> String {
    let pools = active_pools(request);
    let union: Vec<char> = pools.concat();
    if union.is_empty() {
        warn!("password request selects no usable characters");
        return String::new();
    }
    let target = effective_length(request).max(pools.len());
    let mut chars = Vec::with_capacity(target);
    for pool in &pools {
        chars.push(pick(pool));
    }
    while chars.len() < target {
        chars.push(pick(&union));
    }
    shuffle(&mut chars);
    chars.into_iter().collect()
}

/// `length * log2(pool size)`, rounded. Ignores the entropy the coverage
/// guarantee takes away.
pub fn estimate_entropy_bits(request: &PasswordRequest) -> u32 {
    let pool_size: usize = active_pools(request).iter().map(Vec::len).sum();
    if pool_size == 0 {
        return 0;
    }
    (effective_length(request) as f64 * (pool_size as f64).log2()).round() as u32
}

pub fn generate_password(request: &PasswordRequest) -> GeneratedPassword {
    GeneratedPassword {
        password: generate(request),
        entropy_bits: estimate_entropy_bits(request),
    }
}

/// Generates `count` independent passwords, clamped to `1..=MAX_BATCH`.
pub fn generate_batch(request: &PasswordRequest, count: usize) -> Vec<String> {
    let count = count.clamp(1, MAX_BATCH);
    (0..count).map(|_| generate(request)).collect()
}
