//! Deterministic key prefix allocation.
//!
//! A prefix is the upper-cased first letter of the kind name followed by
//! successive letters of the key's source field: `Command` keyed on
//! `command_id` tries `CC`, then `CCO`, then `CCOM`. When all of those are
//! taken, the first two letters are suffixed with a letter code derived from
//! the registration index until a free prefix turns up.
//!
//! The result depends only on the sequence of allocations made against one
//! allocator, so replaying the same registrations yields the same prefixes.

use std::collections::{HashMap, HashSet};

use super::{KeyRole, MapperError, Result};

/// Longest prefix the allocator will produce.
pub const MAX_PREFIX_LEN: usize = 4;

/// Number of suffixed candidates tried before giving up.
pub const MAX_PREFIX_ATTEMPTS: usize = 128;

/// Fallback letter for names without any ASCII letter.
const FILLER: char = 'X';

/// Prefix bookkeeping for one table.
#[derive(Debug, Clone, Default)]
pub struct PrefixAllocator {
    assigned: HashMap<(String, String, KeyRole), String>,
    in_use: HashMap<KeyRole, HashSet<String>>,
}

impl PrefixAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the prefix for `kind`'s `role` key sourced from `field`.
    ///
    /// Allocating the same (kind, field, role) twice returns the first result.
    pub fn allocate(
        &mut self,
        kind: &str,
        field: &str,
        role: KeyRole,
        registration_index: usize,
    ) -> Result<String> {
        let memo = (kind.to_string(), field.to_string(), role);
        if let Some(prefix) = self.assigned.get(&memo) {
            return Ok(prefix.clone());
        }

        let prefix = candidates(kind, field, registration_index)
            .find(|candidate| !self.is_taken(role, candidate))
            .ok_or_else(|| MapperError::PrefixExhausted {
                kind: kind.to_string(),
                field: field.to_string(),
                role,
                attempts: MAX_PREFIX_ATTEMPTS,
            })?;

        self.reserve(role, &prefix);
        self.assigned.insert(memo, prefix.clone());
        Ok(prefix)
    }

    /// Records an explicit `prefix` for `kind`'s `role` key sourced from
    /// `field`.
    ///
    /// Returns `false` when a different key already holds the prefix for
    /// this role. Claiming the same prefix for the same key again succeeds.
    pub fn claim(&mut self, kind: &str, field: &str, role: KeyRole, prefix: &str) -> bool {
        let memo = (kind.to_string(), field.to_string(), role);
        if self.assigned.get(&memo).is_some_and(|held| held == prefix) {
            return true;
        }
        if self.is_taken(role, prefix) {
            return false;
        }

        self.reserve(role, prefix);
        self.assigned.insert(memo, prefix.to_string());
        true
    }

    /// Marks `prefix` as used for `role` so later allocations avoid it.
    pub fn reserve(&mut self, role: KeyRole, prefix: &str) {
        self.in_use.entry(role).or_default().insert(prefix.to_string());
    }

    pub fn is_taken(&self, role: KeyRole, prefix: &str) -> bool {
        self.in_use
            .get(&role)
            .is_some_and(|used| used.contains(prefix))
    }
}

fn candidates(
    kind: &str,
    field: &str,
    registration_index: usize,
) -> impl Iterator<Item = String> {
    let head = letters(kind).next().unwrap_or(FILLER);
    let mut tail: Vec<char> = letters(field).take(MAX_PREFIX_LEN - 1).collect();
    if tail.is_empty() {
        tail.push(FILLER);
    }

    let base: Vec<String> = (1..=tail.len())
        .map(|len| std::iter::once(head).chain(tail[..len].iter().copied()).collect())
        .collect();
    let stem: String = std::iter::once(head).chain(tail.first().copied()).collect();

    let suffixed = (0..MAX_PREFIX_ATTEMPTS)
        .map(move |attempt| format!("{stem}{}", letter_code(registration_index + attempt)))
        .take_while(|candidate| candidate.len() <= MAX_PREFIX_LEN);

    base.into_iter().chain(suffixed)
}

fn letters(name: &str) -> impl Iterator<Item = char> + '_ {
    name.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
}

/// Bijective base-26 letters: 0 is `A`, 25 is `Z`, 26 is `AA`.
fn letter_code(mut n: usize) -> String {
    let mut code = Vec::new();
    loop {
        code.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    code.reverse();
    String::from_utf8(code).unwrap_or_default()
}
