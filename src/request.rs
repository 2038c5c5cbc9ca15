use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::SystemTime;

/// Tables are numbered 1..=table_count; 0 is never a valid id.
pub type TableId = u8;

/// Everything a guest might want from an overworked server.
pub const REQUEST_PHRASES: [&str; 24] = [
    "needs more water",
    "needs a new napkin",
    "dropped their utensils",
    "wants to order wine",
    "needs to order dinner",
    "needs to order an appetizer",
    "wants a side of ketchup",
    "is wondering where their food is",
    "wants to turn the AC on",
    "wants to turn the AC down",
    "wants to speak to the chef",
    "changed their mind about their order",
    "wants gluten-free bread",
    "needs emotional support",
    "spilled their drink all over the menu",
    "is arguing about the bill already",
    "wants you to sing 'Happy Birthday'",
    "needs a photo taken",
    "needs you to fix the WiFi",
    "wants to see the dessert menu",
    "needs directions to the bathroom",
    "wants to split the bill 8 ways",
    "wants to return half of their sandwich",
    "needs a to-go box",
];

/// A single service request. Immutable once created; identity is the
/// (table, created_at) pairing, since the same table can ask again later.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub table: TableId,
    pub text: &'static str,
    pub created_at: SystemTime,
}

impl Request {
    /// Age of the request at `now`. Zero if the clock went backwards.
    pub fn age(&self, now: SystemTime) -> std::time::Duration {
        now.duration_since(self.created_at).unwrap_or_default()
    }
}

/// Produces random (table, phrase) pairs. Duplicates are allowed; there is
/// no uniqueness constraint across consecutive requests.
#[derive(Debug)]
pub struct RequestGenerator {
    rng: StdRng,
    table_count: u8,
}

impl RequestGenerator {
    pub fn new(table_count: u8) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            table_count,
        }
    }

    /// Deterministic generator for tests.
    pub fn seeded(table_count: u8, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            table_count,
        }
    }

    pub fn generate(&mut self, now: SystemTime) -> Request {
        let table = self.rng.gen_range(1..=self.table_count);
        let text = REQUEST_PHRASES[self.rng.gen_range(0..REQUEST_PHRASES.len())];
        Request {
            table,
            text,
            created_at: now,
        }
    }
}
