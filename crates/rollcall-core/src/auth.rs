//! Challenge-response gate for the attendance close operation.
//!
//! When a client asks to close attendance the server sends a random 32-bit
//! challenge.  The client proves it knows the shared key by replying with
//! [`scramble`] of that challenge.
//!
//! # Security
//!
//! This is **obfuscation, not cryptography**.  The key is a fixed constant
//! compiled into every client and server, and the scramble function is a
//! cheap invertible mix.  Anyone who can read a client binary, or who records
//! one challenge/response pair, can close attendance.  It only stops a
//! casual client that does not speak the protocol from closing by accident.

/// The shared key mixed into every round.
pub const AUTH_KEY: u32 = 0x1324_3546;

/// Number of mixing rounds applied by [`scramble`].
pub const SCRAMBLE_ROUNDS: usize = 256;

/// Mixes `challenge` with [`AUTH_KEY`].
///
/// Each round XORs with the key, swaps the two 16-bit halves and adds the
/// key with 32-bit wraparound.
///
/// # Examples
///
/// ```rust
/// use rollcall_core::auth::scramble;
///
/// assert_eq!(scramble(0), 0x68C1_0771);
/// ```
pub fn scramble(challenge: u32) -> u32 {
    let mut result = challenge;
    for _ in 0..SCRAMBLE_ROUNDS {
        result ^= AUTH_KEY;
        result = result.rotate_left(16);
        result = result.wrapping_add(AUTH_KEY);
    }
    result
}

/// Draws a fresh challenge from the OS-seeded thread RNG.
pub fn generate_challenge() -> u32 {
    rand::random::<u32>()
}

/// Returns `true` if `response` is the correct answer to `challenge`.
pub fn verify_response(challenge: u32, response: u32) -> bool {
    scramble(challenge) == response
}

// ── Tests ─────────────────────────────────────────────────────────────────────
