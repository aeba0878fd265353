//! Random identifiers: participant ids and session codes.

use chit_protocol::{ParticipantId, SessionCode};
use rand::Rng;

/// Characters a session code is drawn from.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a session code.
pub const SESSION_CODE_LEN: usize = 4;

/// Generates a random 32-character hex participant id (128 bits).
pub fn generate_participant_id() -> ParticipantId {
    let bytes: [u8; 16] = rand::rng().random();
    ParticipantId::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

/// Generates a random four-character session code from `A-Z0-9`.
///
/// Codes are short enough to read aloud, so collisions are possible;
/// [`SessionRegistry::create_unique`](crate::SessionRegistry::create_unique)
/// retries until it finds a free one.
pub fn generate_session_code<R: Rng + ?Sized>(rng: &mut R) -> SessionCode {
    let code: String = (0..SESSION_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            char::from(CODE_ALPHABET[idx])
        })
        .collect();
    SessionCode::new(code)
}
