//! The fixed score table.

use chit_protocol::Role;

/// Total points handed out by every concluded round.
pub const PRIZE_POOL: u32 = 2300;

/// Points a role earns, given whether the accuser guessed right.
///
/// | Role | correct | incorrect |
/// |---|---|---|
/// | Raja | 1000 | 1000 |
/// | Mantri | 800 | 0 |
/// | Sipahi | 500 | 500 |
/// | Chor | 0 | 800 |
pub fn score_for(role: Role, correct: bool) -> u32 {
    match (role, correct) {
        (Role::Authority, _) => 1000,
        (Role::Accuser, true) => 800,
        (Role::Accuser, false) => 0,
        (Role::Guard, _) => 500,
        (Role::Target, true) => 0,
        (Role::Target, false) => 800,
    }
}
