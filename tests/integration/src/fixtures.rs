//! Test fixtures
//!
//! Three users and two conversations: a direct conversation between alice
//! and bob, and a group that also includes carol.

use chat_core::{Conversation, Profile, Snowflake};
use chat_db::MemoryBackend;

pub const ALICE: Snowflake = Snowflake::new(1001);
pub const BOB: Snowflake = Snowflake::new(1002);
pub const CAROL: Snowflake = Snowflake::new(1003);
/// Unknown to the directory
pub const GHOST: Snowflake = Snowflake::new(1999);

/// alice and bob
pub const DIRECT: Snowflake = Snowflake::new(5001);
/// alice, bob and carol
pub const GROUP: Snowflake = Snowflake::new(5002);

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Populate `backend` with the fixture users and conversations
pub fn seed(backend: &MemoryBackend) {
    backend.insert_user(Profile::new(ALICE, "alice"));
    backend.insert_user(Profile::new(BOB, "bob"));
    backend.insert_user(Profile::new(CAROL, "carol"));

    backend.insert_conversation(Conversation::direct(DIRECT, ALICE, BOB));
    backend.insert_conversation(Conversation::group(GROUP, "team", vec![ALICE, BOB, CAROL]));
}
