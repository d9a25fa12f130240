//! User model -> Profile mapper

use chat_core::{Profile, Snowflake};

use crate::models::UserModel;

impl From<UserModel> for Profile {
    fn from(model: UserModel) -> Self {
        Profile {
            id: Snowflake::new(model.id),
            username: model.username,
            avatar: model.avatar,
        }
    }
}
