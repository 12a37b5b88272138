//! User account handlers.

mod get_current_user;
mod sync_user;
mod update_profile;

pub use get_current_user::{CurrentUserView, GetCurrentUserHandler, GetCurrentUserQuery};
pub use sync_user::{SyncUserCommand, SyncUserHandler, SyncUserResult};
pub use update_profile::{UpdateProfileCommand, UpdateProfileHandler};
