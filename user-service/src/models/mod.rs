pub mod identity;
pub mod user;

pub use identity::{IdentityAccount, NewIdentityAccount};
pub use user::{
    normalize_email, normalize_sede, NewUser, ProfileChanges, Role, UnknownRole, UserProfile,
};
