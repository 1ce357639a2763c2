pub mod community;
pub mod event;
pub mod user;

pub use community::{Community, CommunityChanges, NewCommunity};
pub use event::{Event, EventChanges, NewEvent};
pub use user::{NewUser, User, UserChanges, UserCredentials};
