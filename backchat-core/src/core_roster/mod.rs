//! Relationship sync engines: friendships and groups
//!
//! Both engines keep whole collections observable and reload them
//! wholesale on any relevant change event, rather than merging
//! individual events into local state.

pub mod friends;
pub mod groups;
pub mod view;

#[cfg(test)]
mod tests;

pub use friends::FriendsEngine;
pub use groups::GroupsEngine;
pub use view::{FriendRequestView, FriendView, GroupMemberView, GroupView};
