//! Group sync engine
//!
//! Whole-collection reload like the friends engine, plus the group
//! permission rules enforced locally before a mutation is attempted:
//!
//! - delete group, change roles: creator only
//! - update group, add/remove members: creator or admin
//! - leaving (removing yourself) bypasses all checks
//! - the creator's own role is immutable and the creator can only be
//!   removed by themselves
//!
//! The remote store is expected to enforce the same rules again.

use super::view::{GroupMemberView, GroupView};
use crate::core_gateway::{tables, Filter, GatewayError, StoreGateway, SubscribeSpec, SubscriptionHandle};
use crate::core_model::{Group, GroupId, GroupMembership, GroupRole, Timestamp, UserId, UserProfile};
use crate::core_session::SessionContext;
use crate::core_sync::{ObservableState, SyncError, SyncResult};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type LiveSubs = Vec<(SubscriptionHandle, JoinHandle<()>)>;

struct GroupsInner {
    gateway: Arc<dyn StoreGateway>,
    session: Arc<SessionContext>,
    groups: ObservableState<Vec<GroupView>>,
    live: Mutex<LiveSubs>,
}

/// Sync engine for group membership and administration
#[derive(Clone)]
pub struct GroupsEngine {
    inner: Arc<GroupsInner>,
}

impl GroupsEngine {
    pub fn new(gateway: Arc<dyn StoreGateway>, session: Arc<SessionContext>) -> Self {
        GroupsEngine {
            inner: Arc::new(GroupsInner {
                gateway,
                session,
                groups: ObservableState::new(Vec::new()),
                live: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn groups(&self) -> Vec<GroupView> {
        self.inner.groups.get()
    }

    pub fn watch_groups(&self) -> watch::Receiver<Vec<GroupView>> {
        self.inner.groups.watch()
    }

    /// Reload the viewer's group list from their membership rows
    pub async fn load_groups(&self) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let rows = self
            .inner
            .gateway
            .query(
                tables::GROUP_MEMBERS,
                Filter::eq("user_id", me.id.as_str()),
                None,
                None,
            )
            .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let membership: GroupMembership = match serde_json::from_value(row) {
                Ok(membership) => membership,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed membership row");
                    continue;
                }
            };
            let group = match self.fetch_group(&membership.group_id).await {
                Ok(group) => group,
                Err(e) => {
                    warn!(group_id = %membership.group_id, error = %e, "Skipping membership with missing group");
                    continue;
                }
            };
            views.push(GroupView::from_parts(&me.id, group, &membership));
        }
        views.sort_by(|a, b| a.group.name.cmp(&b.group.name));
        self.inner.groups.replace(views);
        Ok(())
    }

    /// Load the group list and start watching the viewer's memberships
    pub async fn subscribe(&self) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let mut live = self.inner.live.lock().await;
        self.teardown(&mut live).await;

        self.load_groups().await?;

        let sub = self
            .inner
            .gateway
            .subscribe(SubscribeSpec::all_changes(
                tables::GROUP_MEMBERS,
                Filter::eq("user_id", me.id.as_str()),
            ))
            .await?;
        let engine = self.clone();
        let mut events = sub.events;
        let task = tokio::spawn(async move {
            while events.recv().await.is_some() {
                if let Err(e) = engine.load_groups().await {
                    warn!(error = %e, "Group list reload failed");
                }
            }
        });
        live.push((sub.handle, task));
        info!(user_id = %me.id, "Group sync started");
        Ok(())
    }

    pub async fn group_info(&self, group_id: &GroupId) -> SyncResult<Group> {
        self.inner.session.require_user()?;
        Ok(self.fetch_group(group_id).await?)
    }

    /// Member list with profiles resolved where available
    pub async fn group_members(&self, group_id: &GroupId) -> SyncResult<Vec<GroupMemberView>> {
        self.inner.session.require_user()?;
        let rows = self
            .inner
            .gateway
            .query(
                tables::GROUP_MEMBERS,
                Filter::eq("group_id", group_id.as_str()),
                None,
                None,
            )
            .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let membership: GroupMembership = match serde_json::from_value(row) {
                Ok(membership) => membership,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed membership row");
                    continue;
                }
            };
            let profile = self.lookup_profile(&membership.user_id).await;
            views.push(GroupMemberView { membership, profile });
        }
        Ok(views)
    }

    /// Create a group; the creator joins immediately as admin
    pub async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> SyncResult<Group> {
        let me = self.inner.session.require_user()?;
        if name.trim().is_empty() {
            return Err(SyncError::validation("group name is empty"));
        }

        let record = json!({
            "name": name.trim(),
            "description": description,
            "creator_id": me.id,
            "created_at": Timestamp::now(),
        });
        let row = self.inner.gateway.insert(tables::GROUPS, record).await?;
        let group: Group = serde_json::from_value(row)?;

        let membership = json!({
            "group_id": group.id,
            "user_id": me.id,
            "role": GroupRole::Admin,
            "joined_at": Timestamp::now(),
        });
        self.inner
            .gateway
            .insert(tables::GROUP_MEMBERS, membership)
            .await?;
        info!(group_id = %group.id, name = %group.name, "Group created");
        Ok(group)
    }

    /// Rename or re-describe a group (creator or admin)
    pub async fn update_group(
        &self,
        group_id: &GroupId,
        name: &str,
        description: Option<&str>,
    ) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        if name.trim().is_empty() {
            return Err(SyncError::validation("group name is empty"));
        }
        let group = self.fetch_group(group_id).await?;
        self.require_admin_or_creator(&group, &me.id).await?;

        self.inner
            .gateway
            .update(
                tables::GROUPS,
                Filter::eq("id", group_id.as_str()),
                json!({ "name": name.trim(), "description": description }),
            )
            .await?;
        info!(group_id = %group_id, "Group updated");
        Ok(())
    }

    /// Delete a group and its membership rows (creator only)
    pub async fn delete_group(&self, group_id: &GroupId) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let group = self.fetch_group(group_id).await?;
        if !group.is_creator(&me.id) {
            return Err(SyncError::permission("only the creator can delete a group"));
        }

        self.inner
            .gateway
            .delete(
                tables::GROUP_MEMBERS,
                Filter::eq("group_id", group_id.as_str()),
            )
            .await?;
        self.inner
            .gateway
            .delete(tables::GROUPS, Filter::eq("id", group_id.as_str()))
            .await?;
        info!(group_id = %group_id, "Group deleted");
        Ok(())
    }

    /// Add a member (creator or admin; duplicate membership is a conflict)
    pub async fn add_member(&self, group_id: &GroupId, user: &UserId) -> SyncResult<GroupMembership> {
        let me = self.inner.session.require_user()?;
        let group = self.fetch_group(group_id).await?;
        self.require_admin_or_creator(&group, &me.id).await?;

        if self.membership_of(group_id, user).await?.is_some() {
            return Err(SyncError::conflict("user is already a member"));
        }

        let record = json!({
            "group_id": group_id,
            "user_id": user,
            "role": GroupRole::Member,
            "joined_at": Timestamp::now(),
        });
        let row = self
            .inner
            .gateway
            .insert(tables::GROUP_MEMBERS, record)
            .await?;
        let membership: GroupMembership = serde_json::from_value(row)?;
        info!(group_id = %group_id, user_id = %user, "Member added");
        Ok(membership)
    }

    /// Remove a member
    ///
    /// Removing yourself (leaving) needs no permission at all. Removing
    /// anyone else needs creator or admin, and the creator can never be
    /// removed by someone else.
    pub async fn remove_member(&self, group_id: &GroupId, user: &UserId) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        if &me.id != user {
            let group = self.fetch_group(group_id).await?;
            self.require_admin_or_creator(&group, &me.id).await?;
            if group.is_creator(user) {
                return Err(SyncError::permission("the creator cannot be removed"));
            }
        }

        self.inner
            .gateway
            .delete(tables::GROUP_MEMBERS, member_filter(group_id, user))
            .await?;
        info!(group_id = %group_id, user_id = %user, "Member removed");
        Ok(())
    }

    /// Change a member's role (creator only; the creator's own role is
    /// immutable no matter who asks)
    pub async fn change_member_role(
        &self,
        group_id: &GroupId,
        user: &UserId,
        role: GroupRole,
    ) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let group = self.fetch_group(group_id).await?;
        if group.is_creator(user) {
            return Err(SyncError::permission("the creator's role cannot be changed"));
        }
        if !group.is_creator(&me.id) {
            return Err(SyncError::permission("only the creator can change roles"));
        }

        let updated = self
            .inner
            .gateway
            .update(
                tables::GROUP_MEMBERS,
                member_filter(group_id, user),
                json!({ "role": role }),
            )
            .await?;
        if updated.is_empty() {
            return Err(GatewayError::NotFound(format!(
                "no membership for {} in {}",
                user, group_id
            ))
            .into());
        }
        info!(group_id = %group_id, user_id = %user, ?role, "Member role changed");
        Ok(())
    }

    /// Stop watching and clear local state (used on sign-out)
    pub async fn close(&self) {
        let mut live = self.inner.live.lock().await;
        self.teardown(&mut live).await;
        self.inner.groups.replace(Vec::new());
        info!("Group sync stopped");
    }

    async fn teardown(&self, live: &mut LiveSubs) {
        for (handle, task) in live.drain(..) {
            task.abort();
            if let Err(e) = self.inner.gateway.unsubscribe(handle).await {
                debug!(error = %e, "Unsubscribe during teardown failed");
            }
        }
    }

    async fn fetch_group(&self, group_id: &GroupId) -> Result<Group, GatewayError> {
        let rows = self
            .inner
            .gateway
            .query(
                tables::GROUPS,
                Filter::eq("id", group_id.as_str()),
                None,
                Some(1),
            )
            .await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(format!("group {}", group_id)))?;
        serde_json::from_value(row).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn membership_of(
        &self,
        group_id: &GroupId,
        user: &UserId,
    ) -> SyncResult<Option<GroupMembership>> {
        let rows = self
            .inner
            .gateway
            .query(
                tables::GROUP_MEMBERS,
                member_filter(group_id, user),
                None,
                Some(1),
            )
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn require_admin_or_creator(&self, group: &Group, actor: &UserId) -> SyncResult<()> {
        if group.is_creator(actor) {
            return Ok(());
        }
        match self.membership_of(&group.id, actor).await? {
            Some(membership) if membership.is_admin() => Ok(()),
            _ => Err(SyncError::permission(
                "requires the group creator or an admin",
            )),
        }
    }

    async fn lookup_profile(&self, user: &UserId) -> Option<UserProfile> {
        let rows = match self
            .inner
            .gateway
            .query(tables::USERS, Filter::eq("id", user.as_str()), None, Some(1))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(user_id = %user, error = %e, "Profile lookup failed");
                return None;
            }
        };
        let row = rows.into_iter().next()?;
        match serde_json::from_value(row) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(user_id = %user, error = %e, "Profile row malformed");
                None
            }
        }
    }
}

fn member_filter(group_id: &GroupId, user: &UserId) -> Filter {
    Filter::and(vec![
        Filter::eq("group_id", group_id.as_str()),
        Filter::eq("user_id", user.as_str()),
    ])
}
