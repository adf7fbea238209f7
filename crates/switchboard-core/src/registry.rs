//! Connection registry: groups of named worker members.
//!
//! Two levels of maps guarded by short, never-awaited lock sections:
//! group name to group, member name to member. Group creation is
//! get-or-create under the write lock so two concurrent registrations can
//! never produce duplicate groups.

use crate::config::DispatchConfig;
use crate::member::Member;
use crate::pattern;
use crate::wire::MemberStatus;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

struct Group {
    name: String,
    members: RwLock<HashMap<String, Arc<Member>>>,
}

impl Group {
    fn new(name: &str) -> Self {
        Group {
            name: name.to_owned(),
            members: RwLock::new(HashMap::new()),
        }
    }
}

/// Registry of all connected workers, keyed by `(group, name)`.
#[derive(Default)]
pub struct Registry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a member, creating its group on first use. A member already
    /// registered under the same name is replaced; the old one is left to
    /// die with its socket and its in-flight calls time out.
    pub fn insert(&self, group_name: &str, member_name: &str, member: Arc<Member>) {
        let group = {
            let mut groups = self.groups.write().expect("registry lock poisoned");
            Arc::clone(
                groups
                    .entry(group_name.to_owned())
                    .or_insert_with(|| Arc::new(Group::new(group_name))),
            )
        };
        let previous = group
            .members
            .write()
            .expect("group lock poisoned")
            .insert(member_name.to_owned(), member);
        if previous.is_some() {
            info!(
                "replacing existing worker connection {}/{}",
                group_name, member_name
            );
        }
    }

    /// Look up a member by its literal name.
    pub fn lookup_exact(&self, group_name: &str, member_name: &str) -> Option<Arc<Member>> {
        let group = self
            .groups
            .read()
            .expect("registry lock poisoned")
            .get(group_name)
            .cloned()?;
        let member = group
            .members
            .read()
            .expect("group lock poisoned")
            .get(member_name)
            .cloned();
        member
    }

    /// Select a member whose name matches the glob pattern. The first match
    /// at or below the fast-path load wins outright; otherwise the least
    /// loaded match seen during the scan does (first seen on ties). Map
    /// iteration order is unspecified, which doubles as load spreading.
    pub fn lookup_glob(&self, group_name: &str, rule: &str) -> Option<Arc<Member>> {
        let group = self
            .groups
            .read()
            .expect("registry lock poisoned")
            .get(group_name)
            .cloned()?;
        let members = group.members.read().expect("group lock poisoned");

        let mut best: Option<Arc<Member>> = None;
        for (name, member) in members.iter() {
            if !pattern::matches(rule, name) {
                continue;
            }
            if member.waiting() <= DispatchConfig::FAST_PATH_WAITING {
                return Some(Arc::clone(member));
            }
            match &best {
                Some(current) if member.waiting() >= current.waiting() => {}
                _ => best = Some(Arc::clone(member)),
            }
        }
        best
    }

    /// Deregister a member, but only if `member` is still the one mapped
    /// under that name - a replaced member tearing down late must not evict
    /// its replacement. The group is pruned once empty; an insert racing
    /// the emptiness check may leave a briefly empty group behind, which
    /// the next removal prunes.
    pub fn remove(&self, group_name: &str, member_name: &str, member: &Arc<Member>) {
        let Some(group) = self
            .groups
            .read()
            .expect("registry lock poisoned")
            .get(group_name)
            .cloned()
        else {
            return;
        };

        {
            let mut members = group.members.write().expect("group lock poisoned");
            match members.get(member_name) {
                Some(current) if Arc::ptr_eq(current, member) => {
                    members.remove(member_name);
                }
                _ => return,
            }
        }

        if group.members.read().expect("group lock poisoned").is_empty() {
            let mut groups = self.groups.write().expect("registry lock poisoned");
            let still_empty = groups
                .get(group_name)
                .map_or(false, |g| g.members.read().expect("group lock poisoned").is_empty());
            if still_empty {
                groups.remove(group_name);
                debug!("group {} is empty, pruned", group_name);
            }
        }
    }

    /// Snapshot of every member's counters, shaped for the `/list`
    /// endpoint: `{group: {member: {status, sendNumber, waiting}}}`.
    pub fn snapshot(&self) -> HashMap<String, HashMap<String, MemberStatus>> {
        let groups: Vec<Arc<Group>> = self
            .groups
            .read()
            .expect("registry lock poisoned")
            .values()
            .cloned()
            .collect();

        let mut listing = HashMap::new();
        for group in groups {
            let members = group.members.read().expect("group lock poisoned");
            if members.is_empty() {
                continue;
            }
            let rows: &mut HashMap<String, MemberStatus> =
                listing.entry(group.name.clone()).or_default();
            for (name, member) in members.iter() {
                rows.insert(
                    name.clone(),
                    MemberStatus {
                        status: "ok",
                        send_number: member.send_num(),
                        waiting: member.waiting(),
                    },
                );
            }
        }
        listing
    }
}
