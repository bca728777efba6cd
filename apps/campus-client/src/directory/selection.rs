use std::collections::HashMap;

use campus_common::UserId;

use crate::directory::model::DirectoryUser;

/// A selected recipient: its record when one is known, otherwise just the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedRecipient {
    Resolved(DirectoryUser),
    Unresolved(UserId),
}

impl SelectedRecipient {
    pub fn id(&self) -> &UserId {
        match self {
            Self::Resolved(user) => user.id(),
            Self::Unresolved(id) => id,
        }
    }

    /// Chip label; unresolved recipients are shown by id.
    pub fn label(&self) -> String {
        match self {
            Self::Resolved(user) => user.display_name(),
            Self::Unresolved(id) => id.to_string(),
        }
    }
}

/// Selected user ids in selection order, plus the last record seen for each.
///
/// Records are retained so a selection survives filter changes that push the
/// user out of the current result list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    order: Vec<UserId>,
    retained: HashMap<UserId, DirectoryUser>,
}

impl SelectionSet {
    pub fn ids(&self) -> &[UserId] {
        &self.order
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.order.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Select `id` if absent, deselect it otherwise. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &UserId, record: Option<&DirectoryUser>) -> bool {
        if let Some(pos) = self.order.iter().position(|selected| selected == id) {
            self.order.remove(pos);
            self.retained.remove(id);
            false
        } else {
            self.order.push(id.clone());
            if let Some(user) = record {
                self.retained.insert(id.clone(), user.clone());
            }
            true
        }
    }

    /// Select `id` without a record (e.g. restored from a draft). No-op if already selected.
    pub fn insert(&mut self, id: UserId) {
        if !self.contains(&id) {
            self.order.push(id);
        }
    }

    /// Refresh retained records for selected users that appear in `users`.
    pub fn retain_records(&mut self, users: &[DirectoryUser]) {
        for user in users {
            if self.contains(user.id()) {
                self.retained.insert(user.id().clone(), user.clone());
            }
        }
    }

    /// Every selected id with the best record available: the current result
    /// list first, then the retained record, else id only.
    pub fn recipients(&self, current: &[DirectoryUser]) -> Vec<SelectedRecipient> {
        self.order
            .iter()
            .map(|id| {
                current
                    .iter()
                    .find(|user| user.id() == id)
                    .or_else(|| self.retained.get(id))
                    .cloned()
                    .map(SelectedRecipient::Resolved)
                    .unwrap_or_else(|| SelectedRecipient::Unresolved(id.clone()))
            })
            .collect()
    }
}
