//! The closed set of action types a rule graph may reference.

use serde::{Deserialize, Serialize};

/// What an action node does.
///
/// Adding a new action only extends this enum and the handler registry; the
/// traversal never matches on individual action types except for the
/// engine-intrinsic [`ActionType::StopExecution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AddTag,
    RemoveTag,
    SetCategory,
    SetCostCenter,
    CreateTransaction,
    UpdateDescription,
    SendEmail,
    SendPushNotification,
    /// Halts the whole traversal. Handled by the engine itself.
    StopExecution,
}

impl ActionType {
    /// Every action type, in declaration order.
    pub const ALL: [ActionType; 9] = [
        Self::AddTag,
        Self::RemoveTag,
        Self::SetCategory,
        Self::SetCostCenter,
        Self::CreateTransaction,
        Self::UpdateDescription,
        Self::SendEmail,
        Self::SendPushNotification,
        Self::StopExecution,
    ];

    /// `true` for actions the engine executes without an external handler.
    pub fn is_intrinsic(&self) -> bool {
        matches!(self, Self::StopExecution)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddTag               => "add_tag",
            Self::RemoveTag            => "remove_tag",
            Self::SetCategory          => "set_category",
            Self::SetCostCenter        => "set_cost_center",
            Self::CreateTransaction    => "create_transaction",
            Self::UpdateDescription    => "update_description",
            Self::SendEmail            => "send_email",
            Self::SendPushNotification => "send_push_notification",
            Self::StopExecution        => "stop_execution",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown action type: {s}"))
    }
}
