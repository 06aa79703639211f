// Typed resource services over the authenticated request helpers.
// Each operation is a parameterized read of one connectapi endpoint into a
// serde record; all protocol concerns live in the client.

mod user_profile;
mod user_summary;

pub use user_profile::{UserProfileBase, UserProfileService, UserSettings, UserSettingsUserData};
pub use user_summary::{
    DailySteps, DailyStepsStat, HeartRateStat, Stat, StepsAggregations, StressStat,
    UserSummaryService,
};

use std::sync::Arc;

use crate::client::Client;

/// Entry point to the per-resource services, all sharing one session.
pub struct Api {
    pub user_profile: UserProfileService,
    pub user_summary: UserSummaryService,
}

impl Api {
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            user_profile: UserProfileService::new(Arc::clone(&client)),
            user_summary: UserSummaryService::new(client),
        }
    }
}
