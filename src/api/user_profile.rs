use std::sync::Arc;

use serde::Deserialize;

use crate::client::Client;
use crate::error::Error;

pub struct UserProfileService {
    client: Arc<Client>,
}

impl UserProfileService {
    pub(crate) fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub async fn base(&self) -> Result<UserProfileBase, Error> {
        self.client
            .api_get("/userprofile-service/userprofile/userProfileBase", &[])
            .await
    }

    pub async fn settings(&self) -> Result<UserSettings, Error> {
        self.client
            .api_get("/userprofile-service/userprofile/user-settings", &[])
            .await
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileBase {
    pub user_profile_pk: i64,
    pub user_name: String,
    pub display_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub email_address: Option<String>,
    pub create_date: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub id: i64,
    pub user_data: UserSettingsUserData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsUserData {
    pub gender: Option<String>,
    /// Grams.
    pub weight: Option<f64>,
    /// Centimeters.
    pub height: Option<f64>,
    pub time_format: Option<String>,
    /// `YYYY-MM-DD`.
    pub birth_date: Option<String>,
    pub measurement_system: Option<String>,
    pub handedness: Option<String>,
    #[serde(rename = "vo2MaxRunning")]
    pub vo2_max_running: Option<f64>,
    #[serde(rename = "vo2MaxCycling")]
    pub vo2_max_cycling: Option<f64>,
}
