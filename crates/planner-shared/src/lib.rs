use serde::{
  Deserialize,
  Serialize
};

/// Row shape returned by the task
/// listing endpoints. `completed` stays
/// numeric (0/1) on the wire.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskRow {
  #[serde(default)]
  pub id:           Option<i64>,
  #[serde(default)]
  pub user_email:   Option<String>,
  #[serde(default)]
  pub planner_type: Option<String>,
  pub task_id:      i64,
  pub text:         String,
  pub completed:    i64,
  pub date:         String,
  pub time:         String,
  pub minutes:      Option<f64>,
  pub time_value:   Option<i64>,
  pub time_unit:    Option<String>,
  pub time_display: Option<String>,
  pub subject:      Option<String>,
  #[serde(default)]
  pub created_at:   Option<String>
}

impl TaskRow {
  pub fn is_completed(&self) -> bool {
    self.completed != 0
  }
}

/// Task shape sent by the client on a
/// full-replace save.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
  pub id:           i64,
  pub text:         String,
  #[serde(default)]
  pub completed:    bool,
  pub date:         String,
  pub time:         String,
  #[serde(default)]
  pub minutes:      Option<f64>,
  #[serde(default)]
  pub time_value:   Option<i64>,
  #[serde(default)]
  pub time_unit:    Option<String>,
  #[serde(default)]
  pub time_display: Option<String>,
  #[serde(default)]
  pub subject:      Option<String>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct SaveTasksRequest {
  #[serde(default)]
  pub email:        Option<String>,
  #[serde(default, rename = "type")]
  pub planner_type: Option<String>,
  #[serde(default)]
  pub tasks:        Option<Vec<TaskPayload>>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct StatusResponse {
  pub success: bool,
  pub message: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ErrorResponse {
  pub error: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct RegisterRequest {
  #[serde(default)]
  pub name:     String,
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct UserSummary {
  pub name:  String,
  pub email: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct RegisterResponse {
  pub success: bool,
  pub message: String,
  pub user:    UserSummary
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct LoginRequest {
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
  pub name:     String,
  pub email:    String,
  pub is_admin: bool
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct LoginResponse {
  pub success: bool,
  pub user:    LoginUser
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct AdminUserRow {
  pub id:         i64,
  pub name:       String,
  pub email:      String,
  pub created_at: String
}
