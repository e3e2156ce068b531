use planner_shared::{
    AdminUserRow, LoginRequest, LoginResponse, LoginUser, RegisterRequest, RegisterResponse,
    SaveTasksRequest, StatusResponse, TaskPayload, TaskRow, UserSummary,
};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::{debug, info, instrument};

use crate::auth::{AuthError, hash_password, verify_password};
use crate::config::AdminSeed;
use crate::db::DbPool;
use crate::error::ApiError;

const TASK_COLUMNS: &str = "id, user_email, planner_type, task_id, text, completed, date, time, \
     minutes, time_value, time_unit, time_display, subject, created_at";

/// Shared handle over the database. Every method is blocking and is run
/// off the async executor by the route handlers.
#[derive(Clone)]
pub struct AppState {
    pool: DbPool,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, ApiError> {
        self.pool.get().map_err(ApiError::internal("Server error"))
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        if [&req.name, &req.email, &req.password]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(AuthError::MissingFields.into());
        }

        let conn = self.conn()?;
        if find_user(&conn, &req.email)
            .map_err(ApiError::internal("Server error"))?
            .is_some()
        {
            return Err(AuthError::DuplicateEmail.into());
        }

        let hashed = hash_password(&req.password).map_err(ApiError::internal("Server error"))?;
        match conn.execute(
            "INSERT INTO users (name, email, password) VALUES (?1, ?2, ?3)",
            params![req.name, req.email, hashed],
        ) {
            Ok(_) => {}
            Err(err) if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                return Err(AuthError::DuplicateEmail.into());
            }
            Err(err) => return Err(ApiError::internal("Error creating user")(err)),
        }

        info!("user registered");
        Ok(RegisterResponse {
            success: true,
            message: "User created successfully".to_string(),
            user: UserSummary {
                name: req.name.clone(),
                email: req.email.clone(),
            },
        })
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(AuthError::MissingCredentials.into());
        }

        let conn = self.conn()?;
        let user = find_user(&conn, &req.email)
            .map_err(ApiError::internal("Server error"))?
            .ok_or(AuthError::EmailNotFound)?;
        let valid = verify_password(&req.password, &user.password_hash)
            .map_err(ApiError::internal("Server error"))?;
        if !valid {
            return Err(AuthError::WrongPassword.into());
        }

        info!(is_admin = user.is_admin, "user logged in");
        Ok(LoginResponse {
            success: true,
            user: LoginUser {
                name: user.name,
                email: user.email,
                is_admin: user.is_admin,
            },
        })
    }

    #[instrument(skip(self))]
    pub fn tasks(&self, email: &str, planner_type: &str) -> Result<Vec<TaskRow>, ApiError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_email = ?1 AND planner_type = ?2 \
             ORDER BY date DESC, id ASC"
        );
        let rows = query_tasks(&conn, &sql, params![email, planner_type])
            .map_err(ApiError::internal("Error fetching tasks"))?;
        debug!(count = rows.len(), "fetched partition");
        Ok(rows)
    }

    /// Replaces the whole (user, planner) partition in one transaction.
    #[instrument(skip(self, req), fields(email = ?req.email, planner_type = ?req.planner_type))]
    pub fn save_tasks(&self, req: SaveTasksRequest) -> Result<StatusResponse, ApiError> {
        let (Some(email), Some(planner_type), Some(tasks)) =
            (req.email, req.planner_type, req.tasks)
        else {
            return Err(ApiError::bad_request("Incomplete data"));
        };
        if email.is_empty() || planner_type.is_empty() {
            return Err(ApiError::bad_request("Incomplete data"));
        }

        let mut conn = self.conn()?;
        let count = replace_partition(&mut conn, &email, &planner_type, &tasks)
            .map_err(ApiError::internal("Error saving tasks"))?;
        info!(count, "saved partition");

        Ok(StatusResponse {
            success: true,
            message: "Tasks saved successfully".to_string(),
        })
    }

    #[instrument(skip(self))]
    pub fn users(&self) -> Result<Vec<AdminUserRow>, ApiError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name, email, created_at FROM users ORDER BY id")
            .map_err(ApiError::internal("Error fetching users"))?;
        let users = stmt
            .query_map([], |row| {
                Ok(AdminUserRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(ApiError::internal("Error fetching users"))?;
        Ok(users)
    }

    #[instrument(skip(self))]
    pub fn user_tasks(&self, email: &str) -> Result<Vec<TaskRow>, ApiError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_email = ?1 ORDER BY date DESC, id ASC"
        );
        query_tasks(&conn, &sql, params![email]).map_err(ApiError::internal("Error fetching tasks"))
    }

    /// Deletes the user's tasks, then the user.
    #[instrument(skip(self))]
    pub fn delete_user(&self, email: &str) -> Result<StatusResponse, ApiError> {
        let mut conn = self.conn()?;
        let (tasks, users) = delete_user_rows(&mut conn, email)
            .map_err(ApiError::internal("Error deleting user"))?;
        if users == 0 {
            return Err(ApiError::not_found("User not found"));
        }

        info!(tasks, "user deleted");
        Ok(StatusResponse {
            success: true,
            message: "User deleted successfully".to_string(),
        })
    }

    /// Creates the configured administrator unless the email is taken.
    #[instrument(skip(self, seed), fields(email = %seed.email))]
    pub fn seed_admin(&self, seed: &AdminSeed) -> anyhow::Result<bool> {
        let conn = self.pool.get()?;
        if find_user(&conn, &seed.email)?.is_some() {
            debug!("admin already present");
            return Ok(false);
        }
        let hashed = hash_password(&seed.password)?;
        conn.execute(
            "INSERT INTO users (name, email, password, is_admin) VALUES (?1, ?2, ?3, 1)",
            params![seed.name, seed.email, hashed],
        )?;
        info!("default admin created");
        Ok(true)
    }
}

struct StoredUser {
    name: String,
    email: String,
    password_hash: String,
    is_admin: bool,
}

fn find_user(conn: &Connection, email: &str) -> rusqlite::Result<Option<StoredUser>> {
    conn.query_row(
        "SELECT name, email, password, is_admin FROM users WHERE email = ?1",
        params![email],
        |row| {
            Ok(StoredUser {
                name: row.get(0)?,
                email: row.get(1)?,
                password_hash: row.get(2)?,
                is_admin: row.get::<_, i64>(3)? == 1,
            })
        },
    )
    .optional()
}

fn task_row(row: &Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        user_email: row.get(1)?,
        planner_type: row.get(2)?,
        task_id: row.get(3)?,
        text: row.get(4)?,
        completed: row.get(5)?,
        date: row.get(6)?,
        time: row.get(7)?,
        minutes: row.get(8)?,
        time_value: row.get(9)?,
        time_unit: row.get(10)?,
        time_display: row.get(11)?,
        subject: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn query_tasks(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<TaskRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, task_row)?;
    rows.collect()
}

fn replace_partition(
    conn: &mut Connection,
    email: &str,
    planner_type: &str,
    tasks: &[TaskPayload],
) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM tasks WHERE user_email = ?1 AND planner_type = ?2",
        params![email, planner_type],
    )?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO tasks (user_email, planner_type, task_id, text, completed, date, time, \
             minutes, time_value, time_unit, time_display, subject) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;
        for task in tasks {
            insert.execute(params![
                email,
                planner_type,
                task.id,
                task.text,
                i64::from(task.completed),
                task.date,
                task.time,
                task.minutes.filter(|m| *m != 0.0),
                task.time_value.filter(|v| *v != 0),
                non_empty(&task.time_unit),
                non_empty(&task.time_display),
                non_empty(&task.subject),
            ])?;
        }
    }
    tx.commit()?;
    Ok(tasks.len())
}

fn delete_user_rows(conn: &mut Connection, email: &str) -> rusqlite::Result<(usize, usize)> {
    let tx = conn.transaction()?;
    let tasks = tx.execute("DELETE FROM tasks WHERE user_email = ?1", params![email])?;
    let users = tx.execute("DELETE FROM users WHERE email = ?1", params![email])?;
    tx.commit()?;
    Ok((tasks, users))
}

/// Empty optional strings are stored as NULL.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
