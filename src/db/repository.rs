//! Database repository for all persistence operations.
//!
//! One method per operation, using prepared statements. Dynamic list filters
//! are assembled with `QueryBuilder` so every value stays bound.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::db::timestamp;
use crate::errors::AppError;
use crate::models::{
    CalendarEvent, Category, Contribution, ContributionFilter, ContributionType,
    ContributionWithRelations, CreateCategoryRequest, CreateContributionRequest, EventFilter,
    Member, MemberRef, MemberRequest, PaymentMethod, PaymentMethodBucket, Role, Session,
    TopContributor, TypeBucket, UpdateContributionRequest, User,
};

/// Placeholder name for contributors whose member row has vanished.
const MISSING_MEMBER_NAME: &str = "\u{2014}";

const CONTRIBUTION_SELECT: &str = r#"
    SELECT c.id, c.member_id, c.category_id, c.type, c.amount, c.payment_method,
           c.date, c.description, c.notes, c.verified, c.verified_by, c.verified_at,
           c.receipt, c.created_at, c.updated_at,
           m.name AS member_name, m.email AS member_email,
           cat.name AS category_name, cat.description AS category_description,
           cat.color AS category_color, cat.icon AS category_icon,
           cat.active AS category_active, cat.created_at AS category_created_at
    FROM contributions c
    JOIN members m ON m.id = c.member_id
    JOIN categories cat ON cat.id = c.category_id
"#;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, name, role, active, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, name, role, active, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp(Utc::now());

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, active, created_at) VALUES (?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(role.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            role,
            active: true,
            created_at: now,
        })
    }

    pub async fn update_user_password(
        &self,
        id: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    pub async fn count_users(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ==================== SESSION OPERATIONS ====================

    pub async fn create_session(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(token)
        .bind(timestamp(expires_at))
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete session rows matching a presented token. Idempotent.
    pub async fn delete_sessions_by_token(&self, token: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn latest_session_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<Session>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, token, expires_at, created_at FROM sessions WHERE user_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Session {
            id: row.get("id"),
            user_id: row.get("user_id"),
            token: row.get("token"),
            expires_at: row.get("expires_at"),
            created_at: row.get("created_at"),
        }))
    }

    pub async fn count_sessions_for_user(&self, user_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ==================== ACTIVITY LOG ====================

    /// Append an audit record. Write-only; nothing ever updates or deletes
    /// these rows.
    pub async fn log_activity(
        &self,
        user_id: &str,
        action: &str,
        entity: &str,
        entity_id: &str,
        details: Option<serde_json::Value>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO activity_logs (id, user_id, action, entity, entity_id, details, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(action)
        .bind(entity)
        .bind(entity_id)
        .bind(details.map(|d| d.to_string()))
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_activity_logs(&self, action: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM activity_logs WHERE action = ?")
            .bind(action)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List members with optional substring search (name/email/phone) and
    /// active filter, newest-name-first pagination.
    pub async fn list_members(
        &self,
        search: Option<&str>,
        active: Option<bool>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Member>, i64), AppError> {
        let push_filters = |qb: &mut QueryBuilder<Sqlite>| {
            if let Some(term) = search {
                let pattern = format!("%{}%", term);
                qb.push(" AND (name LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR email LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR phone LIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
            if let Some(active) = active {
                qb.push(" AND active = ").push_bind(active as i64);
            }
        };

        let mut qb = QueryBuilder::new(
            "SELECT id, name, email, phone, address, birth_date, notes, profile_photo, active, created_at, updated_at FROM members WHERE 1=1",
        );
        push_filters(&mut qb);
        qb.push(" ORDER BY name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1) * limit);
        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) AS n FROM members WHERE 1=1");
        push_filters(&mut count_qb);
        let total: i64 = count_qb.build().fetch_one(&self.pool).await?.get("n");

        Ok((rows.iter().map(member_from_row).collect(), total))
    }

    pub async fn get_member(&self, id: &str) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, address, birth_date, notes, profile_photo, active, created_at, updated_at FROM members WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    pub async fn find_member_by_email(
        &self,
        email: &str,
        exclude_id: Option<&str>,
    ) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, address, birth_date, notes, profile_photo, active, created_at, updated_at FROM members WHERE email = ? AND id != ?",
        )
        .bind(email)
        .bind(exclude_id.unwrap_or(""))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    pub async fn create_member(
        &self,
        request: &MemberRequest,
        birth_date: Option<String>,
    ) -> Result<Member, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp(Utc::now());

        sqlx::query(
            "INSERT INTO members (id, name, email, phone, address, birth_date, notes, profile_photo, active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, NULL, 1, ?, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&birth_date)
        .bind(&request.notes)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Member {
            id,
            name: request.name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            address: request.address.clone(),
            birth_date,
            notes: request.notes.clone(),
            profile_photo: None,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn update_member(
        &self,
        id: &str,
        request: &MemberRequest,
        birth_date: Option<String>,
    ) -> Result<Member, AppError> {
        let existing = self
            .get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

        let now = timestamp(Utc::now());

        sqlx::query(
            "UPDATE members SET name = ?, email = ?, phone = ?, address = ?, birth_date = ?, notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&birth_date)
        .bind(&request.notes)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Member {
            id: id.to_string(),
            name: request.name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            address: request.address.clone(),
            birth_date,
            notes: request.notes.clone(),
            profile_photo: existing.profile_photo,
            active: existing.active,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    /// Flip a member's active flag. Soft delete is `set_member_active(id, false)`;
    /// the row is retained.
    pub async fn set_member_active(&self, id: &str, active: bool) -> Result<Member, AppError> {
        let result = sqlx::query("UPDATE members SET active = ?, updated_at = ? WHERE id = ?")
            .bind(active as i64)
            .bind(timestamp(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        self.get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    pub async fn set_member_photo(&self, id: &str, path: &str) -> Result<Member, AppError> {
        let result =
            sqlx::query("UPDATE members SET profile_photo = ?, updated_at = ? WHERE id = ?")
                .bind(path)
                .bind(timestamp(Utc::now()))
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        self.get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    pub async fn member_total_contributed(&self, id: &str) -> Result<f64, AppError> {
        let row = sqlx::query(
            "SELECT IFNULL(SUM(amount), 0.0) AS total FROM contributions WHERE member_id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("total"))
    }

    pub async fn list_member_contributions(
        &self,
        member_id: &str,
        limit: i64,
    ) -> Result<Vec<ContributionWithRelations>, AppError> {
        let sql = format!(
            "{} WHERE c.member_id = ? ORDER BY c.date DESC LIMIT ?",
            CONTRIBUTION_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(member_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(contribution_from_row).collect())
    }

    // ==================== CATEGORY OPERATIONS ====================

    /// List active categories ordered by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, description, color, icon, active, created_at FROM categories WHERE active = 1 ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, description, color, icon, active, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    pub async fn create_category(
        &self,
        request: &CreateCategoryRequest,
    ) -> Result<Category, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp(Utc::now());

        sqlx::query(
            "INSERT INTO categories (id, name, description, color, icon, active, created_at) VALUES (?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.color)
        .bind(&request.icon)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Category {
            id,
            name: request.name.clone(),
            description: request.description.clone(),
            color: request.color.clone(),
            icon: request.icon.clone(),
            active: true,
            created_at: now,
        })
    }

    // ==================== CONTRIBUTION OPERATIONS ====================

    /// List contributions matching a filter, newest first, plus the total
    /// row count and the summed amount over the whole filtered set.
    pub async fn list_contributions(
        &self,
        filter: &ContributionFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<ContributionWithRelations>, i64, f64), AppError> {
        let push_filters = |qb: &mut QueryBuilder<Sqlite>| {
            if let Some(member_id) = &filter.member_id {
                qb.push(" AND c.member_id = ").push_bind(member_id.clone());
            }
            if let Some(category_id) = &filter.category_id {
                qb.push(" AND c.category_id = ")
                    .push_bind(category_id.clone());
            }
            if let Some(contribution_type) = filter.contribution_type {
                qb.push(" AND c.type = ")
                    .push_bind(contribution_type.as_str());
            }
            if let Some(start) = &filter.start_date {
                qb.push(" AND c.date >= ").push_bind(start.clone());
            }
            if let Some(end) = &filter.end_date {
                qb.push(" AND c.date <= ").push_bind(end.clone());
            }
            if let Some(verified) = filter.verified {
                qb.push(" AND c.verified = ").push_bind(verified as i64);
            }
        };

        let mut qb = QueryBuilder::new(format!("{} WHERE 1=1", CONTRIBUTION_SELECT));
        push_filters(&mut qb);
        qb.push(" ORDER BY c.date DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1) * limit);
        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut count_qb =
            QueryBuilder::new("SELECT COUNT(*) AS n FROM contributions c WHERE 1=1");
        push_filters(&mut count_qb);
        let total: i64 = count_qb.build().fetch_one(&self.pool).await?.get("n");

        let mut sum_qb = QueryBuilder::new(
            "SELECT IFNULL(SUM(c.amount), 0.0) AS total FROM contributions c WHERE 1=1",
        );
        push_filters(&mut sum_qb);
        let total_amount: f64 = sum_qb.build().fetch_one(&self.pool).await?.get("total");

        Ok((
            rows.iter().map(contribution_from_row).collect(),
            total,
            total_amount,
        ))
    }

    pub async fn get_contribution(
        &self,
        id: &str,
    ) -> Result<Option<ContributionWithRelations>, AppError> {
        let sql = format!("{} WHERE c.id = ?", CONTRIBUTION_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(contribution_from_row))
    }

    pub async fn create_contribution(
        &self,
        request: &CreateContributionRequest,
        date: String,
    ) -> Result<ContributionWithRelations, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp(Utc::now());

        sqlx::query(
            "INSERT INTO contributions (id, member_id, category_id, type, amount, payment_method, date, description, notes, verified, verified_by, verified_at, receipt, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, NULL, NULL, ?, ?)",
        )
        .bind(&id)
        .bind(&request.member_id)
        .bind(&request.category_id)
        .bind(request.contribution_type.as_str())
        .bind(request.amount)
        .bind(request.payment_method.as_str())
        .bind(&date)
        .bind(&request.description)
        .bind(&request.notes)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_contribution(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Contribution vanished after insert".to_string()))
    }

    /// Merge-patch update: fields absent from the request keep their current
    /// values.
    pub async fn update_contribution(
        &self,
        id: &str,
        request: &UpdateContributionRequest,
        date: Option<String>,
    ) -> Result<ContributionWithRelations, AppError> {
        let existing = self
            .get_contribution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contribution {} not found", id)))?
            .contribution;

        let member_id = request.member_id.clone().unwrap_or(existing.member_id);
        let category_id = request.category_id.clone().unwrap_or(existing.category_id);
        let contribution_type = request
            .contribution_type
            .unwrap_or(existing.contribution_type);
        let amount = request.amount.unwrap_or(existing.amount);
        let payment_method = request.payment_method.unwrap_or(existing.payment_method);
        let date = date.unwrap_or(existing.date);
        let description = request.description.clone().or(existing.description);
        let notes = request.notes.clone().or(existing.notes);
        let now = timestamp(Utc::now());

        sqlx::query(
            "UPDATE contributions SET member_id = ?, category_id = ?, type = ?, amount = ?, payment_method = ?, date = ?, description = ?, notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&member_id)
        .bind(&category_id)
        .bind(contribution_type.as_str())
        .bind(amount)
        .bind(payment_method.as_str())
        .bind(&date)
        .bind(&description)
        .bind(&notes)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_contribution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contribution {} not found", id)))
    }

    pub async fn delete_contribution(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM contributions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Contribution {} not found", id)));
        }
        Ok(())
    }

    /// Set or clear the verified flag. Verifier identity and timestamp move
    /// with the flag in the same statement.
    pub async fn set_contribution_verified(
        &self,
        id: &str,
        verified: bool,
        verifier_id: &str,
    ) -> Result<ContributionWithRelations, AppError> {
        let (verified_by, verified_at) = if verified {
            (Some(verifier_id.to_string()), Some(timestamp(Utc::now())))
        } else {
            (None, None)
        };

        let result = sqlx::query(
            "UPDATE contributions SET verified = ?, verified_by = ?, verified_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(verified as i64)
        .bind(&verified_by)
        .bind(&verified_at)
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Contribution {} not found", id)));
        }

        self.get_contribution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contribution {} not found", id)))
    }

    pub async fn set_contribution_receipt(
        &self,
        id: &str,
        path: &str,
    ) -> Result<ContributionWithRelations, AppError> {
        let result =
            sqlx::query("UPDATE contributions SET receipt = ?, updated_at = ? WHERE id = ?")
                .bind(path)
                .bind(timestamp(Utc::now()))
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Contribution {} not found", id)));
        }

        self.get_contribution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contribution {} not found", id)))
    }

    // ==================== EVENT OPERATIONS ====================

    pub async fn list_events(
        &self,
        filter: &EventFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<CalendarEvent>, i64), AppError> {
        let push_filters = |qb: &mut QueryBuilder<Sqlite>| {
            if let Some(from) = &filter.from {
                qb.push(" AND e.datetime >= ").push_bind(from.clone());
            }
            if let Some(to) = &filter.to {
                qb.push(" AND e.datetime <= ").push_bind(to.clone());
            }
            if let Some(member_id) = &filter.member_id {
                qb.push(" AND e.member_id = ").push_bind(member_id.clone());
            }
        };

        let mut qb = QueryBuilder::new(
            r#"SELECT e.id, e.title, e.datetime, e.description, e.member_id,
                      m.name AS member_name, e.created_at, e.updated_at
               FROM calendar_events e
               LEFT JOIN members m ON m.id = e.member_id
               WHERE 1=1"#,
        );
        push_filters(&mut qb);
        qb.push(" ORDER BY e.datetime ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1) * limit);
        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut count_qb =
            QueryBuilder::new("SELECT COUNT(*) AS n FROM calendar_events e WHERE 1=1");
        push_filters(&mut count_qb);
        let total: i64 = count_qb.build().fetch_one(&self.pool).await?.get("n");

        Ok((rows.iter().map(event_from_row).collect(), total))
    }

    pub async fn get_event(&self, id: &str) -> Result<Option<CalendarEvent>, AppError> {
        let row = sqlx::query(
            r#"SELECT e.id, e.title, e.datetime, e.description, e.member_id,
                      m.name AS member_name, e.created_at, e.updated_at
               FROM calendar_events e
               LEFT JOIN members m ON m.id = e.member_id
               WHERE e.id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(event_from_row))
    }

    pub async fn create_event(
        &self,
        title: &str,
        datetime: String,
        description: Option<String>,
        member_id: Option<String>,
    ) -> Result<CalendarEvent, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp(Utc::now());

        sqlx::query(
            "INSERT INTO calendar_events (id, title, datetime, description, member_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(title)
        .bind(&datetime)
        .bind(&description)
        .bind(&member_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_event(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Event vanished after insert".to_string()))
    }

    /// Merge-patch update: absent fields keep their current values.
    pub async fn update_event(
        &self,
        id: &str,
        title: Option<String>,
        datetime: Option<String>,
        description: Option<String>,
        member_id: Option<String>,
    ) -> Result<CalendarEvent, AppError> {
        let existing = self
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))?;

        let title = title.unwrap_or(existing.title);
        let datetime = datetime.unwrap_or(existing.datetime);
        let description = description.or(existing.description);
        let member_id = member_id.or(existing.member_id);
        let now = timestamp(Utc::now());

        sqlx::query(
            "UPDATE calendar_events SET title = ?, datetime = ?, description = ?, member_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&title)
        .bind(&datetime)
        .bind(&description)
        .bind(&member_id)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))
    }

    pub async fn delete_event(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Event {} not found", id)));
        }
        Ok(())
    }

    // ==================== DASHBOARD AGGREGATES ====================

    /// Sum and count contributions dated at or after `since` (all time when
    /// `None`).
    pub async fn aggregate_contributions_since(
        &self,
        since: Option<&str>,
    ) -> Result<(f64, i64), AppError> {
        let row = match since {
            Some(since) => {
                sqlx::query(
                    "SELECT IFNULL(SUM(amount), 0.0) AS total, COUNT(*) AS n FROM contributions WHERE date >= ?",
                )
                .bind(since)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT IFNULL(SUM(amount), 0.0) AS total, COUNT(*) AS n FROM contributions")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok((row.get("total"), row.get("n")))
    }

    pub async fn count_active_members(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM members WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Active members with at least one contribution dated at or after
    /// `since`.
    pub async fn count_contributing_members_since(&self, since: &str) -> Result<i64, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM members m WHERE m.active = 1 AND EXISTS (SELECT 1 FROM contributions c WHERE c.member_id = m.id AND c.date >= ?)",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }

    pub async fn distribution_by_type_since(
        &self,
        since: &str,
    ) -> Result<Vec<TypeBucket>, AppError> {
        let rows = sqlx::query(
            "SELECT type, IFNULL(SUM(amount), 0.0) AS total, COUNT(*) AS n FROM contributions WHERE date >= ? GROUP BY type ORDER BY total DESC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| TypeBucket {
                contribution_type: ContributionType::from_str(row.get("type")),
                total: row.get("total"),
                count: row.get("n"),
            })
            .collect())
    }

    pub async fn distribution_by_payment_method_since(
        &self,
        since: &str,
    ) -> Result<Vec<PaymentMethodBucket>, AppError> {
        let rows = sqlx::query(
            "SELECT payment_method, IFNULL(SUM(amount), 0.0) AS total, COUNT(*) AS n FROM contributions WHERE date >= ? GROUP BY payment_method ORDER BY total DESC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PaymentMethodBucket {
                payment_method: PaymentMethod::from_str(row.get("payment_method")),
                total: row.get("total"),
                count: row.get("n"),
            })
            .collect())
    }

    /// Top contributors by summed amount since `since`, descending. Ties
    /// break on member id ascending so the ranking is deterministic.
    pub async fn top_contributors_since(
        &self,
        since: &str,
        limit: i64,
    ) -> Result<Vec<TopContributor>, AppError> {
        let rows = sqlx::query(
            r#"SELECT c.member_id, IFNULL(m.name, ?) AS name, SUM(c.amount) AS total
               FROM contributions c
               LEFT JOIN members m ON m.id = c.member_id
               WHERE c.date >= ?
               GROUP BY c.member_id
               ORDER BY total DESC, c.member_id ASC
               LIMIT ?"#,
        )
        .bind(MISSING_MEMBER_NAME)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| TopContributor {
                id: row.get("member_id"),
                name: row.get("name"),
                total: row.get("total"),
            })
            .collect())
    }

    /// Raw (date, amount) pairs for the trailing evolution series; bucketing
    /// happens in [`crate::models::bucket_by_month`].
    pub async fn contributions_dated_since(
        &self,
        since: &str,
    ) -> Result<Vec<(DateTime<Utc>, f64)>, AppError> {
        let rows = sqlx::query(
            "SELECT date, amount FROM contributions WHERE date >= ? ORDER BY date ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let date: String = row.get("date");
                let amount: f64 = row.get("amount");
                DateTime::parse_from_rfc3339(&date)
                    .ok()
                    .map(|dt| (dt.with_timezone(&Utc), amount))
            })
            .collect())
    }

    pub async fn recent_contributions(
        &self,
        limit: i64,
    ) -> Result<Vec<ContributionWithRelations>, AppError> {
        let sql = format!("{} ORDER BY c.date DESC LIMIT ?", CONTRIBUTION_SELECT);
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(contribution_from_row).collect())
    }
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let active: i64 = row.get("active");
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        role: Role::from_str(&role),
        active: active != 0,
        created_at: row.get("created_at"),
    }
}

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    let active: i64 = row.get("active");
    Member {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        address: row.get("address"),
        birth_date: row.get("birth_date"),
        notes: row.get("notes"),
        profile_photo: row.get("profile_photo"),
        active: active != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
    let active: i64 = row.get("active");
    Category {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        color: row.get("color"),
        icon: row.get("icon"),
        active: active != 0,
        created_at: row.get("created_at"),
    }
}

fn contribution_from_row(row: &sqlx::sqlite::SqliteRow) -> ContributionWithRelations {
    let verified: i64 = row.get("verified");
    let contribution_type: String = row.get("type");
    let payment_method: String = row.get("payment_method");
    let category_active: i64 = row.get("category_active");

    ContributionWithRelations {
        contribution: Contribution {
            id: row.get("id"),
            member_id: row.get("member_id"),
            category_id: row.get("category_id"),
            contribution_type: ContributionType::from_str(&contribution_type),
            amount: row.get("amount"),
            payment_method: PaymentMethod::from_str(&payment_method),
            date: row.get("date"),
            description: row.get("description"),
            notes: row.get("notes"),
            verified: verified != 0,
            verified_by: row.get("verified_by"),
            verified_at: row.get("verified_at"),
            receipt: row.get("receipt"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        member: MemberRef {
            id: row.get("member_id"),
            name: row.get("member_name"),
            email: row.get("member_email"),
        },
        category: Category {
            id: row.get("category_id"),
            name: row.get("category_name"),
            description: row.get("category_description"),
            color: row.get("category_color"),
            icon: row.get("category_icon"),
            active: category_active != 0,
            created_at: row.get("category_created_at"),
        },
    }
}

fn event_from_row(row: &sqlx::sqlite::SqliteRow) -> CalendarEvent {
    CalendarEvent {
        id: row.get("id"),
        title: row.get("title"),
        datetime: row.get("datetime"),
        description: row.get("description"),
        member_id: row.get("member_id"),
        member_name: row.get("member_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
