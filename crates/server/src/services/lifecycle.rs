//! Account lifecycle manager.
//!
//! Every operation here is performed on behalf of an explicit [`Actor`] and
//! appends exactly one audit entry once the mutation has succeeded.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};

use mailroom_core::{
    AuditAction, BulkAction, DEFAULT_QUOTA_BYTES, Email, GroupId, MailboxUsage, Patch, mb_to_bytes,
};

use crate::db::users::{NewUser, ProfileUpdate};
use crate::db::{GroupRepository, MailboxRepository, SendingLimitRepository, UserRepository};
use crate::error::AppError;
use crate::models::{Actor, SendingLimit, User};
use crate::services::audit::AuditRecorder;
use crate::services::auth::{generate_temporary_password, hash_password, validate_password};

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /admin/users`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub quota_mb: Option<i64>,
}

/// Profile fields an admin or the user may change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: Patch<String>,
    #[serde(default)]
    pub last_name: Patch<String>,
    #[serde(default)]
    pub date_of_birth: Patch<NaiveDate>,
    #[serde(default)]
    pub gender: Patch<String>,
    #[serde(default)]
    pub recovery_email: Patch<String>,
    #[serde(default)]
    pub recovery_phone: Patch<String>,
}

impl UpdateProfileRequest {
    /// Names of the fields present in the request, for audit details.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("first_name", self.first_name.is_absent()),
            ("last_name", self.last_name.is_absent()),
            ("date_of_birth", self.date_of_birth.is_absent()),
            ("gender", self.gender.is_absent()),
            ("recovery_email", self.recovery_email.is_absent()),
            ("recovery_phone", self.recovery_phone.is_absent()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| (!absent).then_some(name))
        .collect()
    }

    /// Convert into the repository update; names cannot be cleared.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a name is `null` or blank.
    pub fn into_update(self) -> Result<ProfileUpdate, AppError> {
        let first_name = self.first_name.required("first_name")?;
        let last_name = self.last_name.required("last_name")?;
        if first_name.as_deref().is_some_and(|n| n.trim().is_empty())
            || last_name.as_deref().is_some_and(|n| n.trim().is_empty())
        {
            return Err(AppError::validation("names cannot be blank"));
        }
        Ok(ProfileUpdate {
            first_name,
            last_name,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            recovery_email: self.recovery_email,
            recovery_phone: self.recovery_phone,
        })
    }
}

/// Body of `POST /admin/users/bulk`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkRequest {
    pub action: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub data: Option<BulkData>,
}

/// Extra parameters some bulk actions need.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkData {
    pub quota_mb: Option<i64>,
    pub group_id: Option<GroupId>,
}

/// A validated bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkCommand {
    Suspend,
    Unsuspend,
    Delete,
    UpdateQuota { quota_mb: i64, quota_bytes: i64 },
    AssignGroup { group_id: GroupId },
}

impl BulkCommand {
    /// Validate the action name and its parameters.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an unknown action, or when
    /// `update_quota` lacks a non-negative `quota_mb` or `assign_group` lacks
    /// `group_id`.
    pub fn parse(action: &str, data: Option<&BulkData>) -> Result<Self, AppError> {
        let action: BulkAction = action.parse().map_err(AppError::Validation)?;
        Ok(match action {
            BulkAction::Suspend => Self::Suspend,
            BulkAction::Unsuspend => Self::Unsuspend,
            BulkAction::Delete => Self::Delete,
            BulkAction::UpdateQuota => {
                let quota_mb = data
                    .and_then(|d| d.quota_mb)
                    .ok_or_else(|| AppError::validation("quota_mb is required for update_quota"))?;
                let quota_bytes = mb_to_bytes(quota_mb)?;
                Self::UpdateQuota {
                    quota_mb,
                    quota_bytes,
                }
            }
            BulkAction::AssignGroup => {
                let group_id = data
                    .and_then(|d| d.group_id)
                    .ok_or_else(|| AppError::validation("group_id is required for assign_group"))?;
                Self::AssignGroup { group_id }
            }
        })
    }

    #[must_use]
    pub const fn action(&self) -> BulkAction {
        match self {
            Self::Suspend => BulkAction::Suspend,
            Self::Unsuspend => BulkAction::Unsuspend,
            Self::Delete => BulkAction::Delete,
            Self::UpdateQuota { .. } => BulkAction::UpdateQuota,
            Self::AssignGroup { .. } => BulkAction::AssignGroup,
        }
    }
}

/// Parse and de-duplicate the target addresses of a bulk request.
///
/// # Errors
///
/// Returns `AppError::Validation` if the list is empty or an address is
/// malformed.
pub fn parse_bulk_emails(emails: &[String]) -> Result<Vec<String>, AppError> {
    if emails.is_empty() {
        return Err(AppError::validation("emails must not be empty"));
    }
    let mut parsed = Vec::with_capacity(emails.len());
    for raw in emails {
        let email = Email::parse(raw)?.into_inner();
        if !parsed.contains(&email) {
            parsed.push(email);
        }
    }
    Ok(parsed)
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub action: BulkAction,
    pub affected_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub mailbox: MailboxUsage,
    pub sending_limit: Option<SendingLimit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordReset {
    pub email: Email,
    /// Present only when the password was generated; shown once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

pub struct LifecycleService<'a> {
    users: UserRepository<'a>,
    mailboxes: MailboxRepository<'a>,
    groups: GroupRepository<'a>,
    limits: SendingLimitRepository<'a>,
    audit: AuditRecorder<'a>,
}

impl<'a> LifecycleService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            mailboxes: MailboxRepository::new(pool),
            groups: GroupRepository::new(pool),
            limits: SendingLimitRepository::new(pool),
            audit: AuditRecorder::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<User>, AppError> {
        Ok(self.users.list(search).await?)
    }

    /// A user with mailbox usage and sending-limit row, read concurrently.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist.
    pub async fn get(&self, email: &Email) -> Result<UserDetail, AppError> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_owned()))?;

        let (mailbox, sending_limit) = tokio::try_join!(
            self.mailboxes.get_or_create(email),
            self.limits.get_for_user(user.id),
        )?;

        Ok(UserDetail {
            user,
            mailbox: mailbox.usage(),
            sending_limit,
        })
    }

    /// Provision a user and their mailbox metadata.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for blank names, a weak password, a
    /// negative quota or a duplicate email.
    #[instrument(skip(self, actor, request), fields(admin = %actor.email, target_email = %request.email))]
    pub async fn create(&self, actor: &Actor, request: CreateUserRequest) -> Result<User, AppError> {
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(AppError::validation("first_name and last_name are required"));
        }
        validate_password(&request.password)?;
        let quota_bytes = match request.quota_mb {
            Some(mb) => mb_to_bytes(mb)?,
            None => DEFAULT_QUOTA_BYTES,
        };

        let user = self
            .users
            .create(&NewUser {
                email: request.email,
                first_name: request.first_name.trim().to_owned(),
                last_name: request.last_name.trim().to_owned(),
                password_hash: hash_password(&request.password)?,
            })
            .await?;
        self.mailboxes.upsert_quota(&user.email, quota_bytes).await?;

        info!("User created");
        self.audit
            .record(
                actor,
                AuditAction::UserCreated,
                Some(user.email.as_str()),
                Some(json!({ "quota_bytes": quota_bytes })),
            )
            .await?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist.
    /// Returns `AppError::Validation` if a name is cleared.
    #[instrument(skip(self, actor, request), fields(admin = %actor.email, target_email = %email))]
    pub async fn update(
        &self,
        actor: &Actor,
        email: &Email,
        request: UpdateProfileRequest,
    ) -> Result<User, AppError> {
        let fields = request.changed_fields();
        let user = self
            .users
            .update_profile(email, request.into_update()?)
            .await?;

        info!("User updated");
        self.audit
            .record(
                actor,
                AuditAction::UserUpdated,
                Some(email.as_str()),
                Some(json!({ "fields": fields })),
            )
            .await?;
        Ok(user)
    }

    /// Suspend a user. Suspending an already suspended user succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist.
    #[instrument(skip(self, actor), fields(admin = %actor.email, target_email = %email))]
    pub async fn suspend(
        &self,
        actor: &Actor,
        email: &Email,
        reason: Option<&str>,
    ) -> Result<User, AppError> {
        let user = self.users.set_suspended(email, true, reason).await?;

        info!("User suspended");
        self.audit
            .record(
                actor,
                AuditAction::UserSuspended,
                Some(email.as_str()),
                Some(json!({ "reason": reason })),
            )
            .await?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist.
    #[instrument(skip(self, actor), fields(admin = %actor.email, target_email = %email))]
    pub async fn unsuspend(&self, actor: &Actor, email: &Email) -> Result<User, AppError> {
        let user = self.users.set_suspended(email, false, None).await?;

        info!("User unsuspended");
        self.audit
            .record(actor, AuditAction::UserUnsuspended, Some(email.as_str()), None)
            .await?;
        Ok(user)
    }

    /// Clear the lockout state. Unlocking an unlocked account succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist.
    #[instrument(skip(self, actor), fields(admin = %actor.email, target_email = %email))]
    pub async fn unlock(&self, actor: &Actor, email: &Email) -> Result<User, AppError> {
        let user = self.users.unlock(email).await?;

        info!("User unlocked");
        self.audit
            .record(actor, AuditAction::UserUnlocked, Some(email.as_str()), None)
            .await?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist.
    #[instrument(skip(self, actor), fields(admin = %actor.email, target_email = %email))]
    pub async fn delete(&self, actor: &Actor, email: &Email) -> Result<(), AppError> {
        self.users.delete(email).await?;

        info!("User deleted");
        self.audit
            .record(actor, AuditAction::UserDeleted, Some(email.as_str()), None)
            .await?;
        Ok(())
    }

    /// Set a new password, generating one if none is supplied. Also clears
    /// the lockout state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist.
    /// Returns `AppError::Auth` if the supplied password is too weak.
    #[instrument(skip(self, actor, new_password), fields(admin = %actor.email, target_email = %email))]
    pub async fn reset_password(
        &self,
        actor: &Actor,
        email: &Email,
        new_password: Option<String>,
    ) -> Result<PasswordReset, AppError> {
        let (password, generated) = match new_password {
            Some(password) => {
                validate_password(&password)?;
                (password, false)
            }
            None => (generate_temporary_password(), true),
        };

        let hash = hash_password(&password)?;
        self.users.set_password_hash(email, &hash, true).await?;

        info!(generated, "User password reset");
        self.audit
            .record(
                actor,
                AuditAction::UserPasswordReset,
                Some(email.as_str()),
                Some(json!({ "generated": generated })),
            )
            .await?;

        Ok(PasswordReset {
            email: email.clone(),
            temporary_password: generated.then_some(password),
        })
    }

    /// Apply one action to many users in a single statement and write one
    /// summary audit entry.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty list, unknown action or
    /// missing parameters.
    /// Returns `AppError::NotFound` if `assign_group` names a missing group.
    #[instrument(skip(self, actor, request), fields(admin = %actor.email, action = %request.action))]
    pub async fn bulk_apply(
        &self,
        actor: &Actor,
        request: BulkRequest,
    ) -> Result<BulkOutcome, AppError> {
        let emails = parse_bulk_emails(&request.emails)?;
        let command = BulkCommand::parse(&request.action, request.data.as_ref())?;

        let (affected_count, details) = match command {
            BulkCommand::Suspend => (
                self.users.bulk_set_suspended(&emails, true).await?,
                json!({}),
            ),
            BulkCommand::Unsuspend => (
                self.users.bulk_set_suspended(&emails, false).await?,
                json!({}),
            ),
            BulkCommand::Delete => (self.users.bulk_delete(&emails).await?, json!({})),
            BulkCommand::UpdateQuota {
                quota_mb,
                quota_bytes,
            } => (
                self.mailboxes
                    .bulk_upsert_quota(&emails, quota_bytes)
                    .await?,
                json!({ "quota_mb": quota_mb }),
            ),
            BulkCommand::AssignGroup { group_id } => {
                if !self.groups.exists(group_id).await? {
                    return Err(AppError::NotFound("Group".to_owned()));
                }
                (
                    self.groups.bulk_add_members(group_id, &emails).await?,
                    json!({ "group_id": group_id }),
                )
            }
        };

        let action = command.action();
        info!(affected_count, "Bulk action applied");
        self.audit
            .record(
                actor,
                action.audit_action(),
                None,
                Some(json!({
                    "emails": emails,
                    "affected_count": affected_count,
                    "data": details,
                })),
            )
            .await?;

        Ok(BulkOutcome {
            action,
            affected_count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_parse_simple_actions() {
        assert_eq!(
            BulkCommand::parse("suspend", None).unwrap(),
            BulkCommand::Suspend
        );
        assert_eq!(
            BulkCommand::parse("delete", None).unwrap(),
            BulkCommand::Delete
        );
    }

    #[test]
    fn test_bulk_parse_unknown_action() {
        assert!(matches!(
            BulkCommand::parse("archive", None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_bulk_update_quota_requires_non_negative_mb() {
        assert!(BulkCommand::parse("update_quota", None).is_err());

        let negative = BulkData {
            quota_mb: Some(-1),
            group_id: None,
        };
        assert!(BulkCommand::parse("update_quota", Some(&negative)).is_err());

        let data = BulkData {
            quota_mb: Some(2048),
            group_id: None,
        };
        assert_eq!(
            BulkCommand::parse("update_quota", Some(&data)).unwrap(),
            BulkCommand::UpdateQuota {
                quota_mb: 2048,
                quota_bytes: 2048 * 1_048_576,
            }
        );
    }

    #[test]
    fn test_bulk_assign_group_requires_group_id() {
        assert!(BulkCommand::parse("assign_group", Some(&BulkData::default())).is_err());

        let data = BulkData {
            quota_mb: None,
            group_id: Some(GroupId::new(7)),
        };
        assert_eq!(
            BulkCommand::parse("assign_group", Some(&data)).unwrap(),
            BulkCommand::AssignGroup {
                group_id: GroupId::new(7)
            }
        );
    }

    #[test]
    fn test_bulk_emails_must_be_non_empty_and_valid() {
        assert!(parse_bulk_emails(&[]).is_err());
        assert!(parse_bulk_emails(&["not-an-address".to_owned()]).is_err());

        let emails = parse_bulk_emails(&[
            "a@example.org".to_owned(),
            " b@example.org ".to_owned(),
            "a@example.org".to_owned(),
        ])
        .unwrap();
        assert_eq!(emails, vec!["a@example.org", "b@example.org"]);
    }

    #[test]
    fn test_bulk_request_deserializes_without_data() {
        let request: BulkRequest =
            serde_json::from_str(r#"{"action": "suspend", "emails": ["a@example.org"]}"#).unwrap();
        assert!(request.data.is_none());
        assert_eq!(request.emails.len(), 1);
    }

    #[test]
    fn test_profile_update_rejects_null_name() {
        let request: UpdateProfileRequest =
            serde_json::from_str(r#"{"first_name": null}"#).unwrap();
        assert!(matches!(
            request.into_update(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_profile_update_tracks_changed_fields() {
        let request: UpdateProfileRequest =
            serde_json::from_str(r#"{"gender": null, "recovery_phone": "+1 555 0100"}"#).unwrap();
        assert_eq!(request.changed_fields(), vec!["gender", "recovery_phone"]);

        let update = request.into_update().unwrap();
        assert!(update.first_name.is_none());
        assert!(update.gender.is_null());
        assert!(update.recovery_phone.is_present());
    }
}
