//! Accounts, profiles and the people directory.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser},
    error::{BoardError, BoardResult},
    ledger::{looks_like_email, EMAIL_MAX, PHONE_MAX},
    matching,
    models::{NewUser, ProfileChanges, PublicUser, QuizAnswer, QuizSummary, Role, User},
    storage::ObjectStorage,
    store::{Store, StoreError},
    uploads::{self, Upload},
};

const NAME_LEN: (usize, usize) = (3, 30);
const PASSWORD_LEN: (usize, usize) = (8, 32);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub name: Option<String>,
    #[serde(default)]
    pub skills: Value,
    pub about: Option<String>,
    pub company_description: Option<String>,
    #[serde(default)]
    pub hiring_roles: Value,
    pub email: Option<Value>,
    pub phone: Option<Value>,
}

/// A user's own profile; everything but the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub skills: Vec<String>,
    pub about: String,
    pub company_description: String,
    pub hiring_roles: Vec<String>,
    pub resume_key: Option<String>,
    pub resume_name: Option<String>,
    pub profile_photo_key: Option<String>,
    pub connections: Vec<Uuid>,
    pub quiz_completed: bool,
    pub quiz_answers: Vec<QuizAnswer>,
    pub quiz_summary: Option<QuizSummary>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            skills: user.skills,
            about: user.about,
            company_description: user.company_description,
            hiring_roles: user.hiring_roles,
            resume_key: user.resume_key,
            resume_name: user.resume_name,
            profile_photo_key: user.profile_photo_key,
            connections: user.connections,
            quiz_completed: user.quiz_completed,
            quiz_answers: user.quiz_answers,
            quiz_summary: user.quiz_summary,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

fn field(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn check_name(name: &str) -> BoardResult<()> {
    let len = name.chars().count();
    if len < NAME_LEN.0 {
        return Err(BoardError::validation("Name must contain at least 3 Characters!"));
    }
    if len > NAME_LEN.1 {
        return Err(BoardError::validation("Name cannot exceed 30 Characters!"));
    }
    Ok(())
}

fn parse_role(role: &str) -> BoardResult<Role> {
    role.parse::<Role>()
        .map_err(|_| BoardError::validation("Role must be either Job Seeker or Employer."))
}

pub async fn register(store: &dyn Store, input: RegisterInput) -> BoardResult<User> {
    let (Some(name), Some(email), Some(phone), Some(role)) = (
        field(&input.name),
        field(&input.email),
        field(&input.phone),
        field(&input.role),
    ) else {
        return Err(BoardError::validation("Please fill full form !"));
    };
    let Some(password) = input.password.filter(|password| !password.is_empty()) else {
        return Err(BoardError::validation("Please fill full form !"));
    };

    check_name(&name)?;
    let email = email.to_lowercase();
    if !looks_like_email(&email) {
        return Err(BoardError::validation("Please provide a valid Email!"));
    }
    if email.chars().count() > EMAIL_MAX {
        return Err(BoardError::validation("Email cannot exceed 255 Characters!"));
    }
    if phone.chars().count() > PHONE_MAX {
        return Err(BoardError::validation("Phone cannot exceed 50 Characters!"));
    }
    let password_len = password.chars().count();
    if password_len < PASSWORD_LEN.0 {
        return Err(BoardError::validation(
            "Password must contain at least 8 characters!",
        ));
    }
    if password_len > PASSWORD_LEN.1 {
        return Err(BoardError::validation("Password cannot exceed 32 characters!"));
    }
    let role = parse_role(&role)?;

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(BoardError::conflict("Email already registered !"));
    }

    let password_hash = password::hash_password(&password).map_err(BoardError::Internal)?;
    let user = store
        .insert_user(NewUser {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            password_hash,
            role,
        })
        .await
        .map_err(|err| match err {
            StoreError::UniqueViolation(_) => BoardError::conflict("Email already registered !"),
            other => BoardError::Store(other),
        })?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(user)
}

/// Checks credentials and that the account holds the requested role.
pub async fn login(store: &dyn Store, input: LoginInput) -> BoardResult<User> {
    let (Some(email), Some(role)) = (field(&input.email), field(&input.role)) else {
        return Err(BoardError::validation(
            "Please provide email ,password and role !",
        ));
    };
    let Some(password) = input.password.filter(|password| !password.is_empty()) else {
        return Err(BoardError::validation(
            "Please provide email ,password and role !",
        ));
    };
    let role = parse_role(&role)?;

    let Some(user) = store.find_user_by_email(&email).await? else {
        return Err(BoardError::validation("Invalid Email Or Password."));
    };
    let valid =
        password::verify_password(&password, &user.password_hash).map_err(BoardError::Internal)?;
    if !valid {
        return Err(BoardError::validation("Invalid Email Or Password."));
    }
    if user.role != role {
        return Err(BoardError::not_found(format!(
            "User with provided email and {role} not found !"
        )));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

async fn load(store: &dyn Store, user_id: Uuid) -> BoardResult<User> {
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| BoardError::not_found("User not found."))
}

pub async fn profile(store: &dyn Store, user: &AuthenticatedUser) -> BoardResult<ProfileView> {
    Ok(load(store, user.user_id).await?.into())
}

pub async fn update_profile(
    store: &dyn Store,
    user: &AuthenticatedUser,
    input: ProfileInput,
) -> BoardResult<ProfileView> {
    if input.email.is_some() || input.phone.is_some() {
        return Err(BoardError::validation("Email/Phone cannot be edited."));
    }

    let name = field(&input.name);
    if let Some(name) = &name {
        check_name(name)?;
    }
    let tokens = |value: &Value| (!value.is_null()).then(|| matching::skill_tokens(value));

    let changes = ProfileChanges {
        name,
        skills: tokens(&input.skills),
        about: input.about.map(|about| about.trim().to_string()),
        company_description: input
            .company_description
            .map(|description| description.trim().to_string()),
        hiring_roles: tokens(&input.hiring_roles),
    };

    let updated = store.update_profile(user.user_id, changes).await?;
    info!(user_id = %user.user_id, "profile updated");
    Ok(updated.into())
}

pub async fn upload_resume(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    user: &AuthenticatedUser,
    upload: Option<Upload>,
) -> BoardResult<ProfileView> {
    let upload = upload.ok_or_else(|| BoardError::validation("Resume file required."))?;
    uploads::check_resume(&upload)?;
    let original_name = upload.file_name.clone();
    let key = uploads::put(storage, uploads::RESUME_PREFIX, user.user_id, upload).await?;
    let updated = store.set_resume(user.user_id, &key, &original_name).await?;
    Ok(updated.into())
}

pub async fn upload_photo(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    user: &AuthenticatedUser,
    upload: Option<Upload>,
) -> BoardResult<ProfileView> {
    let upload = upload.ok_or_else(|| BoardError::validation("Profile photo required."))?;
    uploads::check_photo(&upload)?;
    let key = uploads::put(storage, uploads::PHOTO_PREFIX, user.user_id, upload).await?;
    let updated = store.set_profile_photo(user.user_id, &key).await?;
    Ok(updated.into())
}

pub async fn list_people(store: &dyn Store) -> BoardResult<Vec<PublicUser>> {
    Ok(store.list_users().await?.iter().map(PublicUser::from).collect())
}
