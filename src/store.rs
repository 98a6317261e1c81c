use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, FixedOffset, Utc};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::models::{Db, Todo, TodoStatus, User};

/// Fields required to create a todo. Presence is guaranteed by the type;
/// the store still rejects a blank title.
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub user_id: u64,
    pub due_date: DateTime<FixedOffset>,
    pub status: Option<TodoStatus>,
}

/// Partial update: only `Some` fields are written over the stored record.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub due_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String, // plaintext, hashed before storage
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>, // plaintext, re-hashed before storage
}

/// In-memory dataset backed by a single JSON file. The whole document is
/// rewritten after every mutation; the mutex serializes each
/// read-modify-write cycle so concurrent requests cannot interleave.
pub struct Store {
    path: PathBuf,
    db: Mutex<Db>,
}

impl Store {
    /// Opens the store at `path`. An existing file is authoritative; a
    /// missing one is created with an empty dataset. An unparseable file
    /// starts the process empty without clobbering it until the next write.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Store> {
        let path = path.into();
        let db = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(db) => db,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "database file unreadable, starting empty");
                    Db::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "database file missing, creating it");
                let db = Db::default();
                write_db(&path, &db)?;
                db
            }
            Err(e) => return Err(e),
        };

        Ok(Store {
            path,
            db: Mutex::new(db),
        })
    }

    fn persist(&self, db: &Db) -> Result<(), ApiError> {
        write_db(&self.path, db).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to save database file");
            ApiError::Internal(e.to_string())
        })
    }

    pub fn add_todo(&self, new: NewTodo) -> Result<Todo, ApiError> {
        if new.title.trim().is_empty() {
            return Err(ApiError::Validation("Title is required".to_string()));
        }

        let mut db = self.db.lock()?;
        let now = Utc::now();
        let todo = Todo {
            id: next_id(db.todos.iter().map(|t| t.id)),
            title: new.title,
            description: new.description,
            user_id: new.user_id,
            due_date: new.due_date,
            status: new.status.unwrap_or(TodoStatus::Pending),
            created_at: now,
            updated_at: now,
        };
        db.todos.push(todo.clone());
        self.persist(&db)?;

        info!(id = todo.id, title = %todo.title, "todo added");
        Ok(todo)
    }

    /// Merges `patch` over the stored record and restamps `updated_at`.
    /// `created_at` is never touched.
    pub fn update_todo(&self, id: u64, patch: TodoPatch) -> Result<Todo, ApiError> {
        let mut db = self.db.lock()?;
        let todo = db
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ApiError::NotFound("Todo not found".to_string()))?;

        if let Some(title) = patch.title {
            todo.title = title;
        }
        if let Some(description) = patch.description {
            todo.description = description;
        }
        if let Some(status) = patch.status {
            todo.status = status;
        }
        if let Some(due_date) = patch.due_date {
            todo.due_date = due_date;
        }
        todo.updated_at = Utc::now();

        let updated = todo.clone();
        self.persist(&db)?;

        info!(id, "todo updated");
        Ok(updated)
    }

    pub fn delete_todo(&self, id: u64) -> Result<(), ApiError> {
        let mut db = self.db.lock()?;
        let before = db.todos.len();
        db.todos.retain(|t| t.id != id);
        if db.todos.len() == before {
            return Err(ApiError::NotFound("Todo not found".to_string()));
        }
        self.persist(&db)?;

        info!(id, "todo deleted");
        Ok(())
    }

    /// All todos, or only those owned by `user_id`, in insertion order.
    pub fn list_todos(&self, user_id: Option<u64>) -> Result<Vec<Todo>, ApiError> {
        let db = self.db.lock()?;
        let todos = match user_id {
            Some(uid) => db.todos.iter().filter(|t| t.user_id == uid).cloned().collect(),
            None => db.todos.clone(),
        };
        Ok(todos)
    }

    pub fn get_todo(&self, id: u64) -> Result<Option<Todo>, ApiError> {
        let db = self.db.lock()?;
        Ok(db.todos.iter().find(|t| t.id == id).cloned())
    }

    /// Stores a new user with a hashed password. Email uniqueness is checked
    /// by the caller before invocation. The returned record carries the hash;
    /// callers must not expose it externally.
    pub fn add_user(&self, new: NewUser) -> Result<User, ApiError> {
        let password = hash_password(&new.password)?;

        let mut db = self.db.lock()?;
        let user = User {
            id: next_id(db.users.iter().map(|u| u.id)),
            name: new.name,
            email: new.email,
            password,
        };
        db.users.push(user.clone());
        self.persist(&db)?;

        info!(id = user.id, email = %user.email, "user added");
        Ok(user)
    }

    /// Exact, case-sensitive match.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let db = self.db.lock()?;
        Ok(db.users.iter().find(|u| u.email == email).cloned())
    }

    pub fn update_user(&self, id: u64, patch: UserPatch) -> Result<User, ApiError> {
        // Hash outside the lock; it is the slow part.
        let password = match patch.password {
            Some(plain) => Some(hash_password(&plain)?),
            None => None,
        };

        let mut db = self.db.lock()?;
        let user = db
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(hash) = password {
            user.password = hash;
        }

        let updated = user.clone();
        self.persist(&db)?;

        info!(id, "user updated");
        Ok(updated)
    }

    pub fn delete_user(&self, id: u64) -> Result<(), ApiError> {
        let mut db = self.db.lock()?;
        let before = db.users.len();
        db.users.retain(|u| u.id != id);
        if db.users.len() == before {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        self.persist(&db)?;

        info!(id, "user deleted");
        Ok(())
    }

    pub fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let db = self.db.lock()?;
        Ok(db.users.clone())
    }
}

/// Next sequential id: max of the existing ids plus one, or 1 when empty.
/// Ids of deleted records below the maximum are never handed out again.
fn next_id<I: Iterator<Item = u64>>(ids: I) -> u64 {
    ids.max().map_or(1, |max| max + 1)
}

fn write_db(path: &Path, db: &Db) -> io::Result<()> {
    let text = serde_json::to_string_pretty(db)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, text)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
