//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::JwtKeys;
use crate::config::Config;
use crate::db::Database;
use crate::uploads::UploadManager;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    uploads: UploadManager,
    jwt: JwtKeys,
    secure_cookies: bool,
}

impl AppState {
    pub fn new(db: Database, uploads: UploadManager, jwt: JwtKeys, secure_cookies: bool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                uploads,
                jwt,
                secure_cookies,
            }),
        }
    }

    pub fn from_config(db: Database, config: &Config) -> Self {
        Self::new(
            db,
            UploadManager::new(config.storage_root.clone()),
            JwtKeys::new(
                config.jwt_secret.as_bytes(),
                chrono::Duration::hours(config.jwt_ttl_hours),
            ),
            config.production,
        )
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn pool(&self) -> &PgPool {
        self.inner.db.pool()
    }

    pub fn uploads(&self) -> &UploadManager {
        &self.inner.uploads
    }

    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    pub fn secure_cookies(&self) -> bool {
        self.inner.secure_cookies
    }
}
