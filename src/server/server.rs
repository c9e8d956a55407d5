use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::{Context, anyhow};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

/// Repositories of one storage backend, wired as ports.
struct Repos {
    auth_repo: Arc<dyn AuthRepo>,
    user_repo: Arc<dyn UserRepo>,
    follow_repo: Arc<dyn FollowRepo>,
    mate_repo: Arc<dyn MateRepo>,
    tx_manager: Arc<dyn TxManager>,
}

enum StorageHandle {
    MySql(Pool<MySql>),
    Memory,
}

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub relationship_service: Arc<dyn RelationshipService>,
    storage: StorageHandle,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let (repos, storage) = match settings.storage.backend.as_str() {
            "mysql" => {
                let dsn = settings
                    .storage
                    .dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("storage.dsn is required for the mysql backend"))?;
                let pool = MySqlPoolOptions::new()
                    .max_connections(settings.storage.max_connections)
                    .connect(dsn)
                    .await
                    .context("connect to mysql")?;

                if settings.storage.run_migrations {
                    MIGRATOR.run(&pool).await.context("run migrations")?;
                    info!("migrations applied");
                }

                (mysql_repos(pool.clone()), StorageHandle::MySql(pool))
            }
            "memory" => {
                warn!("using the in-memory storage backend; data is lost on exit");
                (memory_repos(MemoryDb::new()), StorageHandle::Memory)
            }
            other => return Err(anyhow!("Unknown storage backend: {}", other)),
        };

        let signing_key = std::env::var("JWT_SIGNING_KEY")
            .ok()
            .or_else(|| settings.auth.signing_key.clone())
            .ok_or_else(|| anyhow!("no JWT signing key: set JWT_SIGNING_KEY or auth.signing_key"))?
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
            signing_key,
        }));
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

        let resolver: Arc<dyn RelationResolver> = Arc::new(RealRelationResolver::new(
            repos.follow_repo.clone(),
            repos.mate_repo.clone(),
        ));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            repos.auth_repo,
            repos.user_repo.clone(),
            credential_hasher,
            token_codec,
            repos.tx_manager.clone(),
        ));

        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(
            repos.user_repo.clone(),
            resolver.clone(),
            repos.tx_manager.clone(),
        ));

        let relationship_service: Arc<dyn RelationshipService> =
            Arc::new(RealRelationshipService::new(
                repos.user_repo,
                repos.follow_repo,
                repos.mate_repo,
                resolver,
                repos.tx_manager,
            ));

        info!(backend = %settings.storage.backend, "server started");

        Ok(Self {
            auth_service,
            user_service,
            relationship_service,
            storage,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        match &self.storage {
            StorageHandle::MySql(pool) => pool.close().await,
            StorageHandle::Memory => {}
        }
    }
}

fn mysql_repos(pool: Pool<MySql>) -> Repos {
    Repos {
        auth_repo: Arc::new(MySqlAuthRepo::new(pool.clone())),
        user_repo: Arc::new(MySqlUserRepo::new(pool.clone())),
        follow_repo: Arc::new(MySqlFollowRepo::new(pool.clone())),
        mate_repo: Arc::new(MySqlMateRepo::new(pool.clone())),
        tx_manager: Arc::new(MySqlTxManager::new(pool)),
    }
}

fn memory_repos(db: MemoryDb) -> Repos {
    Repos {
        auth_repo: Arc::new(MemoryAuthRepo::new(db.clone())),
        user_repo: Arc::new(MemoryUserRepo::new(db.clone())),
        follow_repo: Arc::new(MemoryFollowRepo::new(db.clone())),
        mate_repo: Arc::new(MemoryMateRepo::new(db.clone())),
        tx_manager: Arc::new(MemoryTxManager::new(db)),
    }
}
