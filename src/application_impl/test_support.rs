use super::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use std::sync::Arc;
use std::time::Duration;

/// Services wired over a fresh in-memory store.
pub struct TestStore {
    pub user_repo: Arc<dyn UserRepo>,
    pub auth_repo: Arc<dyn AuthRepo>,
    pub follow_repo: Arc<dyn FollowRepo>,
    pub mate_repo: Arc<dyn MateRepo>,
    pub tx_manager: Arc<dyn TxManager>,
    pub resolver: Arc<dyn RelationResolver>,
    pub relationships: RealRelationshipService,
    pub users: RealUserService,
}

impl TestStore {
    pub fn new() -> Self {
        let db = MemoryDb::new();
        let user_repo: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new(db.clone()));
        let auth_repo: Arc<dyn AuthRepo> = Arc::new(MemoryAuthRepo::new(db.clone()));
        let follow_repo: Arc<dyn FollowRepo> = Arc::new(MemoryFollowRepo::new(db.clone()));
        let mate_repo: Arc<dyn MateRepo> = Arc::new(MemoryMateRepo::new(db.clone()));
        let tx_manager: Arc<dyn TxManager> = Arc::new(MemoryTxManager::new(db));
        let resolver: Arc<dyn RelationResolver> = Arc::new(RealRelationResolver::new(
            follow_repo.clone(),
            mate_repo.clone(),
        ));

        let relationships = RealRelationshipService::new(
            user_repo.clone(),
            follow_repo.clone(),
            mate_repo.clone(),
            resolver.clone(),
            tx_manager.clone(),
        );
        let users = RealUserService::new(user_repo.clone(), resolver.clone(), tx_manager.clone());

        Self {
            user_repo,
            auth_repo,
            follow_repo,
            mate_repo,
            tx_manager,
            resolver,
            relationships,
            users,
        }
    }

    pub fn jwt_config() -> JwtConfig {
        JwtConfig {
            issuer: "matecircle-test".to_string(),
            audience: "matecircle-test".to_string(),
            access_ttl: Duration::from_secs(300),
            signing_key: b"test-signing-key".to_vec(),
        }
    }

    pub fn auth(&self) -> RealAuthService {
        RealAuthService::new(
            self.auth_repo.clone(),
            self.user_repo.clone(),
            Arc::new(Argon2PasswordHasher),
            Arc::new(JwtHs256Codec::new(Self::jwt_config())),
            self.tx_manager.clone(),
        )
    }

    /// Inserts a bare user without credentials.
    pub async fn user(&self, username: &str) -> UserId {
        let user = NewUserRecord {
            user_id: UserId::new_v4(),
            full_name: format!("{username} test"),
            username: username.to_string(),
            account_type: "personal".to_string(),
            dob: None,
            avatar: DEFAULT_AVATAR.to_string(),
        };

        let mut tx = self.tx_manager.begin().await.unwrap();
        let outcome = self.user_repo.create_in_tx(&mut *tx, &user).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);
        tx.commit().await.unwrap();

        user.user_id
    }

    pub async fn record(&self, user_id: UserId) -> UserRecord {
        self.user_repo.get_by_id(user_id).await.unwrap().unwrap()
    }

    pub async fn follow_state(&self, follower: UserId, followee: UserId) -> Option<EdgeState> {
        self.follow_repo.state(follower, followee).await.unwrap()
    }

    pub async fn mate_state(&self, a: UserId, b: UserId) -> Option<EdgeState> {
        self.mate_repo.state(UserPair::new(a, b)).await.unwrap()
    }
}
