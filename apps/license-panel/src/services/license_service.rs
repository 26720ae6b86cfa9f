use chrono::{DateTime, Duration, Utc};
use license_db::{License, LicenseRepository};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Length of a generated license key.
pub const KEY_LENGTH: usize = 24;

/// Upper bound on `days_valid`, keeps `now + days` representable.
pub const MAX_DAYS_VALID: i64 = 3_650_000;

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("license {0} not found")]
    NotFound(i64),

    #[error("generated license key already exists")]
    DuplicateKey,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type LicenseResult<T> = Result<T, LicenseError>;

/// Outcome of checking a key. Precedence: existence, active flag, expiry.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Valid(License),
    MissingKey,
    NotFound,
    Blocked(License),
    Expired(License),
}

impl Verdict {
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::Valid(_) => "valid",
            Verdict::MissingKey => "missing_key",
            Verdict::NotFound => "license_not_found",
            Verdict::Blocked(_) => "license_blocked",
            Verdict::Expired(_) => "license_expired",
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }

    pub fn license(&self) -> Option<&License> {
        match self {
            Verdict::Valid(license) | Verdict::Blocked(license) | Verdict::Expired(license) => Some(license),
            Verdict::MissingKey | Verdict::NotFound => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LicenseService {
    repo: LicenseRepository,
}

impl LicenseService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { repo: LicenseRepository::new(pool) }
    }

    /// 24 uppercase hex characters taken from a random v4 UUID.
    pub fn generate_key() -> String {
        let mut key = Uuid::new_v4().simple().to_string();
        key.truncate(KEY_LENGTH);
        key.to_ascii_uppercase()
    }

    /// Strict parser for the `days` form field. Blank means "never expires".
    pub fn parse_days(raw: &str) -> LicenseResult<Option<i64>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let days: i64 = raw
            .parse()
            .map_err(|_| LicenseError::InvalidInput(format!("days must be an integer, got {:?}", raw)))?;

        if days <= 0 || days > MAX_DAYS_VALID {
            return Err(LicenseError::InvalidInput(format!(
                "days must be between 1 and {}, got {}",
                MAX_DAYS_VALID, days
            )));
        }

        Ok(Some(days))
    }

    /// Lenient variant used by the admin form: anything invalid becomes "never expires".
    pub fn days_or_never(raw: Option<&str>) -> Option<i64> {
        match Self::parse_days(raw.unwrap_or_default()) {
            Ok(days) => days,
            Err(e) => {
                debug!("Ignoring days value: {}", e);
                None
            }
        }
    }

    fn expiry_for(now: DateTime<Utc>, days_valid: Option<i64>) -> Option<DateTime<Utc>> {
        let days = days_valid.filter(|d| (1..=MAX_DAYS_VALID).contains(d))?;
        Duration::try_days(days).and_then(|d| now.checked_add_signed(d))
    }

    pub async fn create(
        &self,
        owner: Option<&str>,
        days_valid: Option<i64>,
        notes: Option<&str>,
    ) -> LicenseResult<License> {
        let now = Utc::now();
        let expires_at = Self::expiry_for(now, days_valid);
        let key = Self::generate_key();

        let license = self
            .repo
            .create(&key, non_blank(owner), now, expires_at, non_blank(notes))
            .await
            .map_err(classify_storage_error)?;

        info!(
            "License created: id={} key={} owner={:?} expires_at={:?}",
            license.id, license.key, license.owner, license.expires_at
        );
        Ok(license)
    }

    pub async fn list(&self) -> LicenseResult<Vec<License>> {
        Ok(self.repo.get_all().await?)
    }

    pub async fn validate(&self, key: Option<&str>) -> LicenseResult<Verdict> {
        self.validate_at(key, Utc::now()).await
    }

    pub async fn validate_at(&self, key: Option<&str>, now: DateTime<Utc>) -> LicenseResult<Verdict> {
        let key = key.map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Ok(Verdict::MissingKey);
        }

        let verdict = match self.repo.get_by_key(key).await? {
            None => Verdict::NotFound,
            Some(license) if !license.active => Verdict::Blocked(license),
            Some(license) if license.is_expired_at(now) => Verdict::Expired(license),
            Some(license) => Verdict::Valid(license),
        };

        debug!("Validated key {}: {}", key, verdict.code());
        Ok(verdict)
    }

    pub async fn toggle_active(&self, id: i64) -> LicenseResult<License> {
        let license = self.repo.toggle_active(id).await?.ok_or(LicenseError::NotFound(id))?;
        info!("License {} toggled: active={}", license.id, license.active);
        Ok(license)
    }

    pub async fn delete(&self, id: i64) -> LicenseResult<()> {
        if !self.repo.delete(id).await? {
            return Err(LicenseError::NotFound(id));
        }
        info!("License {} deleted", id);
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn classify_storage_error(err: anyhow::Error) -> LicenseError {
    let unique_violation = err
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false);

    if unique_violation {
        LicenseError::DuplicateKey
    } else {
        LicenseError::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn service() -> LicenseService {
        service_with_pool().await.0
    }

    async fn service_with_pool() -> (LicenseService, SqlitePool) {
        let pool = license_db::connect_in_memory().await.unwrap();
        (LicenseService::new(pool.clone()), pool)
    }

    async fn set_expiry(pool: &SqlitePool, id: i64, expires_at: DateTime<Utc>) {
        sqlx::query("UPDATE licenses SET expires_at = ? WHERE id = ?")
            .bind(expires_at)
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }

    fn is_key_format(key: &str) -> bool {
        key.len() == KEY_LENGTH && key.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    }

    #[test]
    fn generated_keys_have_fixed_format() {
        for _ in 0..100 {
            let key = LicenseService::generate_key();
            assert!(is_key_format(&key), "bad key {}", key);
        }
    }

    #[test]
    fn parse_days_accepts_positive_integers() {
        assert_eq!(LicenseService::parse_days("30").unwrap(), Some(30));
        assert_eq!(LicenseService::parse_days(" 7 ").unwrap(), Some(7));
        assert_eq!(LicenseService::parse_days("").unwrap(), None);
        assert_eq!(LicenseService::parse_days("   ").unwrap(), None);
    }

    #[test]
    fn parse_days_rejects_garbage() {
        for raw in ["0", "-5", "abc", "1.5", "99999999999"] {
            assert!(
                matches!(LicenseService::parse_days(raw), Err(LicenseError::InvalidInput(_))),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn days_or_never_swallows_invalid_input() {
        assert_eq!(LicenseService::days_or_never(Some("0")), None);
        assert_eq!(LicenseService::days_or_never(Some("soon")), None);
        assert_eq!(LicenseService::days_or_never(None), None);
        assert_eq!(LicenseService::days_or_never(Some("10")), Some(10));
    }

    #[tokio::test]
    async fn created_license_is_immediately_valid() {
        let service = service().await;
        let license = service.create(Some("acme"), Some(30), Some("note")).await.unwrap();

        assert!(license.active);
        assert!(is_key_format(&license.key));
        let expiry = license.expires_at.expect("expiry set");
        let delta = expiry - license.created_at;
        assert_eq!(delta.num_days(), 30);

        let verdict = service.validate(Some(&license.key)).await.unwrap();
        assert!(verdict.is_valid());
        assert_eq!(verdict.license().unwrap().owner.as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn zero_days_means_no_expiry() {
        let service = service().await;
        let license = service.create(None, LicenseService::days_or_never(Some("0")), None).await.unwrap();

        assert!(license.expires_at.is_none());
        assert_eq!(service.validate(Some(&license.key)).await.unwrap().code(), "valid");
    }

    #[tokio::test]
    async fn non_positive_days_passed_directly_mean_no_expiry() {
        let service = service().await;
        let license = service.create(None, Some(-3), None).await.unwrap();
        assert!(license.expires_at.is_none());
    }

    #[tokio::test]
    async fn blank_owner_and_notes_are_stored_as_null() {
        let service = service().await;
        let license = service.create(Some("  "), None, Some("")).await.unwrap();
        assert!(license.owner.is_none());
        assert!(license.notes.is_none());
    }

    #[tokio::test]
    async fn missing_and_unknown_keys() {
        let service = service().await;
        assert_eq!(service.validate(None).await.unwrap(), Verdict::MissingKey);
        assert_eq!(service.validate(Some("   ")).await.unwrap(), Verdict::MissingKey);
        assert_eq!(service.validate(Some("NOPE")).await.unwrap(), Verdict::NotFound);
    }

    #[tokio::test]
    async fn keys_are_trimmed_before_lookup() {
        let service = service().await;
        let license = service.create(None, None, None).await.unwrap();
        let padded = format!("  {}\n", license.key);
        assert!(service.validate(Some(&padded)).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn toggle_blocks_until_toggled_back() {
        let service = service().await;
        let license = service.create(None, None, None).await.unwrap();

        let off = service.toggle_active(license.id).await.unwrap();
        assert!(!off.active);
        assert_eq!(service.validate(Some(&license.key)).await.unwrap().code(), "license_blocked");

        let on = service.toggle_active(license.id).await.unwrap();
        assert!(on.active);
        assert!(service.validate(Some(&license.key)).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn past_expiry_is_expired_even_when_active() {
        let (service, pool) = service_with_pool().await;
        let license = service.create(None, Some(1), None).await.unwrap();
        set_expiry(&pool, license.id, Utc::now() - Duration::hours(1)).await;

        let verdict = service.validate(Some(&license.key)).await.unwrap();
        assert_eq!(verdict.code(), "license_expired");
        assert!(verdict.license().unwrap().active);
    }

    #[tokio::test]
    async fn expiry_is_checked_against_the_given_clock() {
        let service = service().await;
        let license = service.create(None, Some(10), None).await.unwrap();

        let later = Utc::now() + Duration::days(11);
        let verdict = service.validate_at(Some(&license.key), later).await.unwrap();
        assert_eq!(verdict.code(), "license_expired");
    }

    #[tokio::test]
    async fn blocked_wins_over_expired() {
        let (service, pool) = service_with_pool().await;
        let license = service.create(None, Some(1), None).await.unwrap();
        set_expiry(&pool, license.id, Utc::now() - Duration::days(1)).await;
        service.toggle_active(license.id).await.unwrap();

        assert_eq!(service.validate(Some(&license.key)).await.unwrap().code(), "license_blocked");
    }

    #[tokio::test]
    async fn deleted_license_is_not_found() {
        let service = service().await;
        let license = service.create(None, None, None).await.unwrap();

        service.delete(license.id).await.unwrap();
        assert_eq!(service.validate(Some(&license.key)).await.unwrap(), Verdict::NotFound);
    }

    #[tokio::test]
    async fn mutations_on_missing_ids_fail_with_not_found() {
        let service = service().await;
        assert!(matches!(service.toggle_active(404).await, Err(LicenseError::NotFound(404))));
        assert!(matches!(service.delete(404).await, Err(LicenseError::NotFound(404))));
    }

    #[tokio::test]
    async fn repeated_creations_yield_unique_keys() {
        let service = service().await;
        let mut keys = HashSet::new();
        for _ in 0..50 {
            let license = service.create(None, None, None).await.unwrap();
            assert!(keys.insert(license.key));
        }
        assert_eq!(service.list().await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn store_collision_is_duplicate_key() {
        let service = service().await;
        let existing = service.create(None, None, None).await.unwrap();

        let err = service
            .repo
            .create(&existing.key, None, Utc::now(), None, None)
            .await
            .map_err(classify_storage_error)
            .unwrap_err();
        assert!(matches!(err, LicenseError::DuplicateKey));
    }
}
