//! 매치 스토어 -- 관계형 스토어 접근 계층
//!
//! [`MatchStore`]는 하나의 SQLite 커넥션 풀 위에서 스캔(쓰기)과 조회(읽기)를
//! 제공합니다. 쓰기 경로는 스캔 엔진의 단일 트랜잭션뿐이며, 읽기 경로는
//! 동시에 실행될 수 있습니다.
//!
//! # 테이블 소유권
//!
//! - `package_references`, `vulnerability_affected_packages`,
//!   `vulnerability_affected_symbols`: 외부 협력자가 채우는 읽기 전용 입력.
//!   [`MatchStore::migrate`]는 레이아웃만 보장합니다.
//! - `vulnerability_matches`: 이 엔진이 소유. `(upload_id, affected_package_id)`
//!   유니크 제약으로 중복 삽입이 흡수됩니다.
//!
//! 리스트 값 컬럼(`version_constraint`, `symbols`)은 JSON 텍스트로 저장됩니다.

mod query;
mod scan;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::MatchEngineConfig;
use crate::error::VulnmatchError;
use crate::scheme::SchemeMapping;

/// 스키마 생성 구문
///
/// `CREATE TABLE IF NOT EXISTS`이므로 반복 실행해도 무해합니다.
const SCHEMA_STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS package_references (
        upload_id     INTEGER NOT NULL,
        package_name  TEXT NOT NULL,
        version       TEXT NOT NULL,
        scheme        TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS vulnerability_affected_packages (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        vulnerability_id    INTEGER NOT NULL,
        package_name        TEXT NOT NULL,
        language            TEXT NOT NULL,
        namespace           TEXT NOT NULL DEFAULT '',
        version_constraint  TEXT NOT NULL DEFAULT '[]',
        fixed               INTEGER NOT NULL DEFAULT 0,
        fixed_in            TEXT NOT NULL DEFAULT ''
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS vulnerability_affected_symbols (
        id                   INTEGER PRIMARY KEY AUTOINCREMENT,
        affected_package_id  INTEGER NOT NULL,
        path                 TEXT NOT NULL,
        symbols              TEXT NOT NULL DEFAULT '[]'
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS vulnerability_matches (
        id                   INTEGER PRIMARY KEY AUTOINCREMENT,
        upload_id            INTEGER NOT NULL,
        affected_package_id  INTEGER NOT NULL,
        UNIQUE (upload_id, affected_package_id)
    )
    ",
];

/// 매치 스토어
///
/// 커넥션 풀, scheme 매핑, 페이지 크기 상한을 보유합니다.
/// `Clone`이 가능하며 복제본은 같은 풀을 공유합니다.
#[derive(Clone)]
pub struct MatchStore {
    pool: SqlitePool,
    scheme_mapping: SchemeMapping,
    page_size_limit: i64,
}

impl MatchStore {
    /// 기존 풀 위에 스토어를 생성합니다.
    pub fn new(pool: SqlitePool, config: &MatchEngineConfig) -> Self {
        Self {
            pool,
            scheme_mapping: config.scheme_mapping(),
            page_size_limit: config.page_size_limit,
        }
    }

    /// 설정의 URL로 풀을 만들고 스토어를 생성합니다.
    pub async fn connect(config: &MatchEngineConfig) -> Result<Self, VulnmatchError> {
        config.validate()?;

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| VulnmatchError::store("connect", e))?;

        Ok(Self::new(pool, config))
    }

    /// 커넥션 풀 참조를 반환합니다.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// scheme 매핑 참조를 반환합니다.
    pub fn scheme_mapping(&self) -> &SchemeMapping {
        &self.scheme_mapping
    }

    /// 관계형 레이아웃을 보장합니다 (없는 테이블만 생성).
    pub async fn migrate(&self) -> Result<(), VulnmatchError> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| VulnmatchError::store("create tables", e))?;
        }
        Ok(())
    }

    /// 영속화된 매치의 총 개수를 반환합니다.
    pub async fn match_count(&self) -> Result<i64, VulnmatchError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vulnerability_matches")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| VulnmatchError::store("count matches", e))?;
        Ok(count)
    }
}
